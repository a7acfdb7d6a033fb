//! Payment verification poller
//!
//! Reconciles a payment identifier from the gateway redirect into a
//! confirmed subscription. The backend may still be processing the
//! payment when the user lands back on the success page, so the
//! poller asks "is this settled?" on a bounded fixed-interval
//! schedule.
//!
//! States: `Idle -> Verifying -> {Success | PendingRetry | Failed}`,
//! with `PendingRetry -> Verifying` looping until the attempt budget
//! runs out. `Success` and `Failed` are terminal: once reached, no
//! further backend calls are issued for that identifier, ever.
//!
//! The "is a call outstanding" condition is the state itself
//! (`Verifying`/`PendingRetry`), checked and updated synchronously
//! under one lock. There is no second guard flag to race against.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use resumebuilder_client::{ApiClient, ApiError, ApiResult};
use resumebuilder_shared::Plan;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_retry::strategy::FixedInterval;

/// Maximum verification calls for one payment identifier.
pub const MAX_VERIFY_ATTEMPTS: u32 = 5;

/// Wait between verification attempts.
pub const VERIFY_RETRY_INTERVAL: Duration = Duration::from_millis(3000);

/// Delay before the post-success dashboard redirect, giving the
/// success message time to render.
pub const SUCCESS_REDIRECT_DELAY: Duration = Duration::from_millis(3000);

/// Bounded fixed-interval retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_VERIFY_ATTEMPTS,
            interval: VERIFY_RETRY_INTERVAL,
        }
    }
}

/// What the backend said about one verification call.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// Payment settled; the subscription has been applied server-side.
    Settled {
        subscription_type: Option<Plan>,
        subscription_expiry: Option<OffsetDateTime>,
    },
    /// Not settled yet, not failed either. Retry later.
    Pending,
    /// A non-success status other than pending. Terminal.
    Rejected {
        status: String,
        message: Option<String>,
    },
}

/// Backend seam for verification calls. Production uses [`PaymentApi`];
/// tests script responses.
pub trait VerifyBackend: Send + Sync {
    fn verify_payment(
        &self,
        payment_id: &str,
    ) -> impl std::future::Future<Output = ApiResult<VerifyOutcome>> + Send;
}

#[derive(Serialize)]
struct VerifyPaymentRequest<'a> {
    payment_id: &'a str,
}

#[derive(Deserialize)]
struct VerifyPaymentResponse {
    success: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    subscription_type: Option<Plan>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    subscription_expiry: Option<OffsetDateTime>,
}

/// Real verification backend over the REST API.
#[derive(Clone)]
pub struct PaymentApi {
    api: ApiClient,
}

impl PaymentApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl VerifyBackend for PaymentApi {
    async fn verify_payment(&self, payment_id: &str) -> ApiResult<VerifyOutcome> {
        let response: VerifyPaymentResponse = self
            .api
            .post_json(
                "/api/payment/verify-payment",
                &VerifyPaymentRequest { payment_id },
            )
            .await?;

        if response.success {
            return Ok(VerifyOutcome::Settled {
                subscription_type: response.subscription_type,
                subscription_expiry: response.subscription_expiry,
            });
        }

        match response.status.as_deref() {
            Some("pending") => Ok(VerifyOutcome::Pending),
            other => Ok(VerifyOutcome::Rejected {
                status: other.unwrap_or("unknown").to_string(),
                message: response.message,
            }),
        }
    }
}

/// A confirmed payment, carried by the terminal success state.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedPayment {
    /// Gateway identifier, absent on the no-identifier success path.
    pub payment_id: Option<String>,
    pub subscription_type: Option<Plan>,
    pub subscription_expiry: Option<OffsetDateTime>,
}

impl ConfirmedPayment {
    /// Success reached without a verifiable identifier: some gateways
    /// confirm without passing one back on the redirect.
    pub fn without_identifier() -> Self {
        Self {
            payment_id: None,
            subscription_type: None,
            subscription_expiry: None,
        }
    }
}

/// Terminal failure classification.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationFailure {
    /// 401 during verification. Retrying cannot help without a session.
    Unauthenticated,
    /// The payment was still processing after every attempt.
    StillProcessing,
    /// The backend rejected the payment outright.
    Declined {
        status: String,
        message: Option<String>,
    },
    /// Transport failures exhausted the retry budget.
    Unreachable,
}

/// Next step offered to the user from a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    ReturnToDashboard,
    ContactSupport,
    SignInAgain,
}

impl VerificationFailure {
    pub fn user_message(&self) -> String {
        match self {
            VerificationFailure::Unauthenticated => {
                "Your session has expired. Please sign in again to confirm your payment.".into()
            }
            VerificationFailure::StillProcessing => {
                "Your payment is still processing. Please check back in a few minutes.".into()
            }
            VerificationFailure::Declined {
                message: Some(detail),
                ..
            } => format!("Payment verification failed: {detail}"),
            VerificationFailure::Declined { .. } => {
                "Payment verification failed. Please contact support.".into()
            }
            VerificationFailure::Unreachable => {
                "We could not confirm your payment. Please check back later or contact support."
                    .into()
            }
        }
    }

    pub fn recovery_actions(&self) -> &'static [RecoveryAction] {
        match self {
            VerificationFailure::Unauthenticated => {
                &[RecoveryAction::SignInAgain, RecoveryAction::ContactSupport]
            }
            _ => &[
                RecoveryAction::ReturnToDashboard,
                RecoveryAction::ContactSupport,
            ],
        }
    }
}

/// Poller state. One value is authoritative for guarding, retrying,
/// and terminal idempotence.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationState {
    Idle,
    Verifying { attempt: u32 },
    PendingRetry { next_attempt: u32 },
    Success(ConfirmedPayment),
    Failed(VerificationFailure),
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationState::Success(_) | VerificationState::Failed(_)
        )
    }
}

/// Result of one `run` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// This invocation drove the state machine to its terminal state.
    /// Side effects belong to the caller that receives this.
    Finished(VerificationState),
    /// Another invocation is mid-flight for this verifier; dropped.
    AlreadyInFlight,
    /// The verifier was already terminal; no calls were made.
    AlreadyTerminal(VerificationState),
}

enum RetryCause {
    StillProcessing,
    Unreachable,
}

/// Drives verification for a single payment return.
///
/// One verifier instance corresponds to one success-page visit; the
/// state machine inside never restarts.
pub struct PaymentVerifier<B: VerifyBackend> {
    backend: B,
    policy: RetryPolicy,
    state: Mutex<VerificationState>,
}

impl<B: VerifyBackend> PaymentVerifier<B> {
    pub fn new(backend: B) -> Self {
        Self::with_policy(backend, RetryPolicy::default())
    }

    pub fn with_policy(backend: B, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            state: Mutex::new(VerificationState::Idle),
        }
    }

    pub fn state(&self) -> VerificationState {
        self.lock_state().clone()
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    fn lock_state(&self) -> MutexGuard<'_, VerificationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: VerificationState) {
        *self.lock_state() = next;
    }

    /// Run verification to a terminal state.
    ///
    /// Re-entrant calls while an attempt is outstanding are dropped,
    /// not queued; calls after a terminal state make no network
    /// requests. Both checks happen synchronously under the state
    /// lock before anything is awaited.
    pub async fn run(&self, payment_id: Option<&str>) -> RunOutcome {
        let id = {
            let mut state = self.lock_state();
            match &*state {
                VerificationState::Verifying { .. } | VerificationState::PendingRetry { .. } => {
                    tracing::debug!("verification already in flight, dropping duplicate trigger");
                    return RunOutcome::AlreadyInFlight;
                }
                terminal @ (VerificationState::Success(_) | VerificationState::Failed(_)) => {
                    return RunOutcome::AlreadyTerminal(terminal.clone());
                }
                VerificationState::Idle => {}
            }
            match payment_id {
                None => {
                    // No identifier on the return URL at all: the
                    // gateway confirmed without a round-trip parameter.
                    tracing::info!("no payment identifier on return, treating as confirmed");
                    let confirmed =
                        VerificationState::Success(ConfirmedPayment::without_identifier());
                    *state = confirmed.clone();
                    return RunOutcome::Finished(confirmed);
                }
                Some(id) => {
                    *state = VerificationState::Verifying { attempt: 1 };
                    id
                }
            }
        };

        let mut delays = FixedInterval::new(self.policy.interval);
        let mut attempt: u32 = 1;

        loop {
            tracing::debug!(payment_id = id, attempt, "verifying payment");
            let cause = match self.backend.verify_payment(id).await {
                Ok(VerifyOutcome::Settled {
                    subscription_type,
                    subscription_expiry,
                }) => {
                    // Terminal mark happens before anything else can
                    // observe or re-trigger this verifier.
                    let state = VerificationState::Success(ConfirmedPayment {
                        payment_id: Some(id.to_string()),
                        subscription_type,
                        subscription_expiry,
                    });
                    self.set_state(state.clone());
                    tracing::info!(payment_id = id, attempt, "payment settled");
                    return RunOutcome::Finished(state);
                }
                Ok(VerifyOutcome::Pending) => RetryCause::StillProcessing,
                Ok(VerifyOutcome::Rejected { status, message }) => {
                    tracing::warn!(payment_id = id, status = %status, "payment rejected");
                    let state = VerificationState::Failed(VerificationFailure::Declined {
                        status,
                        message,
                    });
                    self.set_state(state.clone());
                    return RunOutcome::Finished(state);
                }
                Err(ApiError::Unauthorized) => {
                    tracing::warn!(payment_id = id, "unauthenticated during verification");
                    let state = VerificationState::Failed(VerificationFailure::Unauthenticated);
                    self.set_state(state.clone());
                    return RunOutcome::Finished(state);
                }
                Err(err) => {
                    tracing::warn!(payment_id = id, attempt, error = %err, "verification call failed");
                    RetryCause::Unreachable
                }
            };

            if attempt >= self.policy.max_attempts {
                let failure = match cause {
                    RetryCause::StillProcessing => VerificationFailure::StillProcessing,
                    RetryCause::Unreachable => VerificationFailure::Unreachable,
                };
                tracing::warn!(
                    payment_id = id,
                    attempts = attempt,
                    "verification attempts exhausted"
                );
                let state = VerificationState::Failed(failure);
                self.set_state(state.clone());
                return RunOutcome::Finished(state);
            }

            attempt += 1;
            self.set_state(VerificationState::PendingRetry {
                next_attempt: attempt,
            });
            if let Some(delay) = delays.next() {
                tokio::time::sleep(delay).await;
            }
            self.set_state(VerificationState::Verifying { attempt });
        }
    }
}
