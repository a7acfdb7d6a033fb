//! Checkout and success-page flows
//!
//! The two entry points of the payment lifecycle:
//!
//! - [`CheckoutFlow::upgrade`] runs plan selection to a launched
//!   gateway, and for the modal path all the way to a confirmed
//!   subscription.
//! - [`SuccessPageFlow::handle_return`] picks the lifecycle back up
//!   when the hosted gateway redirects to the success page, drives the
//!   verification poller to a terminal state, and performs the
//!   post-success side effects exactly once: conversion report,
//!   session refresh, delayed dashboard redirect.

use std::sync::Arc;

use resumebuilder_client::SessionStore;
use resumebuilder_shared::{BillingCycle, Plan};
use url::Url;

use crate::error::{BillingError, BillingResult};
use crate::gateway::{CheckoutSurface, GatewayAdapter, LaunchOutcome};
use crate::orders::{OrderService, PaymentConfirmation};
use crate::reconcile::SessionReconciler;
use crate::tracking::ConversionReporter;
use crate::verification::{
    ConfirmedPayment, PaymentVerifier, RunOutcome, VerificationFailure, VerificationState,
    VerifyBackend, SUCCESS_REDIRECT_DELAY,
};

/// Where a flow can send the user next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Dashboard,
    Login,
}

/// In-app navigation seam, implemented by the embedding application.
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Extract the payment identifier from a gateway return URL.
///
/// Hosted checkouts append `session_id`; the modal redirect uses
/// `payment_id`. `session_id` wins when both are present.
pub fn payment_id_from_url(url: &Url) -> Option<String> {
    let find = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    };
    find("session_id").or_else(|| find("payment_id"))
}

/// What the success page should show after a return is handled.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnOutcome {
    Confirmed(ConfirmedPayment),
    Failed(VerificationFailure),
    /// Another trigger is already driving verification; show the
    /// spinner and wait for it.
    InProgress,
}

/// Drives the success page: verification, then post-success effects.
pub struct SuccessPageFlow<B: VerifyBackend, R: SessionReconciler> {
    verifier: PaymentVerifier<B>,
    session: R,
    reporter: Arc<ConversionReporter>,
    navigator: Arc<dyn Navigator>,
}

impl<B: VerifyBackend, R: SessionReconciler> SuccessPageFlow<B, R> {
    pub fn new(
        verifier: PaymentVerifier<B>,
        session: R,
        reporter: Arc<ConversionReporter>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            verifier,
            session,
            reporter,
            navigator,
        }
    }

    pub fn verification_state(&self) -> VerificationState {
        self.verifier.state()
    }

    /// Handle a gateway return URL.
    pub async fn handle_return_url(&self, url: &Url) -> ReturnOutcome {
        let payment_id = payment_id_from_url(url);
        self.handle_return(payment_id.as_deref()).await
    }

    /// Drive verification for a gateway return to its terminal state.
    ///
    /// Post-success side effects run only on the invocation that
    /// finished the state machine. A re-trigger that finds a terminal
    /// state gets the same outcome back with no network calls, no
    /// duplicate conversion, and no second redirect.
    pub async fn handle_return(&self, payment_id: Option<&str>) -> ReturnOutcome {
        match self.verifier.run(payment_id).await {
            RunOutcome::AlreadyInFlight => ReturnOutcome::InProgress,
            RunOutcome::AlreadyTerminal(state) => Self::outcome_of(state),
            RunOutcome::Finished(state) => {
                if let VerificationState::Success(confirmed) = &state {
                    self.after_success(confirmed).await;
                }
                Self::outcome_of(state)
            }
        }
    }

    fn outcome_of(state: VerificationState) -> ReturnOutcome {
        match state {
            VerificationState::Success(confirmed) => ReturnOutcome::Confirmed(confirmed),
            VerificationState::Failed(failure) => ReturnOutcome::Failed(failure),
            _ => ReturnOutcome::InProgress,
        }
    }

    async fn after_success(&self, confirmed: &ConfirmedPayment) {
        let before = self.session.snapshot();

        if let (Some(id), Some(plan)) =
            (confirmed.payment_id.as_deref(), confirmed.subscription_type)
        {
            let upgraded = plan.is_paid()
                && before
                    .as_ref()
                    .is_none_or(|profile| profile.subscription_type != plan);
            if upgraded {
                self.reporter
                    .report_purchase(plan, id, before.as_ref().map(|p| p.email.as_str()));
            }
        }

        self.session.refresh().await;

        tokio::time::sleep(SUCCESS_REDIRECT_DELAY).await;
        self.navigator.navigate(Destination::Dashboard);
    }
}

/// What came of an upgrade attempt.
#[derive(Debug, Clone)]
pub enum UpgradeOutcome {
    /// No session; the user was sent to the login page.
    SignInRequired,
    /// The free plan needs no checkout.
    NothingToDo,
    /// The user already has the selected plan.
    AlreadyOnPlan,
    /// Full-page redirect to hosted checkout issued; the lifecycle
    /// resumes on the success page.
    RedirectedToCheckout,
    /// The modal was closed without paying.
    Dismissed,
    /// Modal payment confirmed server-side.
    Confirmed(PaymentConfirmation),
}

/// Drives plan selection through order creation and gateway launch.
pub struct CheckoutFlow<S: CheckoutSurface> {
    orders: OrderService,
    gateway: GatewayAdapter<S>,
    session: Arc<SessionStore>,
    reporter: Arc<ConversionReporter>,
    navigator: Arc<dyn Navigator>,
}

impl<S: CheckoutSurface> CheckoutFlow<S> {
    pub fn new(
        orders: OrderService,
        gateway: GatewayAdapter<S>,
        session: Arc<SessionStore>,
        reporter: Arc<ConversionReporter>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            orders,
            gateway,
            session,
            reporter,
            navigator,
        }
    }

    /// Take a plan selection as far as the gateway allows.
    pub async fn upgrade(&self, plan: Plan, cycle: BillingCycle) -> BillingResult<UpgradeOutcome> {
        if !self.session.is_authenticated() {
            tracing::info!("upgrade attempted without a session");
            self.navigator.navigate(Destination::Login);
            return Ok(UpgradeOutcome::SignInRequired);
        }
        if !plan.is_paid() {
            return Ok(UpgradeOutcome::NothingToDo);
        }
        if self.session.subscription_tier() == Some(plan) {
            tracing::info!(%plan, "already subscribed to selected plan");
            return Ok(UpgradeOutcome::AlreadyOnPlan);
        }

        let order = self.orders.create(plan, cycle).await?;

        match self.gateway.launch(&order).await {
            LaunchOutcome::RedirectedToGateway => Ok(UpgradeOutcome::RedirectedToCheckout),
            LaunchOutcome::Dismissed => Ok(UpgradeOutcome::Dismissed),
            LaunchOutcome::Completed(completion) => {
                let confirmation = self.orders.confirm_modal(&completion, plan).await?;
                if !confirmation.success {
                    tracing::warn!(payment_id = %completion.payment_id, "modal payment rejected");
                    return Err(BillingError::VerificationRejected);
                }

                let email = self.session.current().map(|p| p.email);
                self.reporter
                    .report_purchase(plan, &completion.payment_id, email.as_deref());
                self.session.refresh().await;
                self.navigator.navigate(Destination::Dashboard);
                Ok(UpgradeOutcome::Confirmed(confirmation))
            }
        }
    }
}
