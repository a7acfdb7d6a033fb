// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge Case Tests for Payment Reconciliation
//!
//! Tests critical boundary conditions and race conditions in:
//! - Verification triggering (PAY-V01 to PAY-V04)
//! - Conversion deduplication (PAY-C01)
//! - Session reconciliation (PAY-S01)

mod support {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use resumebuilder_client::ApiResult;
    use resumebuilder_shared::Plan;
    use tokio::sync::Notify;

    use crate::verification::{VerifyBackend, VerifyOutcome};

    /// Replays a script of responses; answers `Pending` once empty.
    pub struct ReplayBackend {
        script: Mutex<VecDeque<ApiResult<VerifyOutcome>>>,
        pub calls: AtomicUsize,
    }

    impl ReplayBackend {
        pub fn new(script: Vec<ApiResult<VerifyOutcome>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl VerifyBackend for ReplayBackend {
        async fn verify_payment(&self, _payment_id: &str) -> ApiResult<VerifyOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(VerifyOutcome::Pending))
        }
    }

    /// Holds every call open until released, to pin the poller in its
    /// in-flight state.
    #[derive(Clone)]
    pub struct GatedBackend {
        pub release: Arc<Notify>,
        pub calls: Arc<AtomicUsize>,
    }

    impl GatedBackend {
        pub fn new() -> Self {
            Self {
                release: Arc::new(Notify::new()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl VerifyBackend for GatedBackend {
        async fn verify_payment(&self, _payment_id: &str) -> ApiResult<VerifyOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(VerifyOutcome::Settled {
                subscription_type: Some(Plan::Pro),
                subscription_expiry: None,
            })
        }
    }

    pub fn settled(plan: Plan) -> ApiResult<VerifyOutcome> {
        Ok(VerifyOutcome::Settled {
            subscription_type: Some(plan),
            subscription_expiry: None,
        })
    }
}

mod verification_trigger_tests {
    use super::support::*;
    use crate::verification::*;
    use resumebuilder_shared::Plan;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    // =========================================================================
    // PAY-V01: Trigger while a verification call is outstanding - the
    // duplicate must be dropped without a second backend call
    // =========================================================================
    #[tokio::test]
    async fn duplicate_trigger_during_outstanding_call_is_dropped() {
        let backend = GatedBackend::new();
        let release = backend.release.clone();
        let calls = backend.calls.clone();
        let verifier = Arc::new(PaymentVerifier::new(backend));

        let driver = tokio::spawn({
            let verifier = verifier.clone();
            async move { verifier.run(Some("pay_1")).await }
        });
        // Let the driver reach the backend and block there.
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let duplicate = verifier.run(Some("pay_1")).await;
        assert_eq!(duplicate, RunOutcome::AlreadyInFlight);

        release.notify_one();
        let outcome = driver.await.unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::Finished(VerificationState::Success(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "one call total");
    }

    // =========================================================================
    // PAY-V02: Trigger during the retry wait - the poller owns the
    // identifier for the whole schedule, not just while a call is out
    // =========================================================================
    #[tokio::test(start_paused = true)]
    async fn trigger_during_retry_wait_is_dropped() {
        let verifier = Arc::new(PaymentVerifier::new(ReplayBackend::new(vec![
            Ok(VerifyOutcome::Pending),
            settled(Plan::Pro),
        ])));

        let driver = tokio::spawn({
            let verifier = verifier.clone();
            async move { verifier.run(Some("pay_1")).await }
        });
        // One attempt has happened; the poller is sleeping until the next.
        tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
        assert_eq!(
            verifier.state(),
            VerificationState::PendingRetry { next_attempt: 2 }
        );

        assert_eq!(verifier.run(Some("pay_1")).await, RunOutcome::AlreadyInFlight);

        let outcome = driver.await.unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::Finished(VerificationState::Success(_))
        ));
    }

    // =========================================================================
    // PAY-V03: Terminal failure is as sticky as terminal success -
    // re-triggering a declined payment issues no further calls
    // =========================================================================
    #[tokio::test]
    async fn declined_payment_stays_declined_without_new_calls() {
        let verifier = PaymentVerifier::new(ReplayBackend::new(vec![Ok(
            VerifyOutcome::Rejected {
                status: "failed".into(),
                message: None,
            },
        )]));

        let first = verifier.run(Some("pay_1")).await;
        assert!(matches!(
            first,
            RunOutcome::Finished(VerificationState::Failed(VerificationFailure::Declined { .. }))
        ));

        for _ in 0..3 {
            let again = verifier.run(Some("pay_1")).await;
            assert!(matches!(again, RunOutcome::AlreadyTerminal(_)));
        }
        assert_eq!(verifier.backend().calls.load(Ordering::SeqCst), 1);
    }

    // =========================================================================
    // PAY-V04: N simultaneous triggers - exactly one drives the state
    // machine, the rest observe
    // =========================================================================
    #[tokio::test(start_paused = true)]
    async fn only_one_of_simultaneous_triggers_drives() {
        let verifier = PaymentVerifier::new(ReplayBackend::new(vec![
            Ok(VerifyOutcome::Pending),
            settled(Plan::Starter),
        ]));

        let (a, b, c) = tokio::join!(
            verifier.run(Some("pay_1")),
            verifier.run(Some("pay_1")),
            verifier.run(Some("pay_1")),
        );

        let finished = [&a, &b, &c]
            .iter()
            .filter(|o| matches!(o, RunOutcome::Finished(_)))
            .count();
        assert_eq!(finished, 1, "exactly one trigger drives verification");
        assert_eq!(verifier.backend().calls.load(Ordering::SeqCst), 2);
    }
}

mod conversion_dedup_tests {
    use super::support::*;
    use crate::flow::{Destination, Navigator, SuccessPageFlow};
    use crate::reconcile::test_support::FakeReconciler;
    use crate::tracking::test_support::configured_reporter;
    use crate::verification::PaymentVerifier;
    use resumebuilder_shared::Plan;
    use std::sync::Arc;

    struct NullNavigator;

    impl Navigator for NullNavigator {
        fn navigate(&self, _destination: Destination) {}
    }

    // =========================================================================
    // PAY-C01: The modal completion handler and the success page both
    // see the same payment - one conversion event total
    // =========================================================================
    #[tokio::test(start_paused = true)]
    async fn modal_and_success_page_paths_share_one_conversion() {
        let (reporter, sink) = configured_reporter();

        // Modal completion handler reports first.
        assert!(reporter.report_purchase(Plan::Pro, "pay_1", None));

        // The gateway also redirects to the success page with the same
        // identifier.
        let flow = SuccessPageFlow::new(
            PaymentVerifier::new(ReplayBackend::new(vec![settled(Plan::Pro)])),
            Arc::new(FakeReconciler::with_profile(None)),
            reporter,
            Arc::new(NullNavigator) as Arc<dyn Navigator>,
        );
        flow.handle_return(Some("pay_1")).await;

        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }
}

mod session_reconcile_tests {
    use super::support::*;
    use crate::flow::{Destination, Navigator, ReturnOutcome, SuccessPageFlow};
    use crate::reconcile::test_support::FakeReconciler;
    use crate::verification::PaymentVerifier;
    use resumebuilder_shared::Plan;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingNavigator {
        visits: Mutex<Vec<Destination>>,
    }

    impl Navigator for CountingNavigator {
        fn navigate(&self, destination: Destination) {
            self.visits.lock().unwrap().push(destination);
        }
    }

    // =========================================================================
    // PAY-S01: Refresh fails after a verified payment - the payment is
    // still confirmed and the redirect still happens; the session just
    // catches up on the next navigation
    // =========================================================================
    #[tokio::test(start_paused = true)]
    async fn failed_refresh_does_not_demote_a_confirmed_payment() {
        let reconciler = Arc::new(FakeReconciler {
            profile: Mutex::new(None),
            refreshes: std::sync::atomic::AtomicUsize::new(0),
            refresh_ok: false,
        });
        let navigator = Arc::new(CountingNavigator::default());
        let (reporter, _) = crate::tracking::test_support::configured_reporter();

        let flow = SuccessPageFlow::new(
            PaymentVerifier::new(ReplayBackend::new(vec![settled(Plan::Pro)])),
            reconciler.clone(),
            reporter,
            navigator.clone() as Arc<dyn Navigator>,
        );

        let outcome = flow.handle_return(Some("pay_1")).await;

        assert!(matches!(outcome, ReturnOutcome::Confirmed(_)));
        assert_eq!(reconciler.refresh_count(), 1);
        assert_eq!(navigator.visits.lock().unwrap().as_slice(), &[Destination::Dashboard]);
    }
}
