// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ResumeBuilder Billing Module
//!
//! Handles the client side of the payment lifecycle: plan selection,
//! order creation, gateway launch, and post-payment reconciliation.
//!
//! ## Features
//!
//! - **Gateway Adapter**: One launch call over the modal widget and
//!   the hosted-redirect checkout
//! - **Order Initiation**: Backend-priced orders from plan + billing
//!   cycle + detected country
//! - **Verification Poller**: Bounded fixed-interval polling that
//!   reconciles a gateway return into a confirmed subscription
//! - **Session Reconciliation**: Refresh the cached profile once the
//!   backend has applied the upgrade
//! - **Conversion Reporting**: Config-gated, deduplicated analytics
//!   events for paid conversions

pub mod error;
pub mod flow;
pub mod gateway;
pub mod geo;
pub mod orders;
pub mod reconcile;
pub mod tracking;
pub mod verification;

#[cfg(test)]
mod edge_case_tests;

// Error
pub use error::{BillingError, BillingResult};

// Flows
pub use flow::{
    payment_id_from_url, CheckoutFlow, Destination, Navigator, ReturnOutcome, SuccessPageFlow,
    UpgradeOutcome,
};

// Gateway
pub use gateway::{
    CheckoutOrder, CheckoutSurface, CreateOrderResponse, GatewayAdapter, GatewayKind,
    HostedCheckout, LaunchOutcome, ModalCheckout, ModalCompletion,
};

// Geo
pub use geo::{GeoLocator, DEFAULT_COUNTRY};

// Orders
pub use orders::{OrderService, PaymentConfirmation};

// Session reconciliation
pub use reconcile::SessionReconciler;

// Conversion tracking
pub use tracking::{AnalyticsSink, ConversionEvent, ConversionReporter, LoggingSink};

// Verification
pub use verification::{
    ConfirmedPayment, PaymentApi, PaymentVerifier, RecoveryAction, RetryPolicy, RunOutcome,
    VerificationFailure, VerificationState, VerifyBackend, VerifyOutcome, MAX_VERIFY_ATTEMPTS,
    SUCCESS_REDIRECT_DELAY, VERIFY_RETRY_INTERVAL,
};
