//! Billing error types

use resumebuilder_client::ApiError;

/// Errors surfaced by the payment flows.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Bad plan/cycle/order parameters. Surfaced immediately, never
    /// retried; the caller must correct the input.
    #[error("invalid checkout request: {0}")]
    Validation(String),

    /// The backend's order response is missing a field the selected
    /// gateway requires.
    #[error("order response missing {0}")]
    MalformedOrder(&'static str),

    /// The backend refused to confirm a completed modal payment.
    #[error("payment verification rejected")]
    VerificationRejected,

    /// Underlying API failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type BillingResult<T> = Result<T, BillingError>;
