//! API error taxonomy
//!
//! Every backend call failure is translated into one of these
//! variants at the point of call. The split between `Unauthorized`
//! and `RateLimited` is load-bearing: a 401 clears the stored token,
//! a 403 must never touch it.

/// Errors surfaced by the API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Confirmed 401 from the backend. The token has already been
    /// cleared by the time this is returned.
    #[error("not authenticated")]
    Unauthorized,

    /// 403 from the backend, typically rate limiting. The session
    /// stays intact.
    #[error("request rejected (rate limited)")]
    RateLimited,

    /// Structured non-2xx backend response.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Transport-level failure (connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Transient failures that should not destroy local state and may
    /// be retried under a bounded policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::RateLimited | ApiError::Transport(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
