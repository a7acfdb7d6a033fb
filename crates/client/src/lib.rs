#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Resume Builder API client
//!
//! The authenticated HTTP layer shared by every flow in the product:
//!
//! - **Config**: environment-driven settings (backend base URL,
//!   gateway key, analytics ids) with optional features degrading to
//!   warnings
//! - **ApiClient**: reqwest wrapper that attaches the bearer token to
//!   every request and translates HTTP failures into the error
//!   taxonomy (401 clears the token, 403 never does)
//! - **SessionStore**: the cached user/subscription snapshot with a
//!   narrow mutation API (`set_session`, `clear_session`, `refresh`)

pub mod config;
pub mod error;
pub mod http;
pub mod session;

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use http::{ApiClient, MemoryTokenStore, TokenStore};
pub use session::{SessionStore, UserProfile};

/// Initialize tracing for binaries and integration harnesses.
///
/// Respects `RUST_LOG`; defaults to info with debug for our crates.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,resumebuilder_client=debug,resumebuilder_billing=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
