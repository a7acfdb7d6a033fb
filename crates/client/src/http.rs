//! Authenticated HTTP client
//!
//! Wraps `reqwest` with the conventions every backend call shares:
//! the bearer token is read from the token store before each request,
//! and response statuses are translated into [`ApiError`]. A 401
//! clears the stored token here, once, for every call path; a 403 is
//! surfaced as rate limiting and leaves the token alone.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Persistent storage for the auth token.
///
/// The browser original kept this in localStorage; embedders provide
/// whatever durable store fits their platform.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn clear(&self);
}

/// In-memory token store, the default for tests and short-lived tools.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, token: &str) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Shape of backend error bodies (`{"detail": "..."}`).
#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Thin client over the REST backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(config: &Config, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            tokens,
        }
    }

    /// The underlying token store, shared with the session layer.
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        let request = self.authorize(self.http.get(url));
        self.execute(request).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        let request = self.authorize(self.http.post(url)).json(body);
        self.execute(request).await
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Decode(format!("bad endpoint path {path}: {e}")))
    }

    /// Attach the bearer token, read fresh from the store for every
    /// request.
    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.load() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // Confirmed-unauthorized is the only status allowed to
            // destroy the token.
            tracing::warn!("401 from backend, clearing stored token");
            self.tokens.clear();
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::FORBIDDEN {
            tracing::warn!("403 from backend, keeping token (likely rate limited)");
            return Err(ApiError::RateLimited);
        }

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
