//! Client-side session cache
//!
//! Holds the auth token (via the token store) and the last fetched
//! user profile. All mutation goes through a narrow API so the
//! invariants hold everywhere:
//!
//! - the subscription tier never regresses except via logout, a 401,
//!   or a fetched profile that says so
//! - a failed refresh leaves the previous session untouched
//! - session writes are last-writer-wins and only originate from
//!   login, signup, explicit refresh, or logout/401

use std::sync::{Arc, PoisonError, RwLock};

use resumebuilder_shared::Plan;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ApiError, ApiResult};
use crate::http::ApiClient;

/// The authenticated user's cached snapshot, as returned by
/// `GET /api/auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub subscription_type: Plan,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub subscription_expiry: Option<OffsetDateTime>,
    pub resume_count: i64,
    pub ats_analysis_count: i64,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Owns the session snapshot and the operations that may replace it.
pub struct SessionStore {
    api: ApiClient,
    profile: RwLock<Option<UserProfile>>,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Arc<Self> {
        Arc::new(Self {
            api,
            profile: RwLock::new(None),
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Current cached profile, if any.
    pub fn current(&self) -> Option<UserProfile> {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscription_tier(&self) -> Option<Plan> {
        self.current().map(|p| p.subscription_type)
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.tokens().load().is_some() && self.current().is_some()
    }

    /// Replace the session atomically: token and profile together.
    pub fn set_session(&self, token: &str, profile: UserProfile) {
        self.api.tokens().save(token);
        *self
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(profile);
    }

    /// Drop token and profile. Called on logout and confirmed 401.
    pub fn clear_session(&self) {
        self.api.tokens().clear();
        *self
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn replace_profile(&self, profile: UserProfile) {
        *self
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(profile);
    }

    /// Authenticate and populate the session.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<UserProfile> {
        let response: TokenResponse = self
            .api
            .post_json("/api/auth/login", &LoginRequest { email, password })
            .await?;

        let token = response
            .access_token
            .ok_or_else(|| ApiError::Decode("no access token in login response".into()))?;
        self.api.tokens().save(&token);

        let profile: UserProfile = self.api.get_json("/api/auth/me").await?;
        tracing::info!(user_id = profile.id, "login succeeded");
        self.replace_profile(profile.clone());
        Ok(profile)
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// The backend's signup endpoint does not return a token, so this
    /// is a signup + login + profile fetch sequence.
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> ApiResult<UserProfile> {
        let _: serde_json::Value = self
            .api
            .post_json(
                "/api/auth/signup",
                &SignupRequest {
                    email,
                    password,
                    name,
                },
            )
            .await?;
        tracing::info!("signup accepted, logging in");
        self.login(email, password).await
    }

    pub fn logout(&self) {
        self.clear_session();
        tracing::info!("logged out");
    }

    /// Validate the stored token against the backend on navigation.
    ///
    /// Only a confirmed 401 clears the session. Rate limits and
    /// transport failures keep the user logged in; the token is
    /// probably still valid.
    pub async fn check_auth(&self) -> ApiResult<()> {
        if self.api.tokens().load().is_none() {
            *self
                .profile
                .write()
                .unwrap_or_else(PoisonError::into_inner) = None;
            return Ok(());
        }

        match self.api.get_json::<UserProfile>("/api/auth/me").await {
            Ok(profile) => {
                self.replace_profile(profile);
                Ok(())
            }
            Err(ApiError::Unauthorized) => {
                // The token is already cleared by the API client.
                *self
                    .profile
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = None;
                Err(ApiError::Unauthorized)
            }
            Err(err) => {
                tracing::warn!(error = %err, "check_auth failed, keeping session");
                Ok(())
            }
        }
    }

    /// Fetch the authoritative profile and replace the cached one.
    ///
    /// On failure the previous session stays untouched; a refresh is
    /// never allowed to clear authentication state.
    pub async fn refresh(&self) -> bool {
        if self.api.tokens().load().is_none() {
            return false;
        }

        match self.api.get_json::<UserProfile>("/api/auth/me").await {
            Ok(profile) => {
                tracing::info!(
                    subscription = %profile.subscription_type,
                    "session refreshed"
                );
                self.replace_profile(profile);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "session refresh failed, keeping previous snapshot");
                false
            }
        }
    }
}
