//! Session reconciliation
//!
//! After a payment verifies, the cached session is stale: the backend
//! has already upgraded the subscription, the client still shows the
//! old tier. The flows close that gap through this seam rather than
//! talking to the session store directly, so tests can substitute a
//! scripted reconciler.

use std::sync::Arc;

use resumebuilder_client::{SessionStore, UserProfile};

/// Read-and-refresh view of the signed-in session.
pub trait SessionReconciler: Send + Sync {
    /// The cached profile as of right now, without any I/O.
    fn snapshot(&self) -> Option<UserProfile>;

    /// Re-fetch the authoritative profile. Returns whether the cache
    /// was replaced; a failed refresh keeps the previous snapshot and
    /// never signs the user out.
    fn refresh(&self) -> impl std::future::Future<Output = bool> + Send;
}

impl SessionReconciler for SessionStore {
    fn snapshot(&self) -> Option<UserProfile> {
        self.current()
    }

    async fn refresh(&self) -> bool {
        SessionStore::refresh(self).await
    }
}

impl SessionReconciler for Arc<SessionStore> {
    fn snapshot(&self) -> Option<UserProfile> {
        self.current()
    }

    async fn refresh(&self) -> bool {
        SessionStore::refresh(self.as_ref()).await
    }
}
