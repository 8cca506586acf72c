//! Fail-closed access gate for protected operations.

use crate::api::TokenVerifier;
use crate::session::{Session, SessionStore};

/// Why access was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No stored session; no request was made.
    NoSession,
    /// The backend rejected the token.
    Rejected,
    /// Verification could not complete. Treated exactly like a rejection.
    Unreachable(String),
}

/// Outcome of one guard activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Pending,
    Granted(Session),
    Denied(DenyReason),
}

impl Access {
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Access::Granted(s) => Some(s),
            _ => None,
        }
    }
}

/// Validates the stored token with the backend once per activation.
pub struct SessionGuard<V> {
    store: SessionStore,
    verifier: V,
    access: Access,
}

impl<V: TokenVerifier> SessionGuard<V> {
    pub fn new(store: SessionStore, verifier: V) -> Self {
        Self {
            store,
            verifier,
            access: Access::Pending,
        }
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    /// Run verification from scratch. Anything other than an explicit "valid"
    /// from the backend denies access and clears the stored session.
    pub async fn activate(&mut self) -> &Access {
        self.access = Access::Pending;

        let session = match self.store.load() {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.access = Access::Denied(DenyReason::NoSession);
                return &self.access;
            }
            Err(e) => {
                log::warn!("could not read session: {}", e);
                self.clear_stored();
                self.access = Access::Denied(DenyReason::NoSession);
                return &self.access;
            }
        };

        self.access = match self.verifier.check_token(&session.token).await {
            Ok(true) => {
                log::debug!("session verified for {}", session.email);
                Access::Granted(session)
            }
            Ok(false) => {
                self.clear_stored();
                Access::Denied(DenyReason::Rejected)
            }
            Err(e) => {
                log::warn!("token verification failed: {}", e);
                self.clear_stored();
                Access::Denied(DenyReason::Unreachable(e.to_string()))
            }
        };
        &self.access
    }

    fn clear_stored(&self) {
        if let Err(e) = self.store.clear_session() {
            log::warn!("could not clear session: {}", e);
        }
    }
}
