use anyhow::{bail, Context as _};

use scriptsense_core::{Access, ApiClient, Config, DenyReason, Session, SessionGuard, SessionStore};
use scriptsense_export::FontLibrary;

use crate::output::Output;

/// Resolved configuration plus the handles every command needs.
pub struct Context {
    pub config: Config,
    pub out: Output,
}

impl Context {
    pub fn new(config: Config, color: bool) -> Self {
        Self {
            config,
            out: Output::new(color),
        }
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::new(&self.config.session_path)
    }

    pub fn fonts(&self) -> FontLibrary {
        FontLibrary::new(self.config.font_dir.clone())
    }

    /// Client without credentials, for login and signup.
    pub fn anonymous_api(&self) -> anyhow::Result<ApiClient> {
        ApiClient::new(&self.config).context("could not build HTTP client")
    }

    /// Client carrying the session's bearer token.
    pub fn api(&self, session: &Session) -> anyhow::Result<ApiClient> {
        ApiClient::for_session(&self.config, Some(session)).context("could not build HTTP client")
    }

    /// Verify the stored session with the backend before a protected command.
    pub async fn require_session(&self) -> anyhow::Result<Session> {
        let mut guard = SessionGuard::new(self.store(), self.anonymous_api()?);
        match guard.activate().await {
            Access::Granted(session) => Ok(session.clone()),
            Access::Denied(DenyReason::NoSession) => {
                bail!("not logged in; run `scriptsense login <email>` first")
            }
            Access::Denied(DenyReason::Rejected) => {
                bail!("session expired or invalid; please log in again")
            }
            Access::Denied(DenyReason::Unreachable(e)) => {
                bail!("could not verify session ({e}); please log in again")
            }
            Access::Pending => bail!("session verification did not complete"),
        }
    }
}
