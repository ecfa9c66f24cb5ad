//! Session bootstrap: restore a stored session on process start.

use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::client::ApiClient;
use crate::persist;

/// Outcome of [`ApiClient::bootstrap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState<P> {
    /// Stored credentials were valid; holds the current user's profile.
    Authenticated(P),
    /// No usable session. Storage and the attached header are clear.
    LoggedOut,
}

impl<P> SessionState<P> {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn profile(&self) -> Option<&P> {
        match self {
            SessionState::Authenticated(profile) => Some(profile),
            SessionState::LoggedOut => None,
        }
    }

    pub fn into_profile(self) -> Option<P> {
        match self {
            SessionState::Authenticated(profile) => Some(profile),
            SessionState::LoggedOut => None,
        }
    }
}

impl ApiClient {
    /// Restore the stored session and validate it against the profile
    /// endpoint.
    ///
    /// Await this before rendering anything that depends on login state.
    /// Any failure (including a failed refresh while fetching the profile)
    /// leaves the client fully logged out rather than half-authenticated.
    #[instrument(skip(self), fields(scope = self.store().scope()))]
    pub async fn bootstrap<P: DeserializeOwned>(&self) -> SessionState<P> {
        let Some(pair) = persist::load(self.store().as_ref()).await else {
            info!("no stored session");
            self.clear_credential();
            return SessionState::LoggedOut;
        };

        self.set_credential(pair.access);

        let profile_path = self.config().profile_path.clone();
        match self.get::<P>(&profile_path).await {
            Ok(profile) => {
                info!("restored stored session");
                SessionState::Authenticated(profile)
            }
            Err(e) => {
                warn!(error = %e, "stored session rejected, logging out");
                // A failed refresh has already ended the session.
                if self.credential().is_some() {
                    self.logout().await;
                }
                SessionState::LoggedOut
            }
        }
    }
}
