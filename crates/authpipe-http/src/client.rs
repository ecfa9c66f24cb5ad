//! The authenticated API client.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use authpipe_core::{
    AccessToken, CredentialPair, CredentialStore, Credentials, Error, RefreshToken, Result,
};

use crate::attach::CredentialAttachment;
use crate::config::{ClientBuilder, ClientConfig};
use crate::coordinator::{self, RefreshCoordinator, Ticket};
use crate::endpoints::{RefreshRequest, RefreshResponse, TokenRequest, TokenResponse};
use crate::persist;
use crate::request::{ApiResponse, Attempt, RequestDescriptor};
use crate::transport::Transport;

/// HTTP client for a bearer-token protected REST backend.
///
/// Every request carries the attached access credential. A 401 response
/// triggers at most one refresh call no matter how many requests fail at
/// once; each failed request is then replayed once with the new credential.
/// If the refresh fails, stored credentials are cleared and every affected
/// request fails with the refresh error.
///
/// Clients are cheap to clone (they use internal `Arc`) and all clones share
/// the same credential and refresh state. Independent clients share nothing.
///
/// # Example
///
/// ```no_run
/// use authpipe_http::ApiClient;
///
/// # async fn example() -> authpipe_core::Result<()> {
/// let client = ApiClient::builder()
///     .base_url("https://api.example.com/api/")
///     .build()?;
///
/// let movies: serde_json::Value = client.get("movies/").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Transport,
    attachment: CredentialAttachment,
    coordinator: RefreshCoordinator,
    store: Arc<dyn CredentialStore>,
}

impl ApiClient {
    /// Create a client from a configuration and a credential store.
    ///
    /// Nothing is read from the store until a refresh or [`bootstrap`] needs
    /// it.
    ///
    /// [`bootstrap`]: ApiClient::bootstrap
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let transport = Transport::new(&config)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                attachment: CredentialAttachment::new(),
                coordinator: RefreshCoordinator::new(),
                store,
            }),
        })
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    // ========================================================================
    // Credential Attachment
    // ========================================================================

    /// Attach `Authorization: Bearer <access>` to all subsequent requests.
    pub fn set_credential(&self, access: AccessToken) {
        self.inner.attachment.set_credential(access);
    }

    /// Stop attaching an `Authorization` header. Idempotent.
    pub fn clear_credential(&self) {
        self.inner.attachment.clear_credential();
    }

    /// The access credential currently attached, if any.
    pub fn credential(&self) -> Option<AccessToken> {
        self.inner.attachment.current()
    }

    /// Returns true while a refresh call is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.inner.coordinator.is_refreshing()
    }

    // ========================================================================
    // Verb Methods
    // ========================================================================

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send(RequestDescriptor::get(path)).await?.json()
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(RequestDescriptor::post(path).json(body)?)
            .await?
            .json()
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(RequestDescriptor::put(path).json(body)?)
            .await?
            .json()
    }

    pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(RequestDescriptor::patch(path).json(body)?)
            .await?
            .json()
    }

    /// Issue a DELETE. Use `()` as `R` for endpoints that return no content.
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send(RequestDescriptor::delete(path)).await?.json()
    }

    /// Send a request through the refresh pipeline.
    ///
    /// A 401 on the first attempt enters the refresh flow and the request is
    /// replayed once with the new credential. A 401 on the replay is
    /// returned as-is.
    #[instrument(skip(self, request), fields(method = %request.method(), path = request.path()))]
    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        let sent_with = self.inner.attachment.current();

        let unauthorized = match self
            .inner
            .transport
            .execute(&request, sent_with.as_ref())
            .await
        {
            Err(e) if e.is_unauthorized() && request.attempt() == Attempt::Fresh => e,
            other => return other,
        };

        let replay = request.into_retry();
        let access = self.recover(sent_with.as_ref(), unauthorized).await?;

        debug!("replaying request with refreshed credential");
        self.inner.transport.execute(&replay, Some(&access)).await
    }

    /// Obtain a usable access credential after a 401, refreshing at most
    /// once across all concurrent callers.
    async fn recover(
        &self,
        sent_with: Option<&AccessToken>,
        unauthorized: Error,
    ) -> Result<AccessToken> {
        match self
            .inner
            .coordinator
            .acquire(sent_with, &self.inner.attachment)
        {
            Ticket::Replay(access) => Ok(access),
            Ticket::Wait(receiver) => coordinator::join(receiver).await,
            Ticket::Lead(lease) => {
                let outcome = self.renew_access(unauthorized).await;
                lease.release(&outcome);
                outcome
            }
        }
    }

    /// The leader's half of a refresh cycle.
    ///
    /// Without a stored refresh credential no call is made and the original
    /// 401 is returned. Any refresh failure ends the session.
    #[instrument(skip_all)]
    async fn renew_access(&self, unauthorized: Error) -> Result<AccessToken> {
        let store = self.inner.store.as_ref();
        let Some(pair) = persist::load(store).await else {
            warn!("no refresh credential stored, surfacing unauthorized response");
            return Err(unauthorized);
        };

        match self.call_refresh(&pair.refresh).await {
            Ok(response) => {
                let access = AccessToken::new(response.access);
                let renewed = match response.refresh {
                    Some(rotated) => CredentialPair {
                        access: access.clone(),
                        refresh: RefreshToken::new(rotated),
                    },
                    None => pair.with_access(access.clone()),
                };
                persist::save(store, &renewed).await;
                self.inner.attachment.set_credential(access.clone());
                info!("access credential refreshed");
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "credential refresh failed, ending session");
                self.end_session().await;
                Err(e)
            }
        }
    }

    /// Exchange the refresh credential. Bypasses attachment and the 401
    /// retry path.
    async fn call_refresh(&self, refresh: &RefreshToken) -> Result<RefreshResponse> {
        let config = &self.inner.config;
        let request = RequestDescriptor::post(config.refresh_path.as_str())
            .json(&RefreshRequest {
                refresh: refresh.as_str(),
            })?
            .timeout(config.refresh_timeout());

        self.inner.transport.execute(&request, None).await?.json()
    }

    // ========================================================================
    // Login / Logout
    // ========================================================================

    /// Exchange username and password for a credential pair, persist it and
    /// attach its access credential.
    ///
    /// A rejected login is returned as-is; it never enters the refresh flow.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<CredentialPair> {
        info!("Logging in");
        let request = RequestDescriptor::post(self.inner.config.token_path.as_str()).json(
            &TokenRequest {
                username: credentials.username(),
                password: credentials.password(),
            },
        )?;

        let response: TokenResponse = self
            .inner
            .transport
            .execute(&request, None)
            .await?
            .json()?;
        let pair = CredentialPair::new(response.access, response.refresh);

        persist::save(self.inner.store.as_ref(), &pair).await;
        self.inner.attachment.set_credential(pair.access.clone());
        debug!("Login succeeded");
        Ok(pair)
    }

    /// Clear stored credentials and the attached header.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        info!("Logging out");
        self.end_session().await;
    }

    async fn end_session(&self) {
        persist::wipe(self.inner.store.as_ref()).await;
        self.inner.attachment.clear_credential();
    }
}

// Custom Debug impl that hides sensitive data
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url)
            .field("scope", &self.inner.store.scope())
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authpipe_core::{ApiUrl, MemoryStore};

    fn client() -> ApiClient {
        let config = ClientConfig::new(ApiUrl::new("https://api.example.com/api/").unwrap());
        ApiClient::new(config, Arc::new(MemoryStore::new("test"))).unwrap()
    }

    #[test]
    fn clones_share_attachment() {
        let a = client();
        let b = a.clone();
        a.set_credential(AccessToken::new("shared"));
        assert_eq!(b.credential(), Some(AccessToken::new("shared")));
        b.clear_credential();
        assert!(a.credential().is_none());
    }

    #[test]
    fn independent_clients_do_not_share_state() {
        let a = client();
        let b = client();
        a.set_credential(AccessToken::new("only-a"));
        assert!(b.credential().is_none());
    }

    #[test]
    fn debug_hides_credential() {
        let client = client();
        client.set_credential(AccessToken::new("top-secret"));
        let debug = format!("{:?}", client);
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("api.example.com"));
    }

    #[tokio::test]
    async fn logout_clears_store_and_header() {
        let store = Arc::new(MemoryStore::with_pair("test", CredentialPair::new("a", "r")));
        let config = ClientConfig::new(ApiUrl::new("https://api.example.com/").unwrap());
        let client = ApiClient::new(config, store.clone()).unwrap();
        client.set_credential(AccessToken::new("a"));

        client.logout().await;

        assert!(client.credential().is_none());
        assert!(store.get().await.unwrap().is_none());
    }
}
