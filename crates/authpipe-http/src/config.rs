//! Client configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use authpipe_core::{ApiUrl, CredentialStore, Error, MemoryStore, Result};

use crate::client::ApiClient;
use crate::endpoints::{PROFILE_PATH, REFRESH_PATH, TOKEN_PATH};

/// Default timeout for requests, in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Scope used when no credential store is supplied.
const DEFAULT_SCOPE: &str = "session";

/// Settings for an [`ApiClient`].
///
/// Deserializable so it can be embedded in an application's own config
/// file; only `base_url` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against.
    pub base_url: ApiUrl,

    /// Path of the token refresh endpoint.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Path of the login (token) endpoint.
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Path of the current-user profile endpoint used by bootstrap.
    #[serde(default = "default_profile_path")]
    pub profile_path: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Timeout for the refresh call alone. Falls back to `timeout_ms`.
    #[serde(default)]
    pub refresh_timeout_ms: Option<u64>,

    /// User agent sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_refresh_path() -> String {
    REFRESH_PATH.to_string()
}

fn default_token_path() -> String {
    TOKEN_PATH.to_string()
}

fn default_profile_path() -> String {
    PROFILE_PATH.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl ClientConfig {
    /// Configuration with default paths and timeouts for `base_url`.
    pub fn new(base_url: ApiUrl) -> Self {
        Self {
            base_url,
            refresh_path: default_refresh_path(),
            token_path: default_token_path(),
            profile_path: default_profile_path(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            refresh_timeout_ms: None,
            user_agent: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms.unwrap_or(self.timeout_ms))
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| concat!("authpipe/", env!("CARGO_PKG_VERSION")).to_string())
    }
}

/// Builder for creating an [`ApiClient`].
///
/// # Example
///
/// ```no_run
/// use authpipe_http::ApiClient;
///
/// # fn example() -> authpipe_core::Result<()> {
/// let client = ApiClient::builder()
///     .base_url("https://api.example.com/api/")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    refresh_path: Option<String>,
    token_path: Option<String>,
    profile_path: Option<String>,
    timeout: Option<Duration>,
    refresh_timeout: Option<Duration>,
    user_agent: Option<String>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for the backend.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    pub fn token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn profile_path(mut self, path: impl Into<String>) -> Self {
        self.profile_path = Some(path.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound how long a refresh call may take before it counts as failed.
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Persist credentials in `store`. Defaults to an in-memory store.
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self.base_url.ok_or_else(|| Error::Config {
            message: "base_url is required".to_string(),
        })?;

        let mut config = ClientConfig::new(ApiUrl::new(base_url)?);
        if let Some(path) = self.refresh_path {
            config.refresh_path = path;
        }
        if let Some(path) = self.token_path {
            config.token_path = path;
        }
        if let Some(path) = self.profile_path {
            config.profile_path = path;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_ms = duration_ms(timeout);
        }
        config.refresh_timeout_ms = self.refresh_timeout.map(duration_ms);
        config.user_agent = self.user_agent;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new(DEFAULT_SCOPE)));

        ApiClient::new(config, store)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}
