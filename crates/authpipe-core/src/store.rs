//! Credential store contract.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::tokens::CredentialPair;

/// Scoped persistent storage for a [`CredentialPair`].
///
/// Implementations must write the pair as a unit: after `set` returns, a
/// `get` never observes a new access token next to a stale refresh token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Name of the scope this store reads and writes.
    fn scope(&self) -> &str;

    /// Read the stored pair, if any.
    async fn get(&self) -> Result<Option<CredentialPair>, StoreError>;

    /// Replace the stored pair.
    async fn set(&self, pair: &CredentialPair) -> Result<(), StoreError>;

    /// Remove the stored pair. Clearing an empty store succeeds.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory credential store.
///
/// Nothing survives the process; useful for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    scope: String,
    pair: RwLock<Option<CredentialPair>>,
}

impl MemoryStore {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            pair: RwLock::new(None),
        }
    }

    /// Create a store that already holds `pair`.
    pub fn with_pair(scope: impl Into<String>, pair: CredentialPair) -> Self {
        Self {
            scope: scope.into(),
            pair: RwLock::new(Some(pair)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    fn scope(&self) -> &str {
        &self.scope
    }

    async fn get(&self) -> Result<Option<CredentialPair>, StoreError> {
        Ok(self.pair.read().await.clone())
    }

    async fn set(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        *self.pair.write().await = Some(pair.clone());
        debug!(scope = %self.scope, "stored credential pair");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.pair.write().await = None;
        debug!(scope = %self.scope, "cleared credential pair");
        Ok(())
    }
}
