//! Shared helpers for the mock backend tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use authpipe_core::error::StoreError;
use authpipe_core::{CredentialPair, CredentialStore, MemoryStore};
use authpipe_http::ApiClient;
use wiremock::MockServer;

/// Install a test subscriber once. Set `RUST_LOG=authpipe_http=debug` to see
/// the pipeline's logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Base URL of the mock backend. HTTP is allowed for loopback hosts only.
pub fn mock_base_url(server: &MockServer) -> String {
    format!("http://127.0.0.1:{}/api/", server.address().port())
}

/// A client against `server` whose store already holds `pair`, with the
/// pair's access credential attached.
pub fn signed_in_client(
    server: &MockServer,
    pair: CredentialPair,
) -> (ApiClient, Arc<CountingStore>) {
    init_tracing();
    let access = pair.access.clone();
    let store = Arc::new(CountingStore::with_pair(pair));
    let client = ApiClient::builder()
        .base_url(mock_base_url(server))
        .refresh_timeout(Duration::from_secs(5))
        .store(store.clone())
        .build()
        .unwrap();
    client.set_credential(access);
    (client, store)
}

/// Memory store that counts writes and clears.
#[derive(Debug)]
pub struct CountingStore {
    inner: MemoryStore,
    sets: AtomicUsize,
    clears: AtomicUsize,
}

impl CountingStore {
    pub fn empty() -> Self {
        Self {
            inner: MemoryStore::new("test"),
            sets: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            inner: MemoryStore::with_pair("test", pair),
            sets: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub async fn stored(&self) -> Option<CredentialPair> {
        self.inner.get().await.unwrap()
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    fn scope(&self) -> &str {
        self.inner.scope()
    }

    async fn get(&self) -> Result<Option<CredentialPair>, StoreError> {
        self.inner.get().await
    }

    async fn set(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(pair).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear().await
    }
}
