//! Best-effort access to the credential store.
//!
//! Persistence is a durability optimization for the in-memory session, so
//! store failures are logged here and never reach the caller.

use tracing::warn;

use authpipe_core::{CredentialPair, CredentialStore};

/// Read the stored pair; a failed read counts as no pair.
pub(crate) async fn load(store: &dyn CredentialStore) -> Option<CredentialPair> {
    match store.get().await {
        Ok(pair) => pair,
        Err(e) => {
            warn!(scope = store.scope(), error = %e, "failed to read stored credentials, treating as absent");
            None
        }
    }
}

pub(crate) async fn save(store: &dyn CredentialStore, pair: &CredentialPair) {
    if let Err(e) = store.set(pair).await {
        warn!(scope = store.scope(), error = %e, "failed to persist credentials");
    }
}

pub(crate) async fn wipe(store: &dyn CredentialStore) {
    if let Err(e) = store.clear().await {
        warn!(scope = store.scope(), error = %e, "failed to clear stored credentials");
    }
}
