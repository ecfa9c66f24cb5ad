//! Default `Authorization` header state.

use std::sync::{PoisonError, RwLock};

use tracing::debug;

use authpipe_core::AccessToken;

/// Holds the access credential the transport attaches to outgoing requests.
///
/// Pure in-memory state: setting and clearing never fail and never touch
/// the network.
#[derive(Debug, Default)]
pub struct CredentialAttachment {
    current: RwLock<Option<AccessToken>>,
}

impl CredentialAttachment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `Authorization: Bearer <access>` to subsequent requests.
    pub fn set_credential(&self, access: AccessToken) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(access);
        debug!("attached access credential");
    }

    /// Stop attaching an `Authorization` header. Idempotent.
    pub fn clear_credential(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("cleared access credential");
        }
    }

    /// Snapshot of the currently attached credential.
    pub fn current(&self) -> Option<AccessToken> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_without_credential() {
        assert!(CredentialAttachment::new().current().is_none());
    }

    #[test]
    fn set_replaces_previous_credential() {
        let attachment = CredentialAttachment::new();
        attachment.set_credential(AccessToken::new("old"));
        attachment.set_credential(AccessToken::new("new"));
        assert_eq!(attachment.current(), Some(AccessToken::new("new")));
    }

    #[test]
    fn clear_is_idempotent() {
        let attachment = CredentialAttachment::new();
        attachment.set_credential(AccessToken::new("old"));
        attachment.clear_credential();
        attachment.clear_credential();
        assert!(attachment.current().is_none());
    }
}
