//! Bearer credential types.
//!
//! Token values are opaque. They are redacted from `Debug` output and are
//! only read back through `as_str` when building a request.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! secret_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(token: impl Into<String>) -> Self {
                Self(token.into())
            }

            /// The raw token, for request construction only.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "([REDACTED])"))
            }
        }
    };
}

secret_token! {
    /// Short-lived credential sent as `Authorization: Bearer <token>`.
    AccessToken
}

secret_token! {
    /// Longer-lived credential exchanged at the refresh endpoint for a new
    /// [`AccessToken`]. Never attached to ordinary requests.
    RefreshToken
}

impl AccessToken {
    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

/// The access/refresh pair persisted by a credential store.
///
/// Always written and read back as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: AccessToken,
    pub refresh: RefreshToken,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: AccessToken::new(access),
            refresh: RefreshToken::new(refresh),
        }
    }

    /// Same refresh credential, new access credential.
    pub fn with_access(&self, access: AccessToken) -> Self {
        Self {
            access,
            refresh: self.refresh.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let pair = CredentialPair::new("header.payload.sig", "rotating-refresh-42");
        let debug = format!("{:?}", pair);

        assert!(!debug.contains("payload"));
        assert!(!debug.contains("rotating"));
        assert!(debug.contains("AccessToken([REDACTED])"));
        assert!(debug.contains("RefreshToken([REDACTED])"));
    }

    #[test]
    fn pair_serializes_as_plain_strings() {
        let pair = CredentialPair::new("old", "r1");
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json, serde_json::json!({"access": "old", "refresh": "r1"}));
    }

    #[test]
    fn with_access_keeps_refresh() {
        let pair = CredentialPair::new("old", "r1");
        let updated = pair.with_access(AccessToken::new("new"));
        assert_eq!(updated.access.as_str(), "new");
        assert_eq!(updated.refresh.as_str(), "r1");
    }

    #[test]
    fn bearer_header_value() {
        assert_eq!(AccessToken::new("abc").bearer(), "Bearer abc");
    }
}
