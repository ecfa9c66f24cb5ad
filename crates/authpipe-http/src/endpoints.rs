//! Auth endpoint paths and request/response types.

use serde::{Deserialize, Serialize};

// ============================================================================
// Default Paths
// ============================================================================

/// Exchanges a refresh credential for a new access credential.
pub const REFRESH_PATH: &str = "auth/token/refresh/";

/// Exchanges username and password for a credential pair.
pub const TOKEN_PATH: &str = "auth/token/";

/// Returns the profile of the authenticated user.
pub const PROFILE_PATH: &str = "auth/users/me/";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the token endpoint.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

/// Request body for the refresh endpoint.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Response from the refresh endpoint.
///
/// Backends that rotate refresh credentials also return a new `refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_request_shape() {
        let body = serde_json::to_value(RefreshRequest { refresh: "r1" }).unwrap();
        assert_eq!(body, serde_json::json!({"refresh": "r1"}));
    }

    #[test]
    fn refresh_response_without_rotation() {
        let resp: RefreshResponse = serde_json::from_str(r#"{"access":"new"}"#).unwrap();
        assert_eq!(resp.access, "new");
        assert!(resp.refresh.is_none());
    }

    #[test]
    fn refresh_response_with_rotation() {
        let resp: RefreshResponse =
            serde_json::from_str(r#"{"access":"new","refresh":"r2"}"#).unwrap();
        assert_eq!(resp.refresh.as_deref(), Some("r2"));
    }
}
