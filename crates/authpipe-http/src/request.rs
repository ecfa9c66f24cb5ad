//! Request descriptors and responses.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use authpipe_core::error::{InvalidInputError, TransportError};
use authpipe_core::Result;

/// Whether a request has already been replayed after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// First send; a 401 may enter the refresh flow.
    Fresh,
    /// Replayed once; a 401 is surfaced to the caller.
    Retried,
}

/// Everything needed to (re-)issue a request.
///
/// The body is kept serialized so the request can be replayed byte for byte
/// after a credential refresh.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
    attempt: Attempt,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            attempt: Attempt::Fresh,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| InvalidInputError::Body {
            reason: e.to_string(),
        })?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Send `bytes` verbatim with the given content type, replacing the
    /// JSON default (e.g. `multipart/form-data; boundary=...`).
    pub fn raw_body(self, content_type: &str, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let mut request = self.header(CONTENT_TYPE.as_str(), content_type)?;
        request.body = Some(bytes.into());
        Ok(request)
    }

    /// Add a per-request header, overriding any default with the same name.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let mut header_value =
            HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        if header_name == AUTHORIZATION {
            header_value.set_sensitive(true);
        }
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Override the client-wide timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// Consume a fresh descriptor and return its one-shot replay.
    ///
    /// A per-call `Authorization` override is dropped so the replay carries
    /// the renewed credential.
    pub(crate) fn into_retry(mut self) -> Self {
        self.attempt = Attempt::Retried;
        self.headers.remove(AUTHORIZATION);
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Decode the body as JSON. An empty body decodes as `null`, so `()` and
    /// `Option<T>` work for 204 responses.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes: &[u8] = if self.body.is_empty() {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(bytes).map_err(|e| {
            TransportError::Decode {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_requests_are_fresh() {
        let request = RequestDescriptor::get("movies/");
        assert_eq!(request.attempt(), Attempt::Fresh);
        assert_eq!(request.into_retry().attempt(), Attempt::Retried);
    }

    #[test]
    fn retry_drops_authorization_override() {
        let request = RequestDescriptor::get("movies/")
            .header("authorization", "Bearer stale")
            .unwrap()
            .header("x-request-id", "42")
            .unwrap();
        let replay = request.into_retry();
        assert!(replay.headers().get(AUTHORIZATION).is_none());
        assert_eq!(replay.headers().get("x-request-id").unwrap(), "42");
    }

    #[test]
    fn json_body_is_kept_serialized() {
        let request = RequestDescriptor::post("movies/")
            .json(&json!({"title": "Heat"}))
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(request.body().unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Heat"}));
    }

    #[test]
    fn raw_body_overrides_content_type() {
        let request = RequestDescriptor::post("profile/avatar/")
            .raw_body("multipart/form-data; boundary=xyz", b"--xyz--".to_vec())
            .unwrap();
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "multipart/form-data; boundary=xyz"
        );
        assert_eq!(request.body(), Some(&b"--xyz--"[..]));
    }

    #[test]
    fn invalid_header_is_rejected() {
        assert!(RequestDescriptor::get("x").header("bad header", "v").is_err());
        assert!(RequestDescriptor::get("x").header("x-ok", "line\nbreak").is_err());
    }

    #[test]
    fn authorization_override_is_redacted_in_debug() {
        let request = RequestDescriptor::get("x")
            .header("authorization", "Bearer secret-token")
            .unwrap();
        let debug = format!("{:?}", request);
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn empty_body_decodes_as_unit() {
        let response = ApiResponse {
            status: 204,
            headers: HeaderMap::new(),
            body: Vec::new(),
        };
        let () = response.json().unwrap();
        let absent: Option<serde_json::Value> = response.json().unwrap();
        assert!(absent.is_none());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let response = ApiResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: b"not json".to_vec(),
        };
        let err = response.json::<serde_json::Value>().unwrap_err();
        assert!(err.to_string().contains("decode error"));
    }
}
