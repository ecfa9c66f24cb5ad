//! Error types for authpipe.
//!
//! One unified error type with explicit variants for transport,
//! authentication, protocol, input validation, storage and configuration
//! errors. Every variant is `Clone` so that a single refresh failure can be
//! delivered to every request that was waiting on it.

use std::fmt;
use thiserror::Error;

/// The unified error type for authpipe operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors raised by the client itself.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The backend answered with a non-success status.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (invalid URL, header, path).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Credential store failures.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid client configuration.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Returns true if the backend rejected the request as unauthorized (401).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Protocol(e) if e.is_unauthorized())
    }

    /// Returns the HTTP status if the backend produced a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol(e) => Some(e.status),
            _ => None,
        }
    }
}

/// Transport-level errors: no response was received.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The response body could not be decoded.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication errors produced by the refresh pipeline.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The task driving the refresh was dropped before it finished.
    #[error("credential refresh was abandoned")]
    RefreshAbandoned,
}

/// Protocol-level errors: the backend responded with a non-2xx status.
#[derive(Debug, Clone)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable error code from the body (if present).
    pub code: Option<String>,
    /// Human-readable detail from the body (if present).
    pub detail: Option<String>,
    /// Raw response body, when one was sent.
    pub body: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a protocol error without a body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            code: None,
            detail: None,
            body: None,
        }
    }

    /// Build a protocol error from a raw response body.
    ///
    /// JSON bodies of the form `{"detail": "...", "code": "..."}` have those
    /// fields lifted out; anything else is kept only as the raw body.
    pub fn from_body(status: u16, body: &str) -> Self {
        let mut error = Self::new(status);
        if body.is_empty() {
            return error;
        }

        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) {
            error.code = map.get("code").and_then(|v| v.as_str()).map(String::from);
            error.detail = map
                .get("detail")
                .and_then(|v| v.as_str())
                .map(String::from);
        }
        error.body = Some(body.to_string());
        error
    }

    /// Check if this is an unauthorized (401) response.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Parse the raw body as JSON, if there is one.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Header name or value that cannot be sent.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Request body could not be serialized.
    #[error("invalid body: {reason}")]
    Body { reason: String },
}

/// Credential store failures.
///
/// These never escape the refresh pipeline; they are logged and treated as
/// absence (reads) or skipped (writes).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The stored data could not be parsed or serialized.
    #[error("corrupt credential data: {message}")]
    Corrupt { message: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt {
            message: err.to_string(),
        }
    }
}
