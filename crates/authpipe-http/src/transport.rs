//! HTTP transport: one shared reqwest client bound to the API base URL.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, instrument, trace};

use authpipe_core::error::{Error, InvalidInputError, ProtocolError, TransportError};
use authpipe_core::{AccessToken, ApiUrl, Result};

use crate::config::ClientConfig;
use crate::request::{ApiResponse, RequestDescriptor};

/// Issues requests against the configured base URL.
///
/// Carries the JSON defaults; the bearer credential is passed per call so
/// the caller decides whether a request is authenticated.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: ApiUrl,
    timeout: Duration,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
        })
    }

    /// Returns the base URL this transport is bound to.
    pub fn base_url(&self) -> &ApiUrl {
        &self.base_url
    }

    /// Send `request`, attaching `access` as a bearer credential if given.
    ///
    /// Non-2xx responses become [`ProtocolError`]s carrying the status and
    /// body; failures without a response become [`TransportError`]s.
    #[instrument(skip(self, request, access), fields(method = %request.method(), path = request.path()))]
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        access: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        let url = self.base_url.endpoint(request.path());
        let timeout = request.timeout_override().unwrap_or(self.timeout);
        debug!(authenticated = access.is_some(), "sending request");

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .timeout(timeout);

        if let Some(token) = access {
            builder = builder.header(AUTHORIZATION, bearer_header(token)?);
        }
        // Per-call headers win over defaults and the attached credential.
        builder = builder.headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        trace!(status = %status, bytes = body.len(), "response received");

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                headers,
                body: body.to_vec(),
            })
        } else {
            let error = ProtocolError::from_body(status.as_u16(), &String::from_utf8_lossy(&body));
            debug!(status = status.as_u16(), "request rejected");
            Err(error.into())
        }
    }
}

fn bearer_header(token: &AccessToken) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&token.bearer()).map_err(|e| InvalidInputError::Header {
        name: AUTHORIZATION.to_string(),
        reason: e.to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Classify a reqwest failure; no response was received.
fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    let error = if err.is_timeout() {
        TransportError::Timeout {
            duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    error.into()
}
