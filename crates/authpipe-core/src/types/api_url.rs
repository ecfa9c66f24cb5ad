//! API base URL type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::{Host, Url};

use crate::error::{Error, InvalidInputError};

/// A validated base URL for the REST backend.
///
/// Absolute, HTTPS (plain HTTP is accepted for loopback hosts so local
/// development servers and test doubles work), and free of query or
/// fragment. Request paths are resolved under it with [`ApiUrl::endpoint`].
///
/// ```
/// use authpipe_core::ApiUrl;
///
/// let api: ApiUrl = "https://api.example.com/api/".parse().unwrap();
/// assert_eq!(api.endpoint("auth/token/refresh/"),
///            "https://api.example.com/api/auth/token/refresh/");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiUrl(Url);

impl ApiUrl {
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let raw = s.as_ref();
        let invalid = |reason: String| InvalidInputError::ApiUrl {
            value: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        match rejection(&url) {
            Some(reason) => Err(invalid(reason.to_string()).into()),
            None => Ok(Self(url)),
        }
    }

    /// Absolute URL for `path` under this base.
    ///
    /// `"/users/"` and `"users/"` resolve to the same endpoint; a trailing
    /// slash on `path` is kept.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.0.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

/// Why `url` cannot serve as a base, if it can't.
fn rejection(url: &Url) -> Option<&'static str> {
    if url.cannot_be_a_base() {
        return Some("must be an absolute URL");
    }
    let Some(host) = url.host() else {
        return Some("must have a host");
    };
    match url.scheme() {
        "https" => {}
        "http" if is_loopback(&host) => {}
        _ => return Some("must use HTTPS (HTTP allowed only for localhost)"),
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Some("must not carry a query or fragment");
    }
    None
}

fn is_loopback(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(name) => *name == "localhost",
        Host::Ipv4(addr) => addr.is_loopback(),
        Host::Ipv6(addr) => addr.is_loopback(),
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::new(s)
    }
}

impl Serialize for ApiUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ApiUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ApiUrl::new(raw).map_err(serde::de::Error::custom)
    }
}
