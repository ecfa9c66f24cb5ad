//! authpipe-core - Core types and traits for the authpipe HTTP client.

pub mod credentials;
pub mod error;
pub mod store;
pub mod tokens;
pub mod types;

pub use credentials::Credentials;
pub use error::Error;
pub use store::{CredentialStore, MemoryStore};
pub use tokens::{AccessToken, CredentialPair, RefreshToken};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
