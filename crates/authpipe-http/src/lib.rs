//! authpipe-http - Bearer-authenticated HTTP client with single-flight
//! credential refresh.
//!
//! All requests flow through an [`ApiClient`]. The client attaches the
//! current access credential, and when the backend answers 401 it performs
//! one refresh call on behalf of every request that failed concurrently,
//! then replays each of them once with the new credential.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authpipe_core::{Credentials, MemoryStore};
//! use authpipe_http::{ApiClient, SessionState};
//!
//! # async fn example() -> authpipe_core::Result<()> {
//! let client = ApiClient::builder()
//!     .base_url("https://api.example.com/api/")
//!     .store(Arc::new(MemoryStore::new("session")))
//!     .build()?;
//!
//! match client.bootstrap::<serde_json::Value>().await {
//!     SessionState::Authenticated(profile) => println!("welcome back {}", profile["username"]),
//!     SessionState::LoggedOut => {
//!         client.login(&Credentials::new("alice", "hunter2")).await?;
//!     }
//! }
//!
//! let reviews: serde_json::Value = client.get("reviews/").await?;
//! # Ok(())
//! # }
//! ```

mod attach;
mod bootstrap;
mod client;
mod config;
mod coordinator;
mod endpoints;
mod persist;
mod request;
mod transport;

pub use attach::CredentialAttachment;
pub use bootstrap::SessionState;
pub use client::ApiClient;
pub use config::{ClientBuilder, ClientConfig};
pub use coordinator::{RefreshCoordinator, RefreshLease, Ticket};
pub use endpoints::{PROFILE_PATH, REFRESH_PATH, TOKEN_PATH};
pub use request::{ApiResponse, Attempt, RequestDescriptor};
pub use transport::Transport;
