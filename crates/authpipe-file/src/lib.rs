//! authpipe-file - Filesystem-backed credential store for authpipe.
//!
//! [`FileStore`] keeps one JSON file per scope so a session survives
//! process restarts:
//!
//! ```text
//! <dir>/
//!   <scope>.json    {"access": "...", "refresh": "...", "saved_at": "..."}
//! ```
//!
//! Writes go to a temporary file that is renamed over the target, so a
//! reader sees either the old pair or the new one, never a mix.

mod store;

pub use store::FileStore;
