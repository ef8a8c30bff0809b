//! Storage translation layer.
//!
//! # Data Flow
//! ```text
//! get/put/remove (abstract key + value)
//!     → layout.rs (key → backend path)
//!     → http.rs (verb mapping, one reqwest client, global op lock)
//!     → HTTP backend
//! ```
//!
//! # Design Decisions
//! - Not-found and already-exists are outcomes, not errors: `get` returns
//!   `Option`, `put`/`remove` return whether anything happened.
//! - All operations are serialized behind a single lock; see
//!   [`http::HttpStorage`].
//! - No retries: ccache treats a failed remote operation as a cache miss.

pub mod http;
pub mod layout;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpStorage;
pub use layout::Layout;

/// Errors from the storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend answered with an unexpected HTTP status.
    #[error("HTTP {0}")]
    Status(u16),

    /// The request never completed (connect, TLS, timeout, ...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

/// Abstract storage operations, as seen by the request dispatcher.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a value. `None` means the key does not exist.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a value. Returns `false` when `overwrite` is unset and the key
    /// already exists (the entry is left unchanged).
    async fn put(&self, key: &[u8], value: &[u8], overwrite: bool) -> Result<bool, StorageError>;

    /// Remove a value. Returns `false` when the key does not exist.
    async fn remove(&self, key: &[u8]) -> Result<bool, StorageError>;
}
