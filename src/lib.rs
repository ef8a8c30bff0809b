//! ccache HTTP(S) remote storage helper.
//!
//! A local helper process that bridges ccache to an HTTP(S) object store.
//! ccache speaks a small length-prefixed binary protocol over a local IPC
//! channel (a Unix domain socket, or a named pipe on Windows); each request
//! is translated into an HTTP call against the configured storage endpoint
//! and the result is relayed back over the same channel.
//!
//! # Data Flow
//! ```text
//! ccache ──IPC──▶ net::IpcListener ──▶ server (accept loop)
//!                                           │ one task per connection
//!                                           ▼
//!                   protocol (decode) ──▶ server::dispatcher
//!                                           │
//!                                           ▼
//!                   storage::HttpStorage ──HTTP──▶ backend
//! ```

pub mod config;
pub mod logging;
pub mod net;
pub mod protocol;
pub mod server;
pub mod storage;

// Cross-cutting concerns
pub mod lifecycle;

pub use config::Config;
pub use lifecycle::Shutdown;
pub use server::Server;
