//! Local IPC transport layer.
//!
//! # Data Flow
//! ```text
//! Configured endpoint address
//!     → listener.rs (bind: unix socket | windows named pipe)
//!     → accept → IpcStream (AsyncRead + AsyncWrite)
//!     → hand off to the connection handler
//! ```
//!
//! # Design Decisions
//! - The platform split lives entirely in this module; everything above it
//!   sees one `IpcListener`/`IpcStream` surface.
//! - Failure to bind is fatal and aborts startup.

pub mod listener;

pub use listener::{IpcListener, IpcStream, ListenerError};
