//! Wire protocol between ccache and the helper.
//!
//! # Data Flow
//! ```text
//! Connection accepted
//!     → greeting (version + capability bytes), server to client, once
//!     → request/response pairs until disconnect or Stop
//!
//! Request:  type:u8, then type-specific fields
//! Response: status:u8, then status-specific fields
//! ```
//!
//! # Design Decisions
//! - Multi-byte integers are native-endian; helper and client always run
//!   on the same host.
//! - Decoding is strict: any short read is a framing error that terminates
//!   the connection. No validation of key or value content.
//! - An unrecognized request tag decodes as `Request::Unknown` rather than
//!   an error, so the server can answer with an `Err` response and keep
//!   the connection open.

pub mod codec;

pub use codec::{Greeting, Request, Response};
