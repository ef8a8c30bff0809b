//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     idle timer fires | Stop request | external cancellation
//!         → Shutdown::trigger() (once, irreversible)
//!         → accept loop exits, connections drain naturally
//!
//! Idle timer (idle.rs):
//!     server start / accepted connection / processed request
//!         → IdleTimer::reset() (replaces the countdown)
//!     countdown elapses → Shutdown::trigger()
//! ```
//!
//! # Design Decisions
//! - One process-wide shutdown signal, set at most once, observed
//!   cooperatively; nothing restarts after it fires.
//! - In-flight connections are never forcibly closed.

pub mod idle;
pub mod shutdown;

pub use idle::IdleTimer;
pub use shutdown::Shutdown;
