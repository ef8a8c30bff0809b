//! Connection/protocol server.
//!
//! # Data Flow
//! ```text
//! IpcListener → accept loop → connection.rs (one task per connection)
//!     → protocol decode → dispatcher.rs → storage → protocol encode
//!
//! Lifecycle:
//!     Starting → Listening → ShuttingDown → Stopped
//! ```
//!
//! # Design Decisions
//! - One task per accepted connection, unbounded; concurrency is limited by
//!   the local ccache population, not by untrusted remote load.
//! - Shared state (storage, idle timer, shutdown signal) lives in one
//!   explicit `ServerContext` owned by the server; no ambient globals.
//! - Transient accept errors never kill the accept loop.

pub mod connection;
pub mod dispatcher;

use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::lifecycle::{IdleTimer, Shutdown};
use crate::net::{IpcListener, ListenerError};
use crate::storage::{HttpStorage, StorageError};

/// Fatal server errors; all of them abort startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to create listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("failed to create storage: {0}")]
    Storage(#[from] StorageError),
}

/// Shared state handed to every connection task.
pub struct ServerContext {
    pub storage: HttpStorage,
    pub shutdown: Shutdown,
    pub idle: IdleTimer,
}

/// The helper server: owns the listener lifecycle, the accept loop, the
/// idle timer, and the global shutdown signal.
pub struct Server {
    config: Config,
    ctx: Arc<ServerContext>,
}

impl Server {
    /// Create the server and its storage client.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let storage = HttpStorage::new(&config)?;
        let shutdown = Shutdown::new();
        let idle = IdleTimer::new(config.idle_timeout, shutdown.clone());

        Ok(Self {
            config,
            ctx: Arc::new(ServerContext {
                storage,
                shutdown,
                idle,
            }),
        })
    }

    /// Handle for requesting shutdown from outside the server (signal
    /// handlers, embedding tests).
    pub fn shutdown_handle(&self) -> Shutdown {
        self.ctx.shutdown.clone()
    }

    /// Bind the listener and run until shutdown is triggered by the idle
    /// timer, a Stop request, or external cancellation.
    ///
    /// Returns once the accept loop has exited; in-flight connections are
    /// not forcibly closed and drain naturally.
    pub async fn run(self) -> Result<(), ServerError> {
        let mut listener = IpcListener::bind(&self.config.ipc_endpoint)?;
        tracing::info!(endpoint = %listener.endpoint(), "server listening");

        self.ctx.idle.reset();
        let mut shutdown_rx = self.ctx.shutdown.subscribe();

        // A trigger that happened before subscribing would be lost; don't
        // start accepting if shutdown is already requested.
        if self.ctx.shutdown.is_triggered() {
            tracing::info!("server shutting down");
            return Ok(());
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(stream) => {
                        tracing::debug!("client connected");
                        self.ctx.idle.reset();
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(connection::handle(stream, ctx));
                    }
                    Err(e) => {
                        if self.ctx.shutdown.is_triggered() {
                            break;
                        }
                        tracing::warn!(error = %e, "accept error");
                    }
                },
                _ = shutdown_rx.recv() => break,
            }
        }

        tracing::info!("server shutting down");
        Ok(())
    }
}
