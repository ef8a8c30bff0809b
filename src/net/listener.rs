//! IPC listener implementation.
//!
//! # Responsibilities
//! - Bind the configured local endpoint (Unix socket or named pipe)
//! - Accept incoming client connections
//! - Restrict socket access to the owning user
//! - Clean up the socket path on shutdown

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

#[cfg(windows)]
use tokio::net::windows::named_pipe::{NamedPipeServer, ServerOptions};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to remove a stale socket path.
    Cleanup(io::Error),
    /// Failed to bind to the endpoint.
    Bind(io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Cleanup(e) => write!(f, "failed to remove existing socket: {}", e),
            ListenerError::Bind(e) => write!(f, "failed to bind: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Listener on the local IPC endpoint.
///
/// On Unix this is a filesystem socket created with owner-only permissions;
/// on Windows a named pipe whose next instance is created ahead of each
/// accept.
pub enum IpcListener {
    #[cfg(unix)]
    Unix { listener: UnixListener, path: String },
    #[cfg(windows)]
    Pipe { server: NamedPipeServer, path: String },
}

impl IpcListener {
    /// Bind the endpoint. On Unix a stale socket path is removed first
    /// (ignoring not-found) and the process umask is set to 0o077 around
    /// the bind so the socket is owner-only, then restored.
    #[cfg(unix)]
    pub fn bind(endpoint: &str) -> Result<Self, ListenerError> {
        match std::fs::remove_file(endpoint) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ListenerError::Cleanup(e)),
        }

        let old_mask = unsafe { libc::umask(0o077) };
        let result = UnixListener::bind(endpoint);
        unsafe { libc::umask(old_mask) };

        let listener = result.map_err(ListenerError::Bind)?;
        Ok(IpcListener::Unix {
            listener,
            path: endpoint.to_string(),
        })
    }

    /// Bind the endpoint. The address is already the full pipe path
    /// (`\\.\pipe\<name>`, prefixed by the configuration layer).
    #[cfg(windows)]
    pub fn bind(endpoint: &str) -> Result<Self, ListenerError> {
        let server = ServerOptions::new()
            .first_pipe_instance(true)
            .create(endpoint)
            .map_err(ListenerError::Bind)?;
        Ok(IpcListener::Pipe {
            server,
            path: endpoint.to_string(),
        })
    }

    /// Accept the next client connection.
    pub async fn accept(&mut self) -> io::Result<IpcStream> {
        match self {
            #[cfg(unix)]
            IpcListener::Unix { listener, .. } => {
                let (stream, _addr) = listener.accept().await?;
                Ok(IpcStream::Unix(stream))
            }
            #[cfg(windows)]
            IpcListener::Pipe { server, path } => {
                server.connect().await?;
                // A named pipe instance serves one client; create the next
                // instance before handing this one off.
                let next = ServerOptions::new().create(path.as_str())?;
                let connected = std::mem::replace(server, next);
                Ok(IpcStream::Pipe(connected))
            }
        }
    }

    /// The endpoint address this listener is bound to.
    pub fn endpoint(&self) -> &str {
        match self {
            #[cfg(unix)]
            IpcListener::Unix { path, .. } => path,
            #[cfg(windows)]
            IpcListener::Pipe { path, .. } => path,
        }
    }
}

#[cfg(unix)]
impl Drop for IpcListener {
    fn drop(&mut self) {
        let IpcListener::Unix { path, .. } = self;
        let _ = std::fs::remove_file(path);
    }
}

/// One accepted duplex byte channel.
pub enum IpcStream {
    #[cfg(unix)]
    Unix(UnixStream),
    #[cfg(windows)]
    Pipe(NamedPipeServer),
}

impl AsyncRead for IpcStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            IpcStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(windows)]
            IpcStream::Pipe(pipe) => Pin::new(pipe).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for IpcStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            #[cfg(unix)]
            IpcStream::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(windows)]
            IpcStream::Pipe(pipe) => Pin::new(pipe).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            IpcStream::Unix(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(windows)]
            IpcStream::Pipe(pipe) => Pin::new(pipe).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            IpcStream::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(windows)]
            IpcStream::Pipe(pipe) => Pin::new(pipe).poll_shutdown(cx),
        }
    }
}
