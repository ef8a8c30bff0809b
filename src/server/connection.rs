//! Per-connection request/response loop.
//!
//! Requests on one connection are handled strictly sequentially: read,
//! dispatch, respond, read the next. There is no pipelining.

use std::io;
use std::sync::Arc;

use crate::net::IpcStream;
use crate::protocol::codec;
use crate::server::{dispatcher, ServerContext};

/// Drive one connection until disconnect, framing error, or Stop.
pub async fn handle(mut stream: IpcStream, ctx: Arc<ServerContext>) {
    if let Err(e) = codec::write_greeting(&mut stream).await {
        tracing::warn!(error = %e, "failed to send greeting");
        return;
    }

    loop {
        let request = match codec::read_request(&mut stream).await {
            Ok(request) => request,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::debug!("client disconnected");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "request framing error");
                return;
            }
        };

        let (response, stop) = dispatcher::dispatch(request, &ctx.storage).await;

        if let Err(e) = codec::write_response(&mut stream, &response).await {
            tracing::warn!(error = %e, "failed to write response");
            return;
        }

        if stop {
            tracing::info!("stop requested, shutting down");
            ctx.shutdown.trigger();
            return;
        }

        ctx.idle.reset();
    }
}
