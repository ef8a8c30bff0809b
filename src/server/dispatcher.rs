//! Request dispatch: one decoded request in, one response out.

use crate::protocol::{Request, Response};
use crate::storage::Storage;

/// Translate one request into exactly one response plus a stop flag.
///
/// Backend failures become `Err` responses; they never terminate the
/// connection. An unknown request tag is a protocol violation but is also
/// answered with `Err`, and the server keeps reading further requests.
pub async fn dispatch<S: Storage>(request: Request, storage: &S) -> (Response, bool) {
    match request {
        Request::Get { key } => {
            tracing::debug!(key = %hex::encode(&key), "get request");
            match storage.get(&key).await {
                Ok(Some(value)) => {
                    tracing::debug!(bytes = value.len(), "get hit");
                    (Response::Ok(Some(value)), false)
                }
                Ok(None) => {
                    tracing::debug!("get miss");
                    (Response::Noop, false)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "get failed");
                    (Response::Err(e.to_string()), false)
                }
            }
        }
        Request::Put {
            key,
            value,
            overwrite,
        } => {
            tracing::debug!(key = %hex::encode(&key), bytes = value.len(), "put request");
            match storage.put(&key, &value, overwrite).await {
                Ok(true) => (Response::Ok(None), false),
                Ok(false) => {
                    tracing::debug!("put skipped, entry exists");
                    (Response::Noop, false)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "put failed");
                    (Response::Err(e.to_string()), false)
                }
            }
        }
        Request::Remove { key } => {
            tracing::debug!(key = %hex::encode(&key), "remove request");
            match storage.remove(&key).await {
                Ok(true) => (Response::Ok(None), false),
                Ok(false) => {
                    tracing::debug!("remove miss");
                    (Response::Noop, false)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "remove failed");
                    (Response::Err(e.to_string()), false)
                }
            }
        }
        Request::Stop => (Response::Ok(None), true),
        Request::Unknown(tag) => {
            tracing::warn!(tag = %format!("{tag:#04x}"), "unknown request type");
            (Response::Err(format!("unknown request type: {tag:#04x}")), false)
        }
    }
}
