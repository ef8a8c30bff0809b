//! Encoding and decoding of greeting, requests, and responses.
//!
//! Both directions are implemented so client tooling and tests can speak
//! the protocol; the server itself only decodes requests and encodes the
//! greeting and responses.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version announced in the greeting.
pub const PROTOCOL_VERSION: u8 = 0x01;
/// Capability byte 0: supports get/put/remove/stop.
pub const CAP_BASE: u8 = 0x00;

const REQUEST_GET: u8 = 0x00;
const REQUEST_PUT: u8 = 0x01;
const REQUEST_REMOVE: u8 = 0x02;
const REQUEST_STOP: u8 = 0x03;

const RESPONSE_OK: u8 = 0x00;
const RESPONSE_NOOP: u8 = 0x01;
const RESPONSE_ERR: u8 = 0x02;

const PUT_FLAG_OVERWRITE: u8 = 0x01;

/// Keys carry a one-byte length prefix.
pub const MAX_KEY_LEN: usize = 255;
/// Error messages carry a one-byte length prefix; longer messages are
/// silently truncated.
pub const MAX_ERR_LEN: usize = 255;

/// Server greeting, sent once per connection immediately after accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub version: u8,
    pub capabilities: Vec<u8>,
}

/// A single client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get {
        key: Vec<u8>,
    },
    Put {
        key: Vec<u8>,
        value: Vec<u8>,
        overwrite: bool,
    },
    Remove {
        key: Vec<u8>,
    },
    Stop,
    /// Unrecognized request tag. Only the tag byte has been consumed.
    Unknown(u8),
}

/// A single server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Success; carries a value only when answering a Get.
    Ok(Option<Vec<u8>>),
    /// Not found / already exists. A first-class outcome, not a failure.
    Noop,
    /// Backend or protocol error, with a short message.
    Err(String),
}

/// Write the greeting.
pub async fn write_greeting<W: AsyncWrite + Unpin>(w: &mut W) -> io::Result<()> {
    let caps = [CAP_BASE];
    w.write_u8(PROTOCOL_VERSION).await?;
    w.write_u8(caps.len() as u8).await?;
    w.write_all(&caps).await?;
    w.flush().await
}

/// Read the greeting.
pub async fn read_greeting<R: AsyncRead + Unpin>(r: &mut R) -> io::Result<Greeting> {
    let version = r.read_u8().await?;
    let cap_count = r.read_u8().await?;
    let mut capabilities = vec![0u8; cap_count as usize];
    r.read_exact(&mut capabilities).await?;
    Ok(Greeting {
        version,
        capabilities,
    })
}

/// Read one request.
pub async fn read_request<R: AsyncRead + Unpin>(r: &mut R) -> io::Result<Request> {
    let tag = r.read_u8().await?;
    match tag {
        REQUEST_GET => Ok(Request::Get {
            key: read_key(r).await?,
        }),
        REQUEST_PUT => {
            let key = read_key(r).await?;
            let flags = r.read_u8().await?;
            let value = read_value(r).await?;
            Ok(Request::Put {
                key,
                value,
                overwrite: flags & PUT_FLAG_OVERWRITE != 0,
            })
        }
        REQUEST_REMOVE => Ok(Request::Remove {
            key: read_key(r).await?,
        }),
        REQUEST_STOP => Ok(Request::Stop),
        other => Ok(Request::Unknown(other)),
    }
}

/// Write one request.
pub async fn write_request<W: AsyncWrite + Unpin>(w: &mut W, request: &Request) -> io::Result<()> {
    match request {
        Request::Get { key } => {
            w.write_u8(REQUEST_GET).await?;
            write_key(w, key).await?;
        }
        Request::Put {
            key,
            value,
            overwrite,
        } => {
            w.write_u8(REQUEST_PUT).await?;
            write_key(w, key).await?;
            let flags = if *overwrite { PUT_FLAG_OVERWRITE } else { 0 };
            w.write_u8(flags).await?;
            write_value(w, value).await?;
        }
        Request::Remove { key } => {
            w.write_u8(REQUEST_REMOVE).await?;
            write_key(w, key).await?;
        }
        Request::Stop => {
            w.write_u8(REQUEST_STOP).await?;
        }
        Request::Unknown(tag) => {
            w.write_u8(*tag).await?;
        }
    }
    w.flush().await
}

/// Write one response.
pub async fn write_response<W: AsyncWrite + Unpin>(
    w: &mut W,
    response: &Response,
) -> io::Result<()> {
    match response {
        Response::Ok(None) => {
            w.write_u8(RESPONSE_OK).await?;
        }
        Response::Ok(Some(value)) => {
            w.write_u8(RESPONSE_OK).await?;
            write_value(w, value).await?;
        }
        Response::Noop => {
            w.write_u8(RESPONSE_NOOP).await?;
        }
        Response::Err(msg) => {
            w.write_u8(RESPONSE_ERR).await?;
            let bytes = msg.as_bytes();
            let len = bytes.len().min(MAX_ERR_LEN);
            w.write_u8(len as u8).await?;
            w.write_all(&bytes[..len]).await?;
        }
    }
    w.flush().await
}

/// Read one response.
///
/// The `Ok` framing depends on the request it answers (only Get carries a
/// value), so the caller states what it expects.
pub async fn read_response<R: AsyncRead + Unpin>(
    r: &mut R,
    expect_value: bool,
) -> io::Result<Response> {
    let status = r.read_u8().await?;
    match status {
        RESPONSE_OK if expect_value => Ok(Response::Ok(Some(read_value(r).await?))),
        RESPONSE_OK => Ok(Response::Ok(None)),
        RESPONSE_NOOP => Ok(Response::Noop),
        RESPONSE_ERR => {
            let len = r.read_u8().await?;
            let mut msg = vec![0u8; len as usize];
            r.read_exact(&mut msg).await?;
            Ok(Response::Err(String::from_utf8_lossy(&msg).into_owned()))
        }
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown response status: {other:#04x}"),
        )),
    }
}

async fn read_key<R: AsyncRead + Unpin>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = r.read_u8().await?;
    let mut key = vec![0u8; len as usize];
    r.read_exact(&mut key).await?;
    Ok(key)
}

async fn write_key<W: AsyncWrite + Unpin>(w: &mut W, key: &[u8]) -> io::Result<()> {
    if key.len() > MAX_KEY_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("key length {} exceeds {}", key.len(), MAX_KEY_LEN),
        ));
    }
    w.write_u8(key.len() as u8).await?;
    w.write_all(key).await
}

async fn read_value<R: AsyncRead + Unpin>(r: &mut R) -> io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 8];
    r.read_exact(&mut len_bytes).await?;
    let len = u64::from_ne_bytes(len_bytes);
    let mut value = vec![0u8; len as usize];
    r.read_exact(&mut value).await?;
    Ok(value)
}

async fn write_value<W: AsyncWrite + Unpin>(w: &mut W, value: &[u8]) -> io::Result<()> {
    w.write_all(&(value.len() as u64).to_ne_bytes()).await?;
    w.write_all(value).await
}
