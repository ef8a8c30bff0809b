//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// Backend object store, keyed by request path.
pub type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// Start a minimal in-memory HTTP object store supporting GET, HEAD, PUT,
/// and DELETE. Returns the bound address and a handle to the stored
/// objects for assertions.
pub async fn start_mock_backend() -> (SocketAddr, Store) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store: Store = Arc::new(Mutex::new(HashMap::new()));

    let accept_store = store.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(serve_client(socket, accept_store.clone()));
                }
                Err(_) => break,
            }
        }
    });

    (addr, store)
}

async fn serve_client(socket: TcpStream, store: Store) {
    let mut reader = BufReader::new(socket);

    loop {
        let mut request_line = String::new();
        match reader.read_line(&mut request_line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
            return;
        };
        let method = method.to_string();
        let path = path.to_string();

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            match reader.read_line(&mut header).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        let mut body = vec![0u8; content_length];
        if content_length > 0 && reader.read_exact(&mut body).await.is_err() {
            return;
        }

        let (status, response_body) = {
            let mut entries = store.lock().await;
            match method.as_str() {
                "GET" => match entries.get(&path) {
                    Some(value) => ("200 OK", value.clone()),
                    None => ("404 Not Found", Vec::new()),
                },
                "HEAD" => match entries.get(&path) {
                    Some(_) => ("200 OK", Vec::new()),
                    None => ("404 Not Found", Vec::new()),
                },
                "PUT" => {
                    entries.insert(path.clone(), body);
                    ("201 Created", Vec::new())
                }
                "DELETE" => match entries.remove(&path) {
                    Some(_) => ("200 OK", Vec::new()),
                    None => ("404 Not Found", Vec::new()),
                },
                _ => ("405 Method Not Allowed", Vec::new()),
            }
        };

        let header = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\n\r\n",
            status,
            response_body.len()
        );
        let socket = reader.get_mut();
        if socket.write_all(header.as_bytes()).await.is_err() {
            return;
        }
        if method != "HEAD" && socket.write_all(&response_body).await.is_err() {
            return;
        }
        if socket.flush().await.is_err() {
            return;
        }
    }
}
