//! End-to-end tests: binary protocol over a Unix socket, HTTP against a
//! mock backend.

#![cfg(unix)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UnixStream;

use crsh::config::Config;
use crsh::protocol::codec::{self, PROTOCOL_VERSION};
use crsh::protocol::{Request, Response};
use crsh::server::Server;
use crsh::storage::Layout;

mod common;

fn test_config(backend: SocketAddr, socket_path: &Path) -> Config {
    Config {
        log_file: None,
        ipc_endpoint: socket_path.to_str().unwrap().to_string(),
        url: format!("http://{backend}/cache").parse().unwrap(),
        idle_timeout: Duration::ZERO,
        layout: Layout::Subdirs,
        bearer_token: None,
        headers: Vec::new(),
    }
}

fn socket_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("crsh.sock")
}

/// The server binds asynchronously after spawn; retry until it answers.
async fn connect(path: &Path) -> UnixStream {
    for _ in 0..100 {
        if let Ok(stream) = UnixStream::connect(path).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server did not start listening on {}", path.display());
}

async fn roundtrip(stream: &mut UnixStream, request: &Request) -> Response {
    codec::write_request(stream, request).await.unwrap();
    let expect_value = matches!(request, Request::Get { .. });
    codec::read_response(stream, expect_value).await.unwrap()
}

#[tokio::test]
async fn put_get_remove_stop_scenario() {
    let (backend, store) = common::start_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);

    let server = Server::new(test_config(backend, &path)).unwrap();
    let server_task = tokio::spawn(server.run());

    let mut stream = connect(&path).await;

    let greeting = codec::read_greeting(&mut stream).await.unwrap();
    assert_eq!(greeting.version, PROTOCOL_VERSION);
    assert_eq!(greeting.capabilities, vec![0x00]);

    // First put stores; the backend sees the subdirs path under /cache.
    let put = Request::Put {
        key: vec![0xab],
        value: b"x".to_vec(),
        overwrite: false,
    };
    assert_eq!(roundtrip(&mut stream, &put).await, Response::Ok(None));
    assert_eq!(
        store.lock().await.get("/cache/ab/").map(Vec::as_slice),
        Some(&b"x"[..])
    );

    // Second identical non-overwrite put leaves the entry unchanged.
    assert_eq!(roundtrip(&mut stream, &put).await, Response::Noop);

    let get = Request::Get { key: vec![0xab] };
    assert_eq!(
        roundtrip(&mut stream, &get).await,
        Response::Ok(Some(b"x".to_vec()))
    );

    let remove = Request::Remove { key: vec![0xab] };
    assert_eq!(roundtrip(&mut stream, &remove).await, Response::Ok(None));
    assert_eq!(roundtrip(&mut stream, &get).await, Response::Noop);

    // Stop answers Ok, then the server stops accepting connections.
    assert_eq!(roundtrip(&mut stream, &Request::Stop).await, Response::Ok(None));
    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server did not stop after Stop request")
        .unwrap()
        .unwrap();
    assert!(!path.exists(), "socket should be removed on shutdown");
}

#[tokio::test]
async fn unknown_request_tag_keeps_connection_usable() {
    let (backend, _store) = common::start_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);

    let server = Server::new(test_config(backend, &path)).unwrap();
    let _server_task = tokio::spawn(server.run());

    let mut stream = connect(&path).await;
    codec::read_greeting(&mut stream).await.unwrap();

    let response = roundtrip(&mut stream, &Request::Unknown(0xff)).await;
    assert_eq!(
        response,
        Response::Err("unknown request type: 0xff".to_string())
    );

    // The connection still serves valid requests afterwards.
    let get = Request::Get { key: vec![0x01] };
    assert_eq!(roundtrip(&mut stream, &get).await, Response::Noop);
}

#[tokio::test]
async fn backend_failure_is_reported_without_closing_the_connection() {
    // Point the helper at a port nothing listens on.
    let unreachable: SocketAddr = "127.0.0.1:1".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);

    let server = Server::new(test_config(unreachable, &path)).unwrap();
    let _server_task = tokio::spawn(server.run());

    let mut stream = connect(&path).await;
    codec::read_greeting(&mut stream).await.unwrap();

    let get = Request::Get { key: vec![0x01] };
    assert!(matches!(roundtrip(&mut stream, &get).await, Response::Err(_)));

    // Still open: another request gets another answer.
    assert!(matches!(roundtrip(&mut stream, &get).await, Response::Err(_)));
}

#[tokio::test]
async fn idle_timeout_shuts_the_server_down() {
    let (backend, _store) = common::start_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);

    let mut config = test_config(backend, &path);
    config.idle_timeout = Duration::from_millis(300);

    let server = Server::new(config).unwrap();
    let server_task = tokio::spawn(server.run());

    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("idle timer did not shut the server down")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn activity_postpones_idle_shutdown() {
    let (backend, _store) = common::start_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);

    let mut config = test_config(backend, &path);
    config.idle_timeout = Duration::from_millis(500);

    let server = Server::new(config).unwrap();
    let shutdown = server.shutdown_handle();
    let _server_task = tokio::spawn(server.run());

    let mut stream = connect(&path).await;
    codec::read_greeting(&mut stream).await.unwrap();

    // Keep the helper busy past several timeout windows.
    let get = Request::Get { key: vec![0x01] };
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(roundtrip(&mut stream, &get).await, Response::Noop);
        assert!(!shutdown.is_triggered(), "shutdown fired despite activity");
    }

    // Quiet period: now it may fire.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(shutdown.is_triggered());
}
