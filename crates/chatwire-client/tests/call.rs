//! Integration tests for the client connection against a scripted server.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use chatwire_client::{ClientConnection, ClientError};
use chatwire_protocol::{Envelope, JsonLineCodec, MessageType, WireCodec};

/// Binds a scripted server that answers every request line by echoing a
/// GET_USER_INFO_RESPONSE carrying the request's `marker` payload value.
async fn echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let codec = JsonLineCodec;
                let (read, mut write) = stream.into_split();
                let mut lines = BufReader::new(read).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let request = codec.decode(&line).expect("decode");
                    let mut response = Envelope::new(
                        MessageType::GetUserInfoResponse,
                    );
                    if let Some(marker) = request.get_str("marker") {
                        response.put("marker", marker);
                    }
                    let out = codec.encode(&response).expect("encode");
                    write.write_all(out.as_bytes()).await.expect("write");
                    write.write_all(b"\n").await.expect("write");
                }
            });
        }
    });

    port
}

fn request_with_marker(marker: &str) -> Envelope {
    Envelope::builder(MessageType::GetUserInfoRequest)
        .put("marker", marker)
        .build()
}

#[tokio::test]
async fn test_call_round_trip() {
    let port = echo_server().await;
    let conn = ClientConnection::new();
    conn.open("127.0.0.1", port).await.expect("open");
    assert!(conn.is_connected().await);

    let response = conn.call(&request_with_marker("one")).await.expect("call");
    assert_eq!(response.kind(), MessageType::GetUserInfoResponse);
    assert_eq!(response.get_str("marker"), Some("one"));
}

#[tokio::test]
async fn test_call_before_open_is_not_connected() {
    let conn = ClientConnection::new();
    let err = conn.call(&request_with_marker("x")).await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
}

#[tokio::test]
async fn test_call_after_close_is_not_connected() {
    let port = echo_server().await;
    let conn = ClientConnection::new();
    conn.open("127.0.0.1", port).await.expect("open");

    conn.close().await;
    assert!(!conn.is_connected().await);
    // close is idempotent.
    conn.close().await;

    let err = conn.call(&request_with_marker("x")).await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
}

#[tokio::test]
async fn test_open_refused() {
    // Grab a port, then close the listener so connecting fails.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let conn = ClientConnection::new();
    let err = conn.open("127.0.0.1", port).await.unwrap_err();
    assert!(matches!(err, ClientError::Connect(_)));
    assert!(!conn.is_connected().await);
}

#[tokio::test]
async fn test_peer_close_mid_call() {
    // A server that reads one line and hangs up without answering.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let (read, _write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let _ = lines.next_line().await;
        // Both halves drop here, closing the stream.
    });

    let conn = ClientConnection::new();
    conn.open("127.0.0.1", port).await.expect("open");

    let err = conn.call(&request_with_marker("x")).await.unwrap_err();
    assert!(matches!(err, ClientError::Closed));
    // The dead socket was forgotten.
    assert!(!conn.is_connected().await);
}

#[tokio::test]
async fn test_timeout_releases_the_call_lock() {
    // A server that accepts and then never responds.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        // Hold the socket open forever without writing.
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(_)) = lines.next_line().await {}
    });

    let conn = ClientConnection::new()
        .call_timeout(Duration::from_millis(100));
    conn.open("127.0.0.1", port).await.expect("open");

    let err = conn.call(&request_with_marker("a")).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout));

    // The lock must not still be held: a second call gets its own
    // timeout instead of blocking forever.
    let second = tokio::time::timeout(
        Duration::from_secs(2),
        conn.call(&request_with_marker("b")),
    )
    .await
    .expect("second call must not deadlock");
    assert!(matches!(second.unwrap_err(), ClientError::Timeout));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_are_fully_serialized() {
    let port = echo_server().await;
    let conn = Arc::new(ClientConnection::new());
    conn.open("127.0.0.1", port).await.expect("open");

    // Many tasks share the connection. If two calls ever interleaved
    // their lines, some task would read the response belonging to
    // another task's request; the markers make that visible.
    let mut tasks = Vec::new();
    for i in 0..16 {
        let conn = Arc::clone(&conn);
        tasks.push(tokio::spawn(async move {
            for round in 0..10 {
                let marker = format!("task-{i}-round-{round}");
                let response = conn
                    .call(&request_with_marker(&marker))
                    .await
                    .expect("call");
                assert_eq!(response.get_str("marker"), Some(marker.as_str()));
            }
        }));
    }
    for task in tasks {
        task.await.expect("task");
    }
}
