//! Integration tests for the TCP line transport.

use chatwire_transport::{Connection, TcpConnection, TcpTransport, Transport};

/// Binds a transport on a random port and returns it with its address.
async fn bind() -> (TcpTransport, String) {
    let transport = TcpTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport
        .local_addr()
        .expect("should have local addr")
        .to_string();
    (transport, addr)
}

#[tokio::test]
async fn test_connect_and_exchange_lines() {
    let (mut transport, addr) = bind().await;

    let client = tokio::spawn(async move {
        let conn = TcpConnection::connect(&addr).await.expect("connect");
        conn.send_line("hello from client").await.expect("send");
        let reply = conn.recv_line().await.expect("recv");
        assert_eq!(reply.as_deref(), Some("hello from server"));
    });

    let server_conn = transport.accept().await.expect("accept");
    let line = server_conn.recv_line().await.expect("recv");
    assert_eq!(line.as_deref(), Some("hello from client"));
    server_conn
        .send_line("hello from server")
        .await
        .expect("send");

    client.await.expect("client task");
}

#[tokio::test]
async fn test_lines_arrive_in_order() {
    let (mut transport, addr) = bind().await;

    let client = tokio::spawn(async move {
        let conn = TcpConnection::connect(&addr).await.expect("connect");
        for i in 0..50 {
            conn.send_line(&format!("line-{i}")).await.expect("send");
        }
    });

    let server_conn = transport.accept().await.expect("accept");
    for i in 0..50 {
        let line = server_conn.recv_line().await.expect("recv");
        assert_eq!(line.as_deref(), Some(format!("line-{i}").as_str()));
    }

    client.await.expect("client task");
}

#[tokio::test]
async fn test_clean_close_reads_as_none() {
    let (mut transport, addr) = bind().await;

    let client = tokio::spawn(async move {
        let conn = TcpConnection::connect(&addr).await.expect("connect");
        conn.send_line("bye").await.expect("send");
        conn.close().await.expect("close");
    });

    let server_conn = transport.accept().await.expect("accept");
    assert_eq!(
        server_conn.recv_line().await.expect("recv").as_deref(),
        Some("bye")
    );
    // After the peer shuts down its write side, the next read is a
    // clean end-of-stream, not an error.
    assert!(server_conn.recv_line().await.expect("recv").is_none());

    client.await.expect("client task");
}

#[tokio::test]
async fn test_connection_ids_are_unique() {
    let (mut transport, addr) = bind().await;

    let a = TcpConnection::connect(&addr).await.expect("connect");
    let sa = transport.accept().await.expect("accept");
    let b = TcpConnection::connect(&addr).await.expect("connect");
    let sb = transport.accept().await.expect("accept");

    let mut ids = vec![a.id(), b.id(), sa.id(), sb.id()];
    ids.sort_by_key(|id| id.into_inner());
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_connect_refused() {
    // Bind then drop the listener so the port is (very likely) closed.
    let (transport, addr) = bind().await;
    drop(transport);

    let result = TcpConnection::connect(&addr).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_long_line_round_trip() {
    let (mut transport, addr) = bind().await;

    // Larger than any internal buffer default.
    let big = "x".repeat(256 * 1024);
    let sent = big.clone();

    let client = tokio::spawn(async move {
        let conn = TcpConnection::connect(&addr).await.expect("connect");
        conn.send_line(&sent).await.expect("send");
    });

    let server_conn = transport.accept().await.expect("accept");
    let line = server_conn.recv_line().await.expect("recv").expect("line");
    assert_eq!(line, big);

    client.await.expect("client task");
}
