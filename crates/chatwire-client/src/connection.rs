//! The client's one connection to the server.
//!
//! The protocol is strict request/response over a single socket: write
//! one line, read one line. Because only one line is ever read per call,
//! calls must never interleave, so [`ClientConnection::call`] holds an
//! exclusive lock for its whole duration. One shared connection reused
//! for every operation keeps the protocol simple at the cost of
//! serializing all traffic; that bottleneck is deliberate, not hidden.
//!
//! There is no request correlation id, which is why the server never
//! writes to this socket except in reply to a request: an unsolicited
//! line would be taken for the in-flight call's response.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;

use chatwire_protocol::{Envelope, JsonLineCodec, WireCodec};
use chatwire_transport::{Connection, TcpConnection, TransportError};

use crate::ClientError;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// A single long-lived connection offering blocking request/response.
///
/// # Example
///
/// ```rust,no_run
/// use chatwire_client::ClientConnection;
/// use chatwire_protocol::{Envelope, MessageType};
///
/// # async fn run() -> Result<(), chatwire_client::ClientError> {
/// let conn = ClientConnection::new();
/// conn.open("127.0.0.1", 8888).await?;
///
/// let request = Envelope::builder(MessageType::LoginRequest)
///     .put("username", "alice")
///     .put("password", "secret1")
///     .build();
/// let response = conn.call(&request).await?;
/// assert!(response.is_success());
///
/// conn.close().await;
/// # Ok(())
/// # }
/// ```
pub struct ClientConnection {
    codec: JsonLineCodec,
    connect_timeout: Duration,
    call_timeout: Duration,
    /// `None` while disconnected. The mutex doubles as the pending-call
    /// lock: whoever holds it owns the socket until their response line
    /// is read.
    inner: Mutex<Option<TcpConnection>>,
}

impl ClientConnection {
    /// Creates a disconnected client with default timeouts
    /// (10 s to connect, 30 s per call).
    pub fn new() -> Self {
        Self {
            codec: JsonLineCodec,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            inner: Mutex::new(None),
        }
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the per-call response timeout. The wait is bounded so a
    /// hung server cannot wedge the caller forever.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Establishes the TCP connection. Send-coalescing delay is disabled
    /// by the transport so small request lines go out immediately.
    ///
    /// Reopening an already-open connection drops the old socket.
    ///
    /// # Errors
    /// [`ClientError::Connect`] on refusal, unreachability, or timeout.
    pub async fn open(&self, host: &str, port: u16) -> Result<(), ClientError> {
        let addr = format!("{host}:{port}");
        let conn = match timeout(
            self.connect_timeout,
            TcpConnection::connect(&addr),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(ClientError::Connect(e)),
            Err(_) => {
                return Err(ClientError::Connect(
                    TransportError::ConnectFailed(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "connect timed out",
                    )),
                ));
            }
        };

        tracing::info!(%addr, "connected to server");
        let mut guard = self.inner.lock().await;
        if let Some(old) = guard.take() {
            let _ = old.close().await;
        }
        *guard = Some(conn);
        Ok(())
    }

    /// Sends `request` and waits for the next line as its response.
    ///
    /// The pending-call lock is held from before the request is written
    /// until after the response is read, so two logical operations can
    /// never interleave their lines on the socket. On timeout the lock is
    /// released normally (RAII); the connection is kept, matching the
    /// socket-read-timeout behavior callers expect.
    ///
    /// # Errors
    /// - [`ClientError::NotConnected`] before `open` or after `close`
    /// - [`ClientError::Closed`] if the server ends the stream mid-call
    /// - [`ClientError::Timeout`] if no response arrives in time
    pub async fn call(&self, request: &Envelope) -> Result<Envelope, ClientError> {
        let mut guard = self.inner.lock().await;
        let conn = guard.as_ref().ok_or(ClientError::NotConnected)?;

        let line = self.codec.encode(request)?;
        tracing::debug!(kind = %request.kind(), "sending request");
        let sent = conn.send_line(&line).await;
        if let Err(e) = sent {
            // A write failure means the socket is dead; forget it so the
            // next call reports NotConnected instead of failing the same
            // way again.
            *guard = None;
            return Err(e.into());
        }

        let received = timeout(self.call_timeout, conn.recv_line()).await;
        match received {
            Err(_elapsed) => Err(ClientError::Timeout),
            Ok(Err(e)) => {
                *guard = None;
                Err(e.into())
            }
            Ok(Ok(None)) => {
                *guard = None;
                Err(ClientError::Closed)
            }
            Ok(Ok(Some(line))) => {
                let response = self.codec.decode(&line)?;
                tracing::debug!(kind = %response.kind(), "received response");
                Ok(response)
            }
        }
    }

    /// Best-effort shutdown of the socket. Idempotent; never fails.
    pub async fn close(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(conn) = guard.take() {
            let _ = conn.close().await;
            tracing::info!("connection closed");
        }
    }

    /// Whether `open` has succeeded and no terminal error or `close`
    /// has happened since.
    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}

impl Default for ClientConnection {
    fn default() -> Self {
        Self::new()
    }
}
