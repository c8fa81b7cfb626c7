//! Error types for the client connection.

use chatwire_protocol::ProtocolError;
use chatwire_transport::TransportError;

/// Errors surfaced by [`ClientConnection`](crate::ClientConnection).
///
/// Everything here is fatal to the one call that hit it; `Closed` and the
/// transport variants also mean the connection itself is gone and must be
/// reopened.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Establishing the TCP connection failed (refused, unreachable, or
    /// timed out).
    #[error("connect failed: {0}")]
    Connect(#[source] TransportError),

    /// `call` was invoked before `open`, or after `close`.
    #[error("not connected")]
    NotConnected,

    /// The server closed the stream mid-call.
    #[error("connection closed by server")]
    Closed,

    /// The bounded wait for a response line elapsed.
    #[error("timed out waiting for response")]
    Timeout,

    /// Encoding the request or decoding the response failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading or writing the socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
