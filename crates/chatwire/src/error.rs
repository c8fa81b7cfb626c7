//! Unified error type for the Chatwire server.

use chatwire_protocol::ProtocolError;
use chatwire_transport::TransportError;

/// Top-level error for building and running the server.
///
/// Collaborator failures never appear here: the router converts them into
/// error envelopes at the dispatch boundary. What's left is the plumbing
/// that can genuinely fail a connection or the listener. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ChatwireError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encoding a response failed).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
