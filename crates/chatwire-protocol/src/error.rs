//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding envelopes.
///
/// Decode failures are recoverable by design: a reader that hits one
/// answers the peer with an ERROR envelope and keeps the connection
/// open. Nothing here is fatal to a session.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed. Rare in practice: every payload value is
    /// already a JSON value by the time it reaches the codec.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The line is not a well-formed envelope: invalid JSON, or valid
    /// JSON of the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The line parsed, but its `type` tag is outside the known set.
    /// Kept separate from [`Malformed`](Self::Malformed) so dispatchers
    /// can say precisely what they rejected.
    #[error("unknown message type: {0}")]
    UnknownType(String),
}
