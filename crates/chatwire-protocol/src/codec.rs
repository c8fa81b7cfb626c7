//! Codec trait and the JSON line codec.
//!
//! The transport is line-oriented: one envelope per newline-delimited
//! line of text, no length prefix. The codec converts between an
//! [`Envelope`] and that single line. It is a trait so the connection
//! layers stay independent of the concrete serialization; today there is
//! one implementation, [`JsonLineCodec`].

use serde_json::Value;

use crate::{Envelope, MessageType, ProtocolError};

/// Converts envelopes to and from single lines of text.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task on the server.
pub trait WireCodec: Send + Sync + 'static {
    /// Serializes an envelope into one line of text.
    ///
    /// The returned string carries no trailing newline; the transport
    /// owns the delimiter. It must also contain no embedded newline,
    /// otherwise the peer would read a torn frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode(&self, envelope: &Envelope) -> Result<String, ProtocolError>;

    /// Parses one line of text back into an envelope.
    ///
    /// # Errors
    /// - [`ProtocolError::Malformed`] if the line is not a well-formed
    ///   envelope.
    /// - [`ProtocolError::UnknownType`] if the `type` tag is outside the
    ///   known set. Unknown types must not crash the reader; they surface
    ///   here so the caller can answer with an ERROR envelope instead of
    ///   dropping the connection.
    fn decode(&self, line: &str) -> Result<Envelope, ProtocolError>;
}

/// A [`WireCodec`] producing compact JSON.
///
/// Compact `serde_json` output never contains a raw newline (newlines
/// inside string values are escaped as `\n`), which is exactly the
/// framing guarantee the line transport needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLineCodec;

impl WireCodec for JsonLineCodec {
    fn encode(&self, envelope: &Envelope) -> Result<String, ProtocolError> {
        serde_json::to_string(envelope).map_err(ProtocolError::Encode)
    }

    fn decode(&self, line: &str) -> Result<Envelope, ProtocolError> {
        // Parse to a generic value first so an unrecognized tag can be
        // told apart from garbage input.
        let value: Value =
            serde_json::from_str(line).map_err(ProtocolError::Malformed)?;

        if let Some(tag) = value.get("type").and_then(Value::as_str) {
            let known: Result<MessageType, _> =
                serde_json::from_value(Value::String(tag.to_owned()));
            if known.is_err() {
                return Err(ProtocolError::UnknownType(tag.to_owned()));
            }
        }

        serde_json::from_value(value).map_err(ProtocolError::Malformed)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_everything() {
        let codec = JsonLineCodec;
        let env = Envelope::builder(MessageType::LoginResponse)
            .put("userId", 42)
            .put("username", "alice")
            .put("fullName", "Alice A.")
            .build();

        let line = codec.encode(&env).unwrap();
        let back = codec.decode(&line).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn test_round_trip_preserves_failure_outcome() {
        let codec = JsonLineCodec;
        let env = Envelope::builder(MessageType::AddFriendResponse)
            .error("Friend request already sent")
            .build();

        let back = codec.decode(&codec.encode(&env).unwrap()).unwrap();
        assert!(!back.is_success());
        assert_eq!(back.error(), Some("Friend request already sent"));
    }

    #[test]
    fn test_encoded_line_has_no_newline() {
        let codec = JsonLineCodec;
        let env = Envelope::builder(MessageType::StatusUpdate)
            .put("status", "away\nfor lunch") // newline inside a value
            .build();

        let line = codec.encode(&env).unwrap();
        assert!(!line.contains('\n'));

        // And the escaped newline survives the trip back.
        let back = codec.decode(&line).unwrap();
        assert_eq!(back.get_str("status"), Some("away\nfor lunch"));
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let codec = JsonLineCodec;
        let err = codec.decode("not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_wrong_shape_is_malformed() {
        let codec = JsonLineCodec;
        // Valid JSON, but no envelope fields.
        let err = codec.decode(r#"{"name": "hello"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_unknown_type_is_reported_as_such() {
        let codec = JsonLineCodec;
        let err = codec
            .decode(r#"{"type": "TELEPORT_REQUEST", "data": {}}"#)
            .unwrap_err();
        match err {
            ProtocolError::UnknownType(tag) => {
                assert_eq!(tag, "TELEPORT_REQUEST");
            }
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_non_string_type_is_malformed() {
        let codec = JsonLineCodec;
        let err = codec.decode(r#"{"type": 7, "data": {}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_normalizes_outcome_invariant() {
        let codec = JsonLineCodec;
        let env = codec
            .decode(
                r#"{"type": "ERROR", "success": true, "error": "boom"}"#,
            )
            .unwrap();
        assert!(!env.is_success());
    }
}
