//! Wire protocol for Chatwire.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Types** ([`Envelope`], [`MessageType`], [`UserId`]) — the message
//!   structures that travel on the wire.
//! - **Codec** ([`WireCodec`] trait, [`JsonLineCodec`]) — how an envelope
//!   becomes one newline-delimited line of text and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong in between.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (lines of text) and the
//! connection layers (who said it, what to do with it). It knows nothing
//! about sockets, sessions, or services.
//!
//! ```text
//! Transport (lines) → Protocol (Envelope) → Handler/Router (semantics)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{JsonLineCodec, WireCodec};
pub use error::ProtocolError;
pub use types::{Envelope, EnvelopeBuilder, MessageType, UserId};
