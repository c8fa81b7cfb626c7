//! # Chatwire
//!
//! The server side of a client-server chat application's messaging core:
//! a TCP accept loop, one handler task per connection running a
//! read-decode-dispatch-respond loop, a router mapping message types to
//! collaborator operations, and a registry of who is signed in where.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use chatwire::ChatServerBuilder;
//! use chatwire_services::InMemoryDirectory;
//!
//! # async fn run() -> Result<(), chatwire::ChatwireError> {
//! let directory = InMemoryDirectory::new();
//! let server = ChatServerBuilder::new()
//!     .bind("0.0.0.0:8888")
//!     .build(directory.clone(), directory.clone(), directory)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod router;
mod server;

pub use error::ChatwireError;
pub use server::{ChatServer, ChatServerBuilder};

// The types callers need alongside the server.
pub use chatwire_protocol::{
    Envelope, EnvelopeBuilder, JsonLineCodec, MessageType, ProtocolError,
    UserId, WireCodec,
};
pub use chatwire_session::{SessionHandle, SessionRegistry};
