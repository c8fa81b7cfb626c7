//! Client-side connection for Chatwire.
//!
//! One [`ClientConnection`] per process, reused for every operation: the
//! UI layer calls [`ClientConnection::call`] and gets the matching
//! response back, with all socket plumbing hidden. Construct it once at
//! startup and hand references to whatever needs it; it is not a global.

mod connection;
mod error;

pub use connection::ClientConnection;
pub use error::ClientError;
