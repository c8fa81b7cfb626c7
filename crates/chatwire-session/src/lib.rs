//! Session tracking for Chatwire.
//!
//! This crate answers one question: which authenticated user currently
//! owns which live connection? The [`SessionRegistry`] is the only state
//! shared across connection handlers, so it is internally synchronized;
//! everything else a handler touches is private to its own task.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server handler (above)  ← registers on login, unregisters on logout/drop
//!     ↕
//! Session layer (this crate)  ← user identity → live connection
//!     ↕
//! Protocol layer (below)  ← provides UserId
//! ```

mod registry;

pub use registry::{SessionHandle, SessionRegistry};
