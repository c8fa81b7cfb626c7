//! Collaborator contracts for Chatwire's dispatch layer.
//!
//! The messaging core doesn't implement accounts, profiles, or the friend
//! graph; it dispatches to collaborators that do. This crate defines those
//! seams as traits ([`AuthService`], [`ProfileService`], [`FriendService`])
//! so the server can run against a SQL directory in production, and against
//! [`InMemoryDirectory`] in the demo and the test suites, without the
//! connection layer changing.
//!
//! Every operation returns `Result<_, ServiceError>`; the dispatch router
//! converts failures into error envelopes, so a collaborator error never
//! takes a connection down.

mod error;
mod memory;
mod traits;
mod types;

pub use error::ServiceError;
pub use memory::InMemoryDirectory;
pub use traits::{AuthService, FriendService, ProfileService};
pub use types::{Availability, NewUser, ProfileUpdate, UserProfile};
