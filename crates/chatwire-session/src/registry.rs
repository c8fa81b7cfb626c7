//! The session registry: tracks which user owns which live connection.
//!
//! One entry per authenticated user, created on successful login and
//! removed on logout or disconnect. There is no heartbeat; presence is
//! exactly "this user's connection has not failed a read yet".

use std::time::Instant;

use dashmap::DashMap;

use chatwire_protocol::UserId;
use chatwire_transport::ConnectionId;

/// What the registry knows about one signed-in connection.
///
/// A handle identifies the connection currently representing a user; it
/// does not carry a way to write to that connection. The protocol has no
/// request correlation, so an unsolicited server line would be misread by
/// the client as the response to whatever call is in flight. Until the
/// protocol grows correlation ids (or a second event channel), the
/// registry is presence-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    /// The connection currently bound to this user.
    pub conn_id: ConnectionId,
    /// When the binding was created.
    pub since: Instant,
}

impl SessionHandle {
    /// Creates a handle for the given connection, stamped now.
    pub fn new(conn_id: ConnectionId) -> Self {
        Self {
            conn_id,
            since: Instant::now(),
        }
    }
}

/// Concurrent directory from user identity to live connection.
///
/// Internally synchronized: many connection handlers register and
/// unregister simultaneously without any outer lock, and operations on a
/// single identity are atomic. Construct one registry at process start
/// and hand it to every component that needs it; nothing here is a
/// lazily-initialized global.
///
/// The map is replace-on-write: a second successful login for the same
/// identity overwrites the first entry. The displaced connection's socket
/// stays open and is not told; when it eventually disconnects or logs
/// out, the identity is unbound unconditionally.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<UserId, SessionHandle>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `user_id` to `handle`, replacing any existing binding.
    ///
    /// Returns the displaced handle if there was one, so callers can log
    /// (or someday notify) the connection that just lost its binding.
    pub fn register(
        &self,
        user_id: UserId,
        handle: SessionHandle,
    ) -> Option<SessionHandle> {
        let displaced = self.sessions.insert(user_id, handle);
        match displaced {
            Some(old) => tracing::info!(
                %user_id,
                old_conn = %old.conn_id,
                new_conn = %handle.conn_id,
                "session replaced by newer login"
            ),
            None => {
                tracing::info!(%user_id, conn = %handle.conn_id, "session registered")
            }
        }
        displaced
    }

    /// Removes the binding for `user_id`, returning it if present.
    pub fn unregister(&self, user_id: UserId) -> Option<SessionHandle> {
        let removed = self.sessions.remove(&user_id).map(|(_, h)| h);
        if removed.is_some() {
            tracing::info!(%user_id, "session unregistered");
        }
        removed
    }

    /// Looks up the connection currently representing `user_id`.
    pub fn lookup(&self, user_id: UserId) -> Option<SessionHandle> {
        self.sessions.get(&user_id).map(|entry| *entry.value())
    }

    /// Whether `user_id` currently has a live connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.sessions.contains_key(&user_id)
    }

    /// Number of signed-in users. Each identity counts once no matter
    /// how many times it re-registered.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
