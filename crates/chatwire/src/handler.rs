//! Per-connection handler: the read-decode-dispatch-respond loop.
//!
//! Each accepted connection gets its own Tokio task running this loop:
//!
//! ```text
//! ACCEPTED → (read line ⇄ dispatch + respond) → CLOSED
//! ```
//!
//! Exactly one response is written per accepted request, in order; the
//! client's blocking `call` depends on that contract. A line that fails
//! to decode is answered with an ERROR envelope and the loop continues;
//! only end-of-stream or an I/O failure closes the connection.
//!
//! The handler owns the identity binding: a successful LOGIN response
//! registers this connection in the session registry, LOGOUT or any exit
//! path unregisters it.

use std::sync::Arc;

use chatwire_protocol::{Envelope, MessageType, UserId, WireCodec};
use chatwire_services::{AuthService, FriendService, ProfileService};
use chatwire_session::{SessionHandle, SessionRegistry};
use chatwire_transport::{Connection, TcpConnection};

use crate::ChatwireError;
use crate::router;
use crate::server::ServerState;

/// Tracks which identity this connection has bound, and unregisters it
/// when the handler exits, whatever the exit path. `Drop` makes the
/// cleanup fire on errors and panics too, not just the happy path.
struct RegistryGuard {
    registry: Arc<SessionRegistry>,
    user_id: Option<UserId>,
}

impl RegistryGuard {
    fn bind(&mut self, user_id: UserId, handle: SessionHandle) {
        self.registry.register(user_id, handle);
        self.user_id = Some(user_id);
    }

    /// Unbinds unconditionally: even if another login has displaced this
    /// connection's entry in the meantime, the identity is removed.
    fn unbind(&mut self) {
        if let Some(user_id) = self.user_id.take() {
            self.registry.unregister(user_id);
        }
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.unbind();
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, P, F, C>(
    conn: TcpConnection,
    state: Arc<ServerState<A, P, F, C>>,
) -> Result<(), ChatwireError>
where
    A: AuthService,
    P: ProfileService,
    F: FriendService,
    C: WireCodec,
{
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    tracing::info!(%conn_id, %peer, "client connected");

    let mut guard = RegistryGuard {
        registry: Arc::clone(&state.registry),
        user_id: None,
    };

    loop {
        let line = match conn.recv_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(%conn_id, %peer, "client disconnected");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "receive error");
                break;
            }
        };

        let request = match state.codec.decode(&line) {
            Ok(request) => request,
            Err(e) => {
                // One malformed request must not tear down an otherwise
                // healthy session; answer and keep reading.
                tracing::debug!(%conn_id, error = %e, "undecodable request");
                let response = Envelope::builder(MessageType::Error)
                    .error(e.to_string())
                    .build();
                send_response(&conn, &state.codec, &response).await?;
                continue;
            }
        };

        tracing::debug!(%conn_id, kind = %request.kind(), "request");
        let response = router::dispatch(&state, &request).await;

        match request.kind() {
            // The login handler puts the authenticated identity into the
            // response payload; a success binds it to this connection,
            // displacing any previous connection's binding.
            MessageType::LoginRequest if response.is_success() => {
                if let Some(user_id) = response.get_user_id("userId") {
                    guard.bind(user_id, SessionHandle::new(conn_id));
                }
            }
            // Logout unbinds whether or not the collaborator call
            // succeeded; the connection itself stays open.
            MessageType::LogoutRequest => {
                guard.unbind();
            }
            _ => {}
        }

        send_response(&conn, &state.codec, &response).await?;
    }

    // `guard` drops here and unregisters any bound identity.
    Ok(())
}

/// Encodes and writes one response line. A write failure is fatal to the
/// connection and surfaces as the loop's error.
async fn send_response<C: WireCodec>(
    conn: &TcpConnection,
    codec: &C,
    response: &Envelope,
) -> Result<(), ChatwireError> {
    let line = codec.encode(response)?;
    conn.send_line(&line).await?;
    Ok(())
}
