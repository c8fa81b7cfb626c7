//! `ChatServer` builder and accept loop.
//!
//! This is the entry point for running a Chatwire server. It ties the
//! layers together: transport → protocol → router → collaborators, with
//! the session registry as the only state shared across connections.

use std::sync::Arc;

use chatwire_protocol::{JsonLineCodec, WireCodec};
use chatwire_services::{AuthService, FriendService, ProfileService};
use chatwire_session::SessionRegistry;
use chatwire_transport::{TcpTransport, Transport};

use crate::ChatwireError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry is internally synchronized; the collaborators are shared as
/// plain references and must synchronize themselves (their traits demand
/// `Send + Sync`).
pub(crate) struct ServerState<A, P, F, C>
where
    A: AuthService,
    P: ProfileService,
    F: FriendService,
    C: WireCodec,
{
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) auth: A,
    pub(crate) profiles: P,
    pub(crate) friends: F,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Chatwire server.
///
/// # Example
///
/// ```rust,ignore
/// let server = ChatServer::builder()
///     .bind("0.0.0.0:8888")
///     .build(auth, profiles, friends)
///     .await?;
/// server.run().await
/// ```
pub struct ChatServerBuilder {
    bind_addr: String,
}

impl ChatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8888".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Builds the server with the given collaborators.
    ///
    /// The registry is constructed here, once, and injected into every
    /// handler task; uses `JsonLineCodec` as the wire codec.
    pub async fn build<A, P, F>(
        self,
        auth: A,
        profiles: P,
        friends: F,
    ) -> Result<ChatServer<A, P, F, JsonLineCodec>, ChatwireError>
    where
        A: AuthService,
        P: ProfileService,
        F: FriendService,
    {
        let transport = TcpTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Arc::new(SessionRegistry::new()),
            auth,
            profiles,
            friends,
            codec: JsonLineCodec,
        });

        Ok(ChatServer { transport, state })
    }
}

impl Default for ChatServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Chatwire server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ChatServer<A, P, F, C>
where
    A: AuthService,
    P: ProfileService,
    F: FriendService,
    C: WireCodec,
{
    transport: TcpTransport,
    state: Arc<ServerState<A, P, F, C>>,
}

impl<A, P, F, C> ChatServer<A, P, F, C>
where
    A: AuthService,
    P: ProfileService,
    F: FriendService,
    C: WireCodec,
{
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The session registry, shared with every handler. Useful for
    /// presence queries from outside the connection loop.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections without bound and spawns one handler
    /// task per connection, so a slow collaborator call stalls only the
    /// connection it belongs to. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ChatwireError> {
        tracing::info!("Chatwire server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
