//! Demo chat server over the in-memory directory.
//!
//! Seeds two verified accounts (alice/secret1, bob/secret2) so a client
//! can log in straight away. OTP codes for newly registered accounts are
//! visible at debug level (`RUST_LOG=debug`), standing in for email.

use chatwire::ChatServerBuilder;
use chatwire_services::InMemoryDirectory;
use tracing_subscriber::EnvFilter;

const BIND_ADDR: &str = "127.0.0.1:8888";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let directory = InMemoryDirectory::new();
    let alice = directory
        .seed_user("alice", "alice@example.com", "secret1", Some("Alice A."))
        .await;
    let bob = directory
        .seed_user("bob", "bob@example.com", "secret2", Some("Bob B."))
        .await;
    tracing::info!(%alice, %bob, "seeded demo accounts");

    let server = ChatServerBuilder::new()
        .bind(BIND_ADDR)
        .build(directory.clone(), directory.clone(), directory)
        .await?;

    server.run().await?;
    Ok(())
}
