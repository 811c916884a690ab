//! Minimal embedding example for sonarlink-core
//!
//! This example demonstrates using sonarlink-core as a library in a custom
//! application. The application supplies its own store and prober; nothing
//! global is involved.

use async_trait::async_trait;
use sonarlink_core::traits::{ConnectivityProber, ProbeTarget};
use sonarlink_core::{
    ConnectionPatch, ConnectionService, Error, MemoryConnectionStore, NewConnection, Result,
    TestConnectionRequest,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Custom prober for embedded usage
///
/// Pretends every endpoint on `sonar.example.com` is reachable and every other
/// host rejects the token.
struct EmbeddedProber {
    probe_calls: AtomicUsize,
}

impl EmbeddedProber {
    fn new() -> Self {
        Self {
            probe_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ConnectivityProber for EmbeddedProber {
    async fn probe(&self, target: &ProbeTarget) -> Result<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let url = target.version_url()?;
        println!("[Embedded] GET {}", url);

        match url.host_str() {
            Some("sonar.example.com") => Ok(()),
            _ => Err(Error::unexpected_status(401)),
        }
    }

    fn prober_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded sonarlink-core Example ===\n");

    // Create custom components
    let prober = Arc::new(EmbeddedProber::new());
    let service = ConnectionService::new(Arc::new(MemoryConnectionStore::new()), prober.clone());

    println!("1. Testing credentials before saving...");
    let request = TestConnectionRequest::new("https://sonar.example.com/api", "squ_demo");
    service.test_connection(request).await?;
    println!("   reachable\n");

    println!("2. Creating connections...");
    let prod = service
        .create(NewConnection::new(
            "sonar-prod",
            "https://sonar.example.com/api/",
            "squ_demo",
        ))
        .await?;
    let staging = service
        .create(
            NewConnection::new("sonar-staging", "https://staging.internal/api/", "squ_demo")
                .with_proxy("http://proxy.internal:3128"),
        )
        .await?;
    println!("   created #{} {} and #{} {}\n", prod.id, prod.name, staging.id, staging.name);

    println!("3. Duplicate names are rejected...");
    match service
        .create(NewConnection::new("sonar-prod", "https://other/api/", "squ_x"))
        .await
    {
        Err(Error::Conflict(name)) => println!("   conflict on {}\n", name),
        other => println!("   unexpected: {:?}\n", other),
    }

    println!("4. Patching staging: dropping the proxy...");
    let staging = service
        .patch(
            staging.id,
            ConnectionPatch {
                proxy: Some(String::new()),
                ..Default::default()
            },
        )
        .await?;
    println!("   proxy is now {:?}\n", staging.proxy);

    println!("5. Testing stored connections...");
    for connection in service.list().await? {
        match service.test_stored_connection(connection.id).await {
            Ok(()) => println!("   {}: ok", connection.name),
            Err(e) => println!("   {}: {}", connection.name, e),
        }
    }

    println!("\n6. Deleting staging...");
    service.delete(staging.id).await?;
    println!("   {} connection(s) left", service.list().await?.len());

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Store and prober are injected, no global state");
    println!("- Payloads are validated before they reach either collaborator");
    println!(
        "- {} probe(s) issued, none of them touched the store",
        prober.probe_calls.load(Ordering::SeqCst)
    );

    Ok(())
}
