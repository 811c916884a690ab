// # Connectivity Check Tool
//
// Runs the HTTP prober once against a real analytics server, the same way
// `POST /connections/test` does.
//
// ## Usage
//
// ```bash
// SONARLINK_ENDPOINT=https://sonar.example.com/api/ \
// SONARLINK_TOKEN=squ_your_token \
// cargo run -p sonarlink-demos --bin probe_check
//
// # Through a proxy
// SONARLINK_ENDPOINT=https://sonar.example.com/api/ \
// SONARLINK_TOKEN=squ_your_token \
// SONARLINK_PROXY=http://proxy.internal:3128 \
// cargo run -p sonarlink-demos --bin probe_check
// ```
//
// ## Environment Variables
//
// Required:
// - `SONARLINK_ENDPOINT`: API root of the server
// - `SONARLINK_TOKEN`: User token
//
// Optional:
// - `SONARLINK_PROXY`: Proxy URL
//
// Exit code is 0 when the server answered 200, 1 otherwise.

use sonarlink_core::{ConnectionService, Error, MemoryConnectionStore, TestConnectionRequest};
use sonarlink_probe_http::HttpProber;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let (Ok(endpoint), Ok(token)) = (env::var("SONARLINK_ENDPOINT"), env::var("SONARLINK_TOKEN"))
    else {
        tracing::error!("SONARLINK_ENDPOINT and SONARLINK_TOKEN environment variables are required");
        return ExitCode::FAILURE;
    };

    let mut request = TestConnectionRequest::new(endpoint, token);
    if let Ok(proxy) = env::var("SONARLINK_PROXY") {
        request = request.with_proxy(proxy);
    }

    // The store is never touched by a connectivity check
    let service = ConnectionService::new(
        Arc::new(MemoryConnectionStore::new()),
        Arc::new(HttpProber::new()),
    );

    match service.test_connection(request).await {
        Ok(()) => {
            tracing::info!("✓ Server answered 200, credentials are usable");
            ExitCode::SUCCESS
        }
        Err(Error::UnexpectedStatus { status }) => {
            tracing::error!("✗ Server answered {}", status);
            ExitCode::FAILURE
        }
        Err(e) if e.is_validation() => {
            tracing::error!("✗ Invalid parameters: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}
