// # sonarlinkd - Connection Service Daemon
//
// This daemon is a THIN HTTP shell over sonarlink-core:
// - DO NOT add validation, storage or probe logic here
// - All connection logic lives in sonarlink-core
// - Configuration is via environment variables ONLY
//
// The sonarlinkd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime
// 3. Opening the connection store and wiring the HTTP prober
// 4. Serving the `/connections` API until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Server
// - `SONARLINK_BIND_ADDR`: Listen address (default `127.0.0.1:8080`)
//
// ### Connection Store
// - `SONARLINK_STORE_TYPE`: Type of store (file, memory; default file)
// - `SONARLINK_STORE_PATH`: Path to store file (for file store)
//
// ### Logging
// - `SONARLINK_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export SONARLINK_BIND_ADDR=0.0.0.0:8080
// export SONARLINK_STORE_TYPE=file
// export SONARLINK_STORE_PATH=/var/lib/sonarlink/connections.json
//
// sonarlinkd
// ```

mod api;

use anyhow::Result;
use sonarlink_core::{ConnectionService, ServerConfig, SonarlinkConfig, StoreConfig};
use sonarlink_probe_http::HttpProber;
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default listen address
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SonarlinkExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SonarlinkExitCode> for ExitCode {
    fn from(code: SonarlinkExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
struct Config {
    bind_addr: String,
    store_type: String,
    store_path: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind_addr: lookup("SONARLINK_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            store_type: lookup("SONARLINK_STORE_TYPE").unwrap_or_else(|| "file".to_string()),
            store_path: lookup("SONARLINK_STORE_PATH"),
            log_level: lookup("SONARLINK_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Validate the configuration
    ///
    /// This checks:
    /// - The listen address parses
    /// - The store type is known and a file store has a usable path
    /// - The log level is valid
    fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "SONARLINK_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        if self.store_type == "file" {
            match self.store_path.as_deref() {
                None => anyhow::bail!(
                    "SONARLINK_STORE_PATH is required when SONARLINK_STORE_TYPE=file. \
                    Set it via: export SONARLINK_STORE_PATH=/var/lib/sonarlink/connections.json"
                ),
                Some(path) if path.trim().is_empty() => anyhow::bail!(
                    "SONARLINK_STORE_PATH cannot be empty when SONARLINK_STORE_TYPE=file"
                ),
                Some(path) => {
                    if let Some(parent) = std::path::Path::new(path).parent()
                        && !parent.as_os_str().is_empty()
                        && !parent.exists()
                    {
                        anyhow::bail!(
                            "SONARLINK_STORE_PATH parent directory does not exist: {}. \
                            Create it first: sudo mkdir -p {}",
                            parent.display(),
                            parent.display()
                        );
                    }
                }
            }
        }

        self.level()?;
        Ok(())
    }

    /// Parsed listen address
    fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|e| {
            anyhow::anyhow!(
                "SONARLINK_BIND_ADDR '{}' is not a valid socket address: {}",
                self.bind_addr,
                e
            )
        })
    }

    /// Parsed log level
    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "SONARLINK_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Store configuration understood by sonarlink-core
    fn store_config(&self) -> StoreConfig {
        match (self.store_type.as_str(), &self.store_path) {
            ("file", Some(path)) => StoreConfig::File { path: path.clone() },
            _ => StoreConfig::Memory,
        }
    }

    /// Library configuration for a validated daemon configuration
    fn to_sonarlink_config(&self) -> Result<SonarlinkConfig> {
        let config = SonarlinkConfig {
            store: self.store_config(),
            server: ServerConfig {
                bind_addr: self.socket_addr()?,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SonarlinkExitCode::ConfigError.into();
    }

    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SonarlinkExitCode::ConfigError.into();
    }

    info!("Starting sonarlinkd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SonarlinkExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => SonarlinkExitCode::CleanShutdown,
            Err(DaemonError::Startup(e)) => {
                error!("Startup error: {:#}", e);
                SonarlinkExitCode::ConfigError
            }
            Err(DaemonError::Runtime(e)) => {
                error!("Daemon error: {:#}", e);
                SonarlinkExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Failure phase of the daemon, mapped onto exit codes
enum DaemonError {
    /// Store could not be opened or the listener could not be bound
    Startup(anyhow::Error),
    /// Serving or shutting down failed
    Runtime(anyhow::Error),
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<(), DaemonError> {
    let config = config.to_sonarlink_config().map_err(DaemonError::Startup)?;
    let addr = config.server.bind_addr;

    let store = sonarlink_core::store::open(&config.store)
        .await
        .map_err(|e| DaemonError::Startup(e.into()))?;
    let service = ConnectionService::new(store.clone(), Arc::new(HttpProber::new()));

    let shutdown = shutdown_signal().map_err(DaemonError::Startup)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DaemonError::Startup(anyhow::anyhow!("Failed to bind {}: {}", addr, e)))?;

    info!("Connection store type: {}", config.store.type_name());
    info!("Listening on {}", addr);

    let served = axum::serve(listener, api::router(service))
        .with_graceful_shutdown(async move {
            let signal = shutdown.await;
            info!("Received shutdown signal: {}", signal);
            info!("Shutting down daemon");
        })
        .await;

    // Flush even if serving failed, so acknowledged writes are not lost
    if let Err(e) = store.flush().await {
        warn!("Failed to flush connection store: {}", e);
        return Err(DaemonError::Runtime(e.into()));
    }

    served.map_err(|e| DaemonError::Runtime(anyhow::anyhow!("Server error: {}", e)))?;
    Ok(())
}

/// Install handlers for shutdown signals (SIGTERM, SIGINT)
///
/// Handlers are registered before the server starts accepting requests. The
/// returned future resolves with the name of the signal received.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Install a handler for SIGINT
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_require_store_path() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.store_type, "file");

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SONARLINK_STORE_PATH is required"));
    }

    #[test]
    fn test_memory_store_needs_no_path() {
        let config = config_from(&[("SONARLINK_STORE_TYPE", "memory")]);
        config.validate().unwrap();

        let config = config.to_sonarlink_config().unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.server.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_file_store_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connections.json");
        let path = path.to_str().unwrap();

        let config = config_from(&[("SONARLINK_STORE_PATH", path)]);
        config.validate().unwrap();
        assert_eq!(
            config.store_config(),
            StoreConfig::File {
                path: path.to_string()
            }
        );
    }

    #[test]
    fn test_rejects_unknown_store_type() {
        let config = config_from(&[("SONARLINK_STORE_TYPE", "postgres")]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn test_rejects_bad_bind_addr() {
        let config = config_from(&[
            ("SONARLINK_STORE_TYPE", "memory"),
            ("SONARLINK_BIND_ADDR", "localhost"),
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let config = config_from(&[
            ("SONARLINK_STORE_TYPE", "memory"),
            ("SONARLINK_LOG_LEVEL", "DEBUG"),
        ]);
        assert_eq!(config.level().unwrap(), Level::DEBUG);

        let config = config_from(&[
            ("SONARLINK_STORE_TYPE", "memory"),
            ("SONARLINK_LOG_LEVEL", "loud"),
        ]);
        assert!(config.validate().is_err());
    }
}
