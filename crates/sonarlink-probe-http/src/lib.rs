// # HTTP Connectivity Prober
//
// This crate provides the reqwest-based connectivity prober for sonarlink.
//
// ## Purpose
//
// Answers one question: can these credentials reach the analytics server?
// The prober issues a single `GET <endpoint>/server/version` and classifies
// the outcome. The response body is never read.
//
// ## Per-call clients
//
// Endpoint, token, proxy and timeout all vary per call, so a fresh
// `reqwest::Client` is built for every probe. Nothing credential-related is
// kept between calls.
//
// ## Security
//
// - The `Authorization` header value is marked sensitive
// - Tokens are never logged (only the endpoint is)
// - Without an explicit proxy, environment proxy settings are ignored

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use sonarlink_core::traits::{ConnectivityProber, ProbeTarget};
use sonarlink_core::{Error, Result};

/// Prober name reported in logs
const PROBER_NAME: &str = "http";

/// reqwest-based connectivity prober
///
/// # Example
///
/// ```rust,no_run
/// use sonarlink_core::{ConnectivityProber, ProbeTarget, TestConnectionRequest};
/// use sonarlink_probe_http::HttpProber;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let request = TestConnectionRequest::new("http://localhost:9000/api/", "squ_1");
///     let target = ProbeTarget::from_request(&request)?;
///
///     HttpProber::new().probe(&target).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct HttpProber {
    _private: (),
}

impl HttpProber {
    /// Create a new HTTP prober
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the client for one probe
    ///
    /// # Parameters
    ///
    /// - `target`: Supplies the credential header, proxy and call timeout
    ///
    /// # Returns
    ///
    /// - `Ok(Client)`: A client scoped to this call
    /// - `Err(Error::Malformed)`: The token cannot be sent as a header value
    /// - `Err(Error::Connectivity)`: The proxy or TLS backend could not be set up
    fn build_client(&self, target: &ProbeTarget) -> Result<reqwest::Client> {
        let mut auth = HeaderValue::from_str(&target.authorization())
            .map_err(|_| Error::malformed("token cannot be used as a header value"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(target.timeout());

        builder = match target.proxy() {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy.as_str())
                    .map_err(|e| Error::connectivity(format!("Invalid proxy: {}", e)))?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|e| Error::connectivity(format!("Failed to build HTTP client: {}", e)))
    }
}

#[async_trait]
impl ConnectivityProber for HttpProber {
    async fn probe(&self, target: &ProbeTarget) -> Result<()> {
        let url = target.version_url()?;
        let client = self.build_client(target)?;

        tracing::debug!(
            "Probing {} (proxy: {}, timeout: {:?})",
            url,
            target.proxy().is_some(),
            target.timeout()
        );

        let response = client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::connectivity(format!(
                    "Request to {} timed out after {:?}",
                    url,
                    target.timeout()
                ))
            } else {
                Error::connectivity(format!("Request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!("Probe of {} answered {}", url, status);
            return Err(Error::unexpected_status(status.as_u16()));
        }

        tracing::debug!("Probe of {} answered 200", url);
        Ok(())
    }

    fn prober_name(&self) -> &'static str {
        PROBER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap as RequestHeaders, StatusCode as UpstreamStatus, Uri};
    use axum::routing::get;
    use sonarlink_core::TestConnectionRequest;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    /// Serve `router` on an ephemeral local port
    async fn spawn_upstream(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn target(endpoint: &str, token: &str) -> ProbeTarget {
        ProbeTarget::from_request(&TestConnectionRequest::new(endpoint, token)).unwrap()
    }

    /// Upstream that only accepts the `"<token>:"` credential
    fn version_router(expected_auth: &'static str) -> Router {
        Router::new().route(
            "/api/server/version",
            get(move |headers: RequestHeaders| async move {
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some(value) if value == expected_auth => (UpstreamStatus::OK, "10.4.1"),
                    _ => (UpstreamStatus::UNAUTHORIZED, ""),
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_probe_succeeds_on_200_with_token_header() {
        let addr = spawn_upstream(version_router("squ_good:")).await;

        let result = HttpProber::new()
            .probe(&target(&format!("http://{}/api/", addr), "squ_good"))
            .await;
        assert!(result.is_ok(), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_probe_reports_unexpected_status() {
        let addr = spawn_upstream(version_router("squ_good:")).await;

        let err = HttpProber::new()
            .probe(&target(&format!("http://{}/api/", addr), "squ_wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus { status: 401 }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_probe_reports_missing_version_endpoint() {
        let addr = spawn_upstream(version_router("squ_good:")).await;

        // Wrong API root: server/version resolves outside /api/
        let err = HttpProber::new()
            .probe(&target(&format!("http://{}/", addr), "squ_good"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus { status: 404 }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_probe_refused_is_connectivity_error() {
        // Reserve a port, then close it so nothing listens there
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpProber::new()
            .probe(&target(&format!("http://{}/api/", addr), "squ_good"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connectivity(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_probe_hanging_upstream_times_out() {
        let router = Router::new().route(
            "/api/server/version",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late"
            }),
        );
        let addr = spawn_upstream(router).await;

        let started = Instant::now();
        let err = HttpProber::new()
            .probe(&target(&format!("http://{}/api/", addr), "squ_good"))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, Error::Connectivity(_)), "got {:?}", err);
        assert!(elapsed >= Duration::from_millis(2500), "gave up too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(6), "took too long: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_probe_honours_shorter_timeout() {
        let router = Router::new().route(
            "/api/server/version",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late"
            }),
        );
        let addr = spawn_upstream(router).await;

        let target = target(&format!("http://{}/api/", addr), "squ_good")
            .with_timeout(Duration::from_millis(200));
        let err = HttpProber::new().probe(&target).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "got {}", err);
    }

    #[tokio::test]
    async fn test_probe_routes_through_proxy() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();

        // A forward proxy receives the absolute target URI
        let proxy = Router::new().fallback(move |uri: Uri, headers: RequestHeaders| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(uri.to_string());
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some("squ_good:") => UpstreamStatus::OK,
                    _ => UpstreamStatus::UNAUTHORIZED,
                }
            }
        });
        let proxy_addr = spawn_upstream(proxy).await;

        let request = TestConnectionRequest::new("http://sonar.internal:9000/api/", "squ_good")
            .with_proxy(format!("http://{}", proxy_addr));
        let target = ProbeTarget::from_request(&request).unwrap();

        HttpProber::new().probe(&target).await.unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ends_with("/api/server/version"), "got {}", seen[0]);
    }

    #[tokio::test]
    async fn test_probe_unreachable_proxy_is_connectivity_error() {
        let upstream = spawn_upstream(version_router("squ_good:")).await;

        // Proxy port with nothing listening behind it
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = listener.local_addr().unwrap();
        drop(listener);

        let request = TestConnectionRequest::new(format!("http://{}/api/", upstream), "squ_good")
            .with_proxy(format!("http://{}", proxy_addr));
        let target = ProbeTarget::from_request(&request).unwrap();

        let err = HttpProber::new().probe(&target).await.unwrap_err();
        assert!(matches!(err, Error::Connectivity(_)), "got {:?}", err);
    }

    #[test]
    fn test_prober_name() {
        assert_eq!(HttpProber::new().prober_name(), "http");
    }
}
