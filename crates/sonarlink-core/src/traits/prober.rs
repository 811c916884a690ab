// # Connectivity Prober Trait
//
// Defines the interface for checking that a credential set can reach the
// analytics server.
//
// ## Contract
//
// A probe is a single GET against `<endpoint>/server/version`, authenticated
// with the token, optionally routed through a proxy, bounded by a 3 second
// timeout. It classifies the outcome:
//
// - transport failure (timeout, DNS, proxy, refused) → `Error::Connectivity`
// - any status other than 200 → `Error::UnexpectedStatus { status }`
// - 200 → success, the body is not interpreted
//
// Probes never retry and never touch the connection store. Dropping the
// returned future aborts the in-flight request.
//
// ## Implementations
//
// - HTTP: `sonarlink-probe-http` crate

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::model::TestConnectionRequest;

/// Version endpoint, relative to the connection endpoint
pub const VERSION_PATH: &str = "server/version";

/// Call-level timeout for a probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Everything a prober needs for one call
///
/// Built per call from a validated [`TestConnectionRequest`]; probers hold no
/// per-credential state.
#[derive(Clone)]
pub struct ProbeTarget {
    endpoint: Url,
    token: String,
    proxy: Option<Url>,
    timeout: Duration,
}

impl ProbeTarget {
    /// Build a probe target from a validated request
    ///
    /// The endpoint is treated as a directory: a missing trailing slash is
    /// added so that [`VERSION_PATH`] resolves beneath it.
    pub fn from_request(request: &TestConnectionRequest) -> Result<Self> {
        let mut endpoint = Url::parse(&request.endpoint)
            .map_err(|e| Error::malformed(format!("endpoint: {}", e)))?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let proxy = match request.proxy.as_deref() {
            None | Some("") => None,
            Some(proxy) => Some(
                Url::parse(proxy).map_err(|e| Error::malformed(format!("proxy: {}", e)))?,
            ),
        };

        Ok(Self {
            endpoint,
            token: request.token.clone(),
            proxy,
            timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }

    /// Override the call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Normalised endpoint (always ends with `/`)
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Full URL of the version endpoint
    pub fn version_url(&self) -> Result<Url> {
        self.endpoint
            .join(VERSION_PATH)
            .map_err(|e| Error::malformed(format!("endpoint: {}", e)))
    }

    /// Value of the `Authorization` header: the token as a user name with an
    /// empty password, i.e. `"<token>:"`
    pub fn authorization(&self) -> String {
        format!("{}:", self.token)
    }

    /// Proxy to route through, if any
    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }

    /// Call-level timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// Custom Debug implementation that hides the token
impl fmt::Debug for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeTarget")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"<REDACTED>")
            .field("proxy", &self.proxy.as_ref().map(Url::as_str))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Trait for connectivity prober implementations
///
/// # Trust Level: Untrusted
///
/// Probers talk to user-supplied endpoints. They must:
/// - make exactly one request per call, with no retry
/// - never log the token
/// - never spawn background work that outlives the call
/// - never read or write the connection store
#[async_trait]
pub trait ConnectivityProber: Send + Sync {
    /// Check that `target` answers `server/version` with 200
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The server answered 200
    /// - `Err(Error::Connectivity)`: The server could not be reached
    /// - `Err(Error::UnexpectedStatus)`: The server answered with another status
    async fn probe(&self, target: &ProbeTarget) -> Result<()>;

    /// Get the prober name (for logging/debugging)
    fn prober_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_url_appends_to_api_root() {
        let request = TestConnectionRequest::new("http://sonar.local:9000/api/", "t");
        let target = ProbeTarget::from_request(&request).unwrap();
        assert_eq!(
            target.version_url().unwrap().as_str(),
            "http://sonar.local:9000/api/server/version"
        );
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let request = TestConnectionRequest::new("http://sonar.local:9000/api", "t");
        let target = ProbeTarget::from_request(&request).unwrap();
        assert_eq!(target.endpoint().as_str(), "http://sonar.local:9000/api/");
        assert_eq!(
            target.version_url().unwrap().as_str(),
            "http://sonar.local:9000/api/server/version"
        );

        let request = TestConnectionRequest::new("https://sonar.local", "t");
        let target = ProbeTarget::from_request(&request).unwrap();
        assert_eq!(
            target.version_url().unwrap().as_str(),
            "https://sonar.local/server/version"
        );
    }

    #[test]
    fn test_authorization_is_token_with_colon() {
        let request = TestConnectionRequest::new("http://sonar.local/api/", "squ_abc");
        let target = ProbeTarget::from_request(&request).unwrap();
        assert_eq!(target.authorization(), "squ_abc:");
    }

    #[test]
    fn test_empty_proxy_means_direct() {
        let request = TestConnectionRequest::new("http://sonar.local/api/", "t").with_proxy("");
        let target = ProbeTarget::from_request(&request).unwrap();
        assert!(target.proxy().is_none());

        let request = TestConnectionRequest::new("http://sonar.local/api/", "t")
            .with_proxy("http://proxy.local:3128");
        let target = ProbeTarget::from_request(&request).unwrap();
        assert_eq!(target.proxy().unwrap().host_str(), Some("proxy.local"));
    }

    #[test]
    fn test_default_timeout_is_three_seconds() {
        let request = TestConnectionRequest::new("http://sonar.local/api/", "t");
        let target = ProbeTarget::from_request(&request).unwrap();
        assert_eq!(target.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_token_not_exposed_in_debug() {
        let request = TestConnectionRequest::new("http://sonar.local/api/", "secret_token_12345");
        let target = ProbeTarget::from_request(&request).unwrap();
        assert!(!format!("{:?}", target).contains("secret_token"));
    }
}
