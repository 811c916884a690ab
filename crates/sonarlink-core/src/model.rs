//! Connection data model
//!
//! [`Connection`] is the persisted record. [`NewConnection`], [`ConnectionPatch`]
//! and [`TestConnectionRequest`] are the validated payloads that create, mutate
//! and probe connections.
//!
//! Tokens are credentials: every type here redacts them from `Debug` output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::validation::{validate_endpoint, validate_not_blank, validate_proxy, validate_token};

/// Store-assigned identity of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw identifier
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw identifier
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The identifier following this one, `None` once the space is exhausted
    pub(crate) const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored analytics-server connection
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Store-assigned identity
    pub id: ConnectionId,
    /// Unique, human-readable name
    pub name: String,
    /// API root of the analytics server, e.g. `http://host:9000/api/`
    pub endpoint: String,
    /// User token sent as the `Authorization` header
    pub token: String,
    /// Optional HTTP proxy all traffic is routed through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When a field of the record last changed
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// Build a freshly created record
    ///
    /// Only stores assign identities, so this stays crate-private.
    pub(crate) fn from_new(id: ConnectionId, new: NewConnection) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: new.name,
            endpoint: new.endpoint,
            token: new.token,
            proxy: new.proxy.filter(|p| !p.is_empty()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Parameters for probing this stored connection
    pub fn to_test_request(&self) -> TestConnectionRequest {
        TestConnectionRequest {
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("token", &"<REDACTED>")
            .field("proxy", &self.proxy)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Payload for creating a connection
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewConnection {
    /// Unique connection name (1-100 characters)
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    /// API root URL (http or https)
    #[validate(length(min = 1, max = 255), custom(function = "validate_endpoint"))]
    pub endpoint: String,
    /// User token
    #[validate(length(min = 1), custom(function = "validate_token"))]
    pub token: String,
    /// Optional proxy URL, empty means none
    #[validate(length(max = 255), custom(function = "validate_proxy"))]
    #[serde(default)]
    pub proxy: Option<String>,
}

impl NewConnection {
    /// Create a payload without a proxy
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            token: token.into(),
            proxy: None,
        }
    }

    /// Route traffic for this connection through a proxy
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

impl fmt::Debug for NewConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewConnection")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("token", &"<REDACTED>")
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Partial update of a connection
///
/// Only the supplied fields change. Supplying an empty `proxy` clears it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ConnectionPatch {
    /// New connection name
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New API root URL
    #[validate(length(min = 1, max = 255), custom(function = "validate_endpoint"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// New user token
    #[validate(length(min = 1), custom(function = "validate_token"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// New proxy URL, empty string removes the proxy
    #[validate(length(max = 255), custom(function = "validate_proxy"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl ConnectionPatch {
    /// Whether the patch carries no fields at all
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.endpoint.is_none() && self.token.is_none() && self.proxy.is_none()
    }

    /// Merge the supplied fields into `connection`
    ///
    /// Returns `true` if any field actually changed; `updated_at` is bumped only
    /// in that case.
    pub fn apply_to(&self, connection: &mut Connection) -> bool {
        let mut changed = false;

        if let Some(name) = &self.name {
            changed |= replace_if_different(&mut connection.name, name);
        }
        if let Some(endpoint) = &self.endpoint {
            changed |= replace_if_different(&mut connection.endpoint, endpoint);
        }
        if let Some(token) = &self.token {
            changed |= replace_if_different(&mut connection.token, token);
        }
        if let Some(proxy) = &self.proxy {
            let proxy = Some(proxy.clone()).filter(|p| !p.is_empty());
            if connection.proxy != proxy {
                connection.proxy = proxy;
                changed = true;
            }
        }

        if changed {
            connection.updated_at = Utc::now();
        }
        changed
    }
}

fn replace_if_different(slot: &mut String, value: &str) -> bool {
    if slot == value {
        return false;
    }
    *slot = value.to_string();
    true
}

impl fmt::Debug for ConnectionPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPatch")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Parameters for a stateless connectivity test
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TestConnectionRequest {
    /// API root URL (http or https)
    #[validate(length(min = 1, max = 255), custom(function = "validate_endpoint"))]
    pub endpoint: String,
    /// User token
    #[validate(length(min = 1), custom(function = "validate_token"))]
    pub token: String,
    /// Optional proxy URL, empty means none
    #[validate(length(max = 255), custom(function = "validate_proxy"))]
    #[serde(default)]
    pub proxy: Option<String>,
}

impl TestConnectionRequest {
    /// Create a request without a proxy
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            proxy: None,
        }
    }

    /// Route the test through a proxy
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

impl fmt::Debug for TestConnectionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestConnectionRequest")
            .field("endpoint", &self.endpoint)
            .field("token", &"<REDACTED>")
            .field("proxy", &self.proxy)
            .finish()
    }
}
