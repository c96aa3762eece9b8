//! Client configuration and identity.
//!
//! A [`ClientConfig`] is immutable once built. Its `(base URL, auth,
//! default headers)` triple doubles as the sharing identity used by the
//! registry, so two callers targeting the same logical service reuse one
//! running instance and one connection pool.

use std::collections::BTreeMap;

use url::Url;

use crate::error::Result;

/// Default cap on persistent connections per host, and on concurrent
/// worker threads for the threaded backend.
pub const DEFAULT_POOL_MAX_PER_HOST: usize = 5;

/// Authentication credential applied to outgoing requests.
///
/// The nonblocking backend only supports [`Auth::Basic`]; any other scheme
/// forces selection of the threaded backend.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Auth {
    /// Username/password pair, sent as HTTP basic authentication.
    Basic { username: String, password: String },
    /// Opaque bearer token.
    Bearer(String),
}

impl Auth {
    /// Basic credentials from a username/password pair.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Bearer-token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    /// Returns true for the simple username/password form.
    pub fn is_basic(&self) -> bool {
        matches!(self, Auth::Basic { .. })
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Auth::Bearer(_) => f.write_str("Bearer([REDACTED])"),
        }
    }
}

/// Configuration for one logical HTTP client service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL that per-call endpoints are resolved against.
    pub base_url: Url,
    /// Credential injected into every request unless overridden per call.
    pub auth: Option<Auth>,
    /// Headers added to every request for names the call did not set.
    pub default_headers: BTreeMap<String, String>,
    /// Prefer the threaded backend when both are enabled.
    pub prefer_threaded: bool,
    /// Cap on persistent connections per host (nonblocking backend) and on
    /// concurrent worker threads (threaded backend).
    pub pool_max_per_host: usize,
    /// User-Agent header value.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a new config builder for the given base URL.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: base_url.into(),
            auth: None,
            default_headers: BTreeMap::new(),
            prefer_threaded: true,
            pool_max_per_host: DEFAULT_POOL_MAX_PER_HOST,
            user_agent: crate::USER_AGENT.to_string(),
        }
    }

    /// Sharing identity for this configuration.
    pub fn identity(&self) -> ClientKey {
        ClientKey {
            base_url: self.base_url.as_str().to_string(),
            auth: self.auth.clone(),
            default_headers: self.default_headers.clone(),
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    base_url: String,
    auth: Option<Auth>,
    default_headers: BTreeMap<String, String>,
    prefer_threaded: bool,
    pool_max_per_host: usize,
    user_agent: String,
}

impl ClientConfigBuilder {
    /// Set the credential injected into every request.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Add a default header applied to requests that do not set it.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Replace the default header map.
    pub fn with_default_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.default_headers = headers;
        self
    }

    /// Set the backend preference. Defaults to preferring the threaded
    /// backend.
    pub fn prefer_threaded(mut self, prefer: bool) -> Self {
        self.prefer_threaded = prefer;
        self
    }

    /// Set the per-host connection cap / worker-thread cap.
    pub fn with_pool_max_per_host(mut self, max: usize) -> Self {
        self.pool_max_per_host = max;
        self
    }

    /// Set custom User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the configuration, parsing and validating the base URL.
    pub fn build(self) -> Result<ClientConfig> {
        let base_url = Url::parse(&self.base_url)?;
        Ok(ClientConfig {
            base_url,
            auth: self.auth,
            default_headers: self.default_headers,
            prefer_threaded: self.prefer_threaded,
            pool_max_per_host: self.pool_max_per_host,
            user_agent: self.user_agent,
        })
    }
}

/// Sharing identity: two configs with an equal key must map to the same
/// running service instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    base_url: String,
    auth: Option<Auth>,
    default_headers: BTreeMap<String, String>,
}
