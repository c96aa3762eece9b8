//! The HTTP client service.
//!
//! One [`HttpClientService`] is bound to a base URL plus optional
//! credential and default headers. It normalizes every request the same
//! way regardless of the active backend: the endpoint is joined to the
//! base URL, instance auth fills in when the call has none, and default
//! headers fill the names the call left unset.

use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::backend::{Backend, BackendKind};
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestMethod, RequestOptions};
use crate::response::PendingResponse;

/// A service-scoped HTTP client with a backend chosen at startup.
///
/// Instances are usually obtained through a
/// [`ClientRegistry`](crate::ClientRegistry), which shares one running
/// service per `(base URL, auth, default headers)` identity.
#[derive(Debug)]
pub struct HttpClientService {
    config: ClientConfig,
    backend: RwLock<Option<Backend>>,
}

impl HttpClientService {
    /// Create a service in the stopped state.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            backend: RwLock::new(None),
        }
    }

    /// The configuration this service was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Select a backend and make the service ready to dispatch requests.
    ///
    /// Idempotent: starting an already-started service keeps the backend
    /// it selected the first time.
    pub async fn start(&self) -> Result<()> {
        let mut slot = self.backend.write().await;
        if slot.is_some() {
            return Ok(());
        }
        let backend = Backend::select(&self.config)?;
        info!(
            backend = ?backend.kind(),
            base_url = %self.config.base_url,
            "http client service started"
        );
        *slot = Some(backend);
        Ok(())
    }

    /// Stop the service and release its session or connection pool.
    ///
    /// Completes once the backend's resources are released; afterwards
    /// requests fail with [`ErrorKind::NotStarted`] until a fresh
    /// [`start`](Self::start).
    pub async fn stop(&self) -> Result<()> {
        let backend = self.backend.write().await.take();
        if let Some(backend) = backend {
            info!(base_url = %self.config.base_url, "http client service stopping");
            backend.shutdown().await?;
        }
        Ok(())
    }

    /// Which backend the service is running on, if started.
    pub async fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.read().await.as_ref().map(Backend::kind)
    }

    /// Issue a GET request.
    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<PendingResponse> {
        self.request(RequestMethod::Get, endpoint, options).await
    }

    /// Issue a PUT request.
    pub async fn put(&self, endpoint: &str, options: RequestOptions) -> Result<PendingResponse> {
        self.request(RequestMethod::Put, endpoint, options).await
    }

    /// Issue a DELETE request.
    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<PendingResponse> {
        self.request(RequestMethod::Delete, endpoint, options).await
    }

    /// Issue a POST request.
    pub async fn post(&self, endpoint: &str, options: RequestOptions) -> Result<PendingResponse> {
        self.request(RequestMethod::Post, endpoint, options).await
    }

    async fn request(
        &self,
        method: RequestMethod,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<PendingResponse> {
        let (url, options) = self.prepare_request(endpoint, options)?;
        let guard = self.backend.read().await;
        let backend = guard
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::NotStarted))?;
        debug!(method = method.as_str(), url = %url, "dispatching request");
        backend.dispatch(method, url, options)
    }

    /// Resolve the final URL and fill per-call options from the instance
    /// configuration.
    ///
    /// A relative endpoint appends to the base URL's path; an absolute
    /// endpoint path replaces it. Per-call headers and auth always win;
    /// instance defaults only fill what the call left unset.
    fn prepare_request(
        &self,
        endpoint: &str,
        mut options: RequestOptions,
    ) -> Result<(Url, RequestOptions)> {
        let url = self.config.base_url.join(endpoint)?;
        if options.auth.is_none() {
            options.auth = self.config.auth.clone();
        }
        for (name, value) in &self.config.default_headers {
            options
                .headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        Ok((url, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Auth;

    fn service(base_url: &str) -> HttpClientService {
        HttpClientService::new(ClientConfig::builder(base_url).build().unwrap())
    }

    #[test]
    fn test_relative_endpoint_appends() {
        let service = service("http://x/a/");
        let (url, _) = service
            .prepare_request("b", RequestOptions::new())
            .unwrap();
        assert_eq!(url.as_str(), "http://x/a/b");
    }

    #[test]
    fn test_absolute_endpoint_replaces_path() {
        let service = service("http://x/a/");
        let (url, _) = service
            .prepare_request("/b", RequestOptions::new())
            .unwrap();
        assert_eq!(url.as_str(), "http://x/b");
    }

    #[test]
    fn test_join_without_trailing_slash_drops_last_segment() {
        let service = service("http://x/a");
        let (url, _) = service
            .prepare_request("b", RequestOptions::new())
            .unwrap();
        assert_eq!(url.as_str(), "http://x/b");
    }

    #[test]
    fn test_instance_auth_fills_when_call_has_none() {
        let config = ClientConfig::builder("http://x/")
            .with_auth(Auth::basic("operator", "hunter2"))
            .build()
            .unwrap();
        let service = HttpClientService::new(config);

        let (_, options) = service
            .prepare_request("b", RequestOptions::new())
            .unwrap();
        assert_eq!(options.auth, Some(Auth::basic("operator", "hunter2")));
    }

    #[test]
    fn test_per_call_auth_overrides_instance_auth() {
        let config = ClientConfig::builder("http://x/")
            .with_auth(Auth::basic("operator", "hunter2"))
            .build()
            .unwrap();
        let service = HttpClientService::new(config);

        let (_, options) = service
            .prepare_request("b", RequestOptions::new().auth(Auth::bearer("t0ken")))
            .unwrap();
        assert_eq!(options.auth, Some(Auth::bearer("t0ken")));
    }

    #[test]
    fn test_default_headers_fill_missing_names_only() {
        let config = ClientConfig::builder("http://x/")
            .with_default_header("Accept", "application/json")
            .with_default_header("X-Env", "production")
            .build()
            .unwrap();
        let service = HttpClientService::new(config);

        let (_, options) = service
            .prepare_request("b", RequestOptions::new().header("Accept", "text/plain"))
            .unwrap();

        // The per-call value survives; the default only fills the gap.
        assert_eq!(options.headers.get("Accept"), Some(&"text/plain".to_string()));
        assert_eq!(options.headers.get("X-Env"), Some(&"production".to_string()));
    }

    #[tokio::test]
    async fn test_request_before_start_fails() {
        let service = service("http://x/");
        let err = service.get("b", RequestOptions::new()).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotStarted));
    }

    #[cfg(any(feature = "threaded", feature = "nonblocking"))]
    mod lifecycle {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn test_start_is_idempotent() {
            let service = service("http://x/");
            service.start().await.unwrap();
            let first = service.backend_kind().await;
            service.start().await.unwrap();
            assert_eq!(service.backend_kind().await, first);
        }

        #[tokio::test]
        async fn test_get_roundtrip() {
            let mock_server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/builds"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"builds": []})),
                )
                .mount(&mock_server)
                .await;

            let service = service(&format!("{}/api/", mock_server.uri()));
            service.start().await.unwrap();

            let value: serde_json::Value = service
                .get("builds", RequestOptions::new())
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(value, serde_json::json!({"builds": []}));

            service.stop().await.unwrap();
        }

        #[tokio::test]
        async fn test_stop_blocks_further_requests() {
            let service = service("http://x/");
            service.start().await.unwrap();
            service.stop().await.unwrap();

            let err = service.get("b", RequestOptions::new()).await.unwrap_err();
            assert!(matches!(err.kind, ErrorKind::NotStarted));

            // A fresh start makes the service usable again.
            service.start().await.unwrap();
            assert!(service.backend_kind().await.is_some());
        }
    }
}
