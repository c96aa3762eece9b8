//! Backend availability, selection, and the two transport implementations.
//!
//! The two transports are compiled in behind the `threaded` and
//! `nonblocking` cargo features. Selection runs exactly once, when the
//! service starts, and the chosen [`Backend`] is then invoked uniformly by
//! every verb method.

#[cfg(feature = "threaded")]
use std::sync::Arc;

#[cfg(feature = "threaded")]
use bytes::Bytes;
#[cfg(feature = "threaded")]
use tokio::sync::Semaphore;
#[cfg(feature = "threaded")]
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::config::{Auth, ClientConfig};
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestMethod, RequestOptions};
use crate::response::PendingResponse;

/// Installation and tradeoff guidance, embedded in availability errors.
pub const BACKEND_GUIDANCE: &str = "\
the threaded backend is built on a mature blocking HTTP stack, but each
request occupies a worker thread, so it has more overhead and is roughly
2.8x slower under load.
the nonblocking backend is integrated natively with the async runtime and
has lower overhead, but is less feature complete.

enable the `threaded` or `nonblocking` cargo feature of
conductor-http-client (both are enabled by default).";

/// Returns true if the threaded backend is compiled in.
pub const fn threaded_available() -> bool {
    cfg!(feature = "threaded")
}

/// Returns true if the nonblocking backend is compiled in.
pub const fn nonblocking_available() -> bool {
    cfg!(feature = "nonblocking")
}

/// Configuration-time availability check.
///
/// Call this while validating configuration so a build with no backend is
/// reported to the operator as a configuration error rather than a failure
/// at startup. `requester` names the feature that needs the client and is
/// included in the error message.
pub fn check_available(requester: &str) -> Result<()> {
    if threaded_available() || nonblocking_available() {
        Ok(())
    } else {
        Err(unavailable_error(requester))
    }
}

pub(crate) fn unavailable_error(requester: &str) -> Error {
    Error::new(ErrorKind::Config(format!(
        "neither the threaded nor the nonblocking HTTP backend is enabled, \
         but {requester} requires one\n\n{BACKEND_GUIDANCE}"
    )))
}

/// Which transport a started service is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Threaded,
    Nonblocking,
}

/// The transport strategy selected at startup.
#[derive(Debug)]
pub(crate) enum Backend {
    #[cfg(feature = "threaded")]
    Threaded(ThreadedSession),
    #[cfg(feature = "nonblocking")]
    Nonblocking(NonblockingAgent),
}

impl Backend {
    /// Run the selection policy for the given configuration.
    ///
    /// A credential that is not a plain username/password pair forces the
    /// threaded backend, because the nonblocking backend only supports
    /// basic authentication. Otherwise the preference flag decides, with
    /// the threaded backend as the default and either backend standing in
    /// when the preferred one is not compiled in.
    pub(crate) fn select(config: &ClientConfig) -> Result<Self> {
        let force_threaded = config.auth.as_ref().is_some_and(|auth| !auth.is_basic());
        let prefer_threaded = config.prefer_threaded || force_threaded;

        if threaded_available() && (prefer_threaded || !nonblocking_available()) {
            if !config.prefer_threaded {
                warn!(
                    forced = force_threaded,
                    "threaded backend selected despite nonblocking preference"
                );
            }
            return Self::threaded(config);
        }
        if nonblocking_available() {
            if force_threaded {
                return Err(Error::new(ErrorKind::Startup(
                    "the configured credential scheme requires the threaded backend, \
                     which is not enabled; the nonblocking backend supports basic \
                     authentication only"
                        .to_string(),
                )));
            }
            return Self::nonblocking(config);
        }
        Err(Error::new(ErrorKind::Startup(format!(
            "HttpClientService has no HTTP backend enabled; callers should run \
             check_available() during configuration validation to report this \
             before startup\n\n{BACKEND_GUIDANCE}"
        ))))
    }

    #[cfg(feature = "threaded")]
    fn threaded(config: &ClientConfig) -> Result<Self> {
        Ok(Backend::Threaded(ThreadedSession::new(config)))
    }

    #[cfg(not(feature = "threaded"))]
    fn threaded(_config: &ClientConfig) -> Result<Self> {
        unreachable!("threaded backend selected without the 'threaded' feature")
    }

    #[cfg(feature = "nonblocking")]
    fn nonblocking(config: &ClientConfig) -> Result<Self> {
        Ok(Backend::Nonblocking(NonblockingAgent::new(config)?))
    }

    #[cfg(not(feature = "nonblocking"))]
    fn nonblocking(_config: &ClientConfig) -> Result<Self> {
        unreachable!("nonblocking backend selected without the 'nonblocking' feature")
    }

    pub(crate) fn kind(&self) -> BackendKind {
        match self {
            #[cfg(feature = "threaded")]
            Backend::Threaded(_) => BackendKind::Threaded,
            #[cfg(feature = "nonblocking")]
            Backend::Nonblocking(_) => BackendKind::Nonblocking,
            #[cfg(not(any(feature = "threaded", feature = "nonblocking")))]
            _ => unreachable!("no backend compiled in"),
        }
    }

    /// Hand a normalized request to the active transport.
    pub(crate) fn dispatch(
        &self,
        method: RequestMethod,
        url: Url,
        options: RequestOptions,
    ) -> Result<PendingResponse> {
        match self {
            #[cfg(feature = "threaded")]
            Backend::Threaded(session) => Ok(session.dispatch(method, url, options)),
            #[cfg(feature = "nonblocking")]
            Backend::Nonblocking(agent) => agent.dispatch(method, url, options),
            #[cfg(not(any(feature = "threaded", feature = "nonblocking")))]
            _ => {
                let _ = (method, url, options);
                unreachable!("no backend compiled in")
            }
        }
    }

    /// Release the transport's resources. Completes only once in-flight
    /// requests have drained and pooled connections can close.
    pub(crate) async fn shutdown(self) -> Result<()> {
        match self {
            #[cfg(feature = "threaded")]
            Backend::Threaded(session) => session.shutdown().await,
            #[cfg(feature = "nonblocking")]
            Backend::Nonblocking(agent) => {
                // Pooled connections close once the last clone, held by
                // any still-running request task, is dropped.
                drop(agent);
                Ok(())
            }
            #[cfg(not(any(feature = "threaded", feature = "nonblocking")))]
            _ => unreachable!("no backend compiled in"),
        }
    }
}

/// Blocking transport driven on the runtime's blocking-thread pool.
///
/// Concurrency is bounded by a semaphore sized like the connection cap, so
/// at most that many worker threads are occupied at once. The response
/// body is read to completion inside the worker; callers never touch the
/// blocking reader.
#[cfg(feature = "threaded")]
#[derive(Debug)]
pub(crate) struct ThreadedSession {
    agent: ureq::Agent,
    permits: Arc<Semaphore>,
    limit: usize,
}

#[cfg(feature = "threaded")]
impl ThreadedSession {
    fn new(config: &ClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(&config.user_agent)
            .max_idle_connections_per_host(config.pool_max_per_host)
            .build();
        Self {
            agent,
            permits: Arc::new(Semaphore::new(config.pool_max_per_host)),
            limit: config.pool_max_per_host,
        }
    }

    fn dispatch(&self, method: RequestMethod, url: Url, options: RequestOptions) -> PendingResponse {
        let agent = self.agent.clone();
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| Error::new(ErrorKind::NotStarted))?;
            tokio::task::spawn_blocking(move || execute_blocking(&agent, method, &url, options))
                .await?
        });
        PendingResponse::buffered(handle)
    }

    /// Waits for every in-flight and queued worker before dropping the
    /// agent and its pooled connections.
    async fn shutdown(self) -> Result<()> {
        let drained = self
            .permits
            .acquire_many(self.limit as u32)
            .await
            .map_err(|_| Error::new(ErrorKind::Other("session already closed".to_string())))?;
        drop(drained);
        Ok(())
    }
}

#[cfg(feature = "threaded")]
fn execute_blocking(
    agent: &ureq::Agent,
    method: RequestMethod,
    url: &Url,
    options: RequestOptions,
) -> Result<Bytes> {
    use std::io::Read;

    let mut request = agent.request(method.as_str(), url.as_str());
    for (name, value) in &options.query {
        request = request.query(name, value);
    }
    for (name, value) in &options.headers {
        request = request.set(name, value);
    }
    if let Some(auth) = &options.auth {
        request = request.set("Authorization", &authorization_value(auth));
    }

    let outcome = if let Some(json) = &options.json {
        let body = serde_json::to_string(json)?;
        request
            .set("Content-Type", "application/json")
            .send_string(&body)
    } else if let Some(form) = &options.data {
        let pairs: Vec<(&str, &str)> = form
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        request.send_form(&pairs)
    } else {
        request.call()
    };

    // Non-2xx statuses are ordinary responses; only transport failures
    // become errors.
    let response = match outcome {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(err) => {
            return Err(Error::with_source(ErrorKind::Transport(err.to_string()), err));
        }
    };

    debug!(status = response.status(), url = %url, "threaded request completed");

    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|err| Error::with_source(ErrorKind::Transport(err.to_string()), err))?;
    Ok(Bytes::from(body))
}

#[cfg(feature = "threaded")]
fn authorization_value(auth: &Auth) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    match auth {
        Auth::Basic { username, password } => {
            format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
        }
        Auth::Bearer(token) => format!("Bearer {token}"),
    }
}

/// Natively asynchronous transport with a bounded per-host connection
/// pool.
#[cfg(feature = "nonblocking")]
#[derive(Debug, Clone)]
pub(crate) struct NonblockingAgent {
    client: reqwest::Client,
}

#[cfg(feature = "nonblocking")]
impl NonblockingAgent {
    fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|err| Error::with_source(ErrorKind::Config(err.to_string()), err))?;
        Ok(Self { client })
    }

    fn dispatch(
        &self,
        method: RequestMethod,
        url: Url,
        options: RequestOptions,
    ) -> Result<PendingResponse> {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

        // The transport's header map is multi-valued; each flat entry
        // becomes a single-element list under its name.
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::with_source(ErrorKind::InvalidHeader(name.clone()), err))?;
            let header_value = HeaderValue::from_str(value).map_err(|err| {
                Error::with_source(ErrorKind::InvalidHeader(format!("{name}: {value}")), err)
            })?;
            headers.append(header_name, header_value);
        }

        let mut builder = self.client.request(method.to_reqwest(), url);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }

        match &options.auth {
            Some(Auth::Basic { username, password }) => {
                builder = builder.basic_auth(username, Some(password));
            }
            Some(_) => {
                return Err(Error::new(ErrorKind::Config(
                    "the nonblocking backend supports basic authentication only".to_string(),
                )));
            }
            None => {}
        }

        if let Some(json) = &options.json {
            let body = serde_json::to_vec(json)?;
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            builder = builder.body(body);
        } else if let Some(form) = &options.data {
            // Content type comes from the transport's form encoder.
            builder = builder.form(form);
        }

        let request = builder.headers(headers).send();
        Ok(PendingResponse::streaming(tokio::spawn(async move {
            request.await.map_err(Error::from)
        })))
    }
}
