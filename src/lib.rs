//! # conductor-http-client
//!
//! Service-scoped HTTP client abstraction for Conductor automation
//! services calling external REST APIs.
//!
//! The crate provides:
//! - a minimal `get`/`put`/`delete`/`post` surface with automatic
//!   base-URL joining, header merging, and authentication defaulting
//! - two interchangeable transports, selected once at startup: a
//!   `threaded` backend (blocking stack on worker threads) and a
//!   `nonblocking` backend (natively asynchronous, bounded per-host pool)
//! - lazy [`PendingResponse`] handles with uniform `content`/`json`
//!   accessors regardless of the active backend
//! - identity-keyed instance sharing through [`ClientRegistry`]
//!
//! Retries, rate limiting, timeouts, and redirect handling are left to the
//! transports and the services above this crate.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                Conductor services                      │
//! │        (status push, change hooks, reporters)          │
//! └────────────────────────────────────────────────────────┘
//!                            │ acquire(config)
//!                            ▼
//! ┌────────────────────────────────────────────────────────┐
//! │                   ClientRegistry                       │
//! │  one running HttpClientService per (base URL, auth,    │
//! │  default headers) identity                             │
//! └────────────────────────────────────────────────────────┘
//!                            │ get/put/delete/post
//!                            ▼
//! ┌────────────────────────────────────────────────────────┐
//! │                  HttpClientService                     │
//! │  URL join + header merge + auth defaulting, then       │
//! │  dispatch through the backend selected at start()      │
//! └────────────────────────────────────────────────────────┘
//!                   │                      │
//!                   ▼                      ▼
//!          ThreadedSession         NonblockingAgent
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use conductor_http_client::{Auth, ClientConfig, ClientRegistry, RequestOptions};
//!
//! # async fn example(registry: &ClientRegistry) -> Result<(), conductor_http_client::Error> {
//! let config = ClientConfig::builder("https://ci.example.com/api/")
//!     .with_auth(Auth::basic("conductor", "s3cret"))
//!     .with_default_header("Accept", "application/json")
//!     .build()?;
//!
//! let client = registry.acquire(config).await?;
//! let status: serde_json::Value = client
//!     .get("builds/42", RequestOptions::new())
//!     .await?
//!     .json()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! The crate intentionally compiles with neither backend feature enabled
//! so that [`check_available`] can report the missing backend as a
//! configuration error instead of the build failing outright.

mod backend;
mod client;
mod config;
mod error;
mod registry;
mod request;
mod response;

pub use backend::{
    check_available, nonblocking_available, threaded_available, BackendKind, BACKEND_GUIDANCE,
};
pub use client::HttpClientService;
pub use config::{Auth, ClientConfig, ClientConfigBuilder, ClientKey, DEFAULT_POOL_MAX_PER_HOST};
pub use error::{Error, ErrorKind, Result};
pub use registry::ClientRegistry;
pub use request::{RequestMethod, RequestOptions};
pub use response::PendingResponse;

/// User-Agent string for the client.
pub const USER_AGENT: &str = concat!("conductor-http-client/", env!("CARGO_PKG_VERSION"));
