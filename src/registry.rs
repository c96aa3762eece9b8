//! Identity-keyed sharing of running client services.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::client::HttpClientService;
use crate::config::{ClientConfig, ClientKey};
use crate::error::Result;

/// Shared-instance table for [`HttpClientService`].
///
/// Repeated acquisition for the same `(base URL, auth, default headers)`
/// identity returns the same running instance, so callers hitting the
/// same logical target share one connection pool. The table is an
/// explicit value owned by the host, not process-global state.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientKey, Arc<HttpClientService>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the running service for this configuration, starting one if
    /// none exists yet.
    ///
    /// The registry lock serializes first-time creation, so concurrent
    /// acquisition of the same identity runs exactly one startup sequence.
    /// A startup failure is returned to the caller and nothing is cached.
    pub async fn acquire(&self, config: ClientConfig) -> Result<Arc<HttpClientService>> {
        let mut clients = self.clients.lock().await;
        let key = config.identity();
        if let Some(existing) = clients.get(&key) {
            debug!(base_url = %config.base_url, "reusing shared http client");
            return Ok(Arc::clone(existing));
        }

        let service = Arc::new(HttpClientService::new(config));
        service.start().await?;
        clients.insert(key, Arc::clone(&service));
        Ok(service)
    }

    /// Number of live instances.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Returns true if no instance is registered.
    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    /// Stop and drop every registered instance.
    pub async fn shutdown(&self) -> Result<()> {
        let services: Vec<_> = {
            let mut clients = self.clients.lock().await;
            clients.drain().map(|(_, service)| service).collect()
        };
        for service in services {
            service.stop().await?;
        }
        Ok(())
    }
}
