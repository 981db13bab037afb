//! Round-robin over several Gremlin servers.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use super::{Bindings, ExecutionError, GremlinExecutor, GremlinWsClient};

pub struct GremlinPool {
    clients: Vec<GremlinWsClient>,
    round_robin: AtomicUsize,
}

impl GremlinPool {
    /// One lazily-connected client per URL.
    pub fn new<I, S>(urls: I) -> Result<Self, ExecutionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let clients: Vec<GremlinWsClient> = urls.into_iter().map(GremlinWsClient::new).collect();
        if clients.is_empty() {
            return Err(ExecutionError::NoServer);
        }
        log::info!("Gremlin pool with {} server(s)", clients.len());
        Ok(Self {
            clients,
            round_robin: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn next_client(&self) -> &GremlinWsClient {
        let idx = self.round_robin.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[idx]
    }
}

#[async_trait]
impl GremlinExecutor for GremlinPool {
    async fn execute(&self, query: &str, bindings: &Bindings) -> Result<Bytes, ExecutionError> {
        let client = self.next_client();
        log::debug!("Query on {}: {}", client.url(), query);
        client.execute(query, bindings).await
    }
}
