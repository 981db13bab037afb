//! Gremlin execution client.
//!
//! The rest of the crate only sees `GremlinExecutor`: send a script and its
//! bindings, get the raw result payload back. `GremlinWsClient` speaks the
//! Gremlin Server WebSocket protocol, `GremlinPool` spreads calls over
//! several servers.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

mod bindings;
mod errors;
pub mod graphson;
mod pool;
mod websocket;

pub use bindings::BindingAllocator;
pub use errors::ExecutionError;
pub use pool::GremlinPool;
pub use websocket::GremlinWsClient;

/// Binding table sent along with a script: binding name → literal value.
pub type Bindings = serde_json::Map<String, Value>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GremlinExecutor: Send + Sync {
    /// Evaluate `query` with `bindings`.
    ///
    /// The payload is the JSON array of result items. An empty payload is a
    /// valid answer (some servers send no data at all for empty results).
    async fn execute(&self, query: &str, bindings: &Bindings) -> Result<Bytes, ExecutionError>;
}

#[async_trait]
impl<T: GremlinExecutor + ?Sized> GremlinExecutor for Arc<T> {
    async fn execute(&self, query: &str, bindings: &Bindings) -> Result<Bytes, ExecutionError> {
        (**self).execute(query, bindings).await
    }
}

/// Decode a result payload into its items. Empty payloads decode to no items.
pub fn decode_items(payload: &[u8]) -> Result<Vec<Value>, ExecutionError> {
    if payload.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| ExecutionError::MalformedResponse(e.to_string()))?;
    match graphson::untype(value) {
        Value::Array(items) => Ok(items),
        other => Err(ExecutionError::MalformedResponse(format!(
            "expected a result array, got {}",
            other
        ))),
    }
}
