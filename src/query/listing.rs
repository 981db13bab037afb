use bytes::Bytes;
use serde_json::{Map, Value};

use crate::client::{decode_items, GremlinExecutor};

use super::compiler::{Compiled, TraversalCompiler};
use super::errors::QueryError;
use super::request::ListingRequest;

const EMPTY_LIST: &[u8] = b"[]";

/// Compile a listing request and run it.
pub struct ListingService<E> {
    compiler: TraversalCompiler,
    executor: E,
}

impl<E: GremlinExecutor> ListingService<E> {
    pub fn new(compiler: TraversalCompiler, executor: E) -> Self {
        Self { compiler, executor }
    }

    pub fn ports(executor: E) -> Self {
        Self::new(TraversalCompiler::for_ports(), executor)
    }

    /// Raw JSON array of the matching resources. An empty server answer and
    /// a short-circuited request both come back as `[]`.
    pub async fn list_raw(&self, request: &ListingRequest) -> Result<Bytes, QueryError> {
        let compiled = match self.compiler.compile(request) {
            Compiled::Empty => return Ok(Bytes::from_static(EMPTY_LIST)),
            Compiled::Query(compiled) => compiled,
        };
        let payload = self
            .executor
            .execute(&compiled.query, &compiled.bindings)
            .await?;
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(Bytes::from_static(EMPTY_LIST));
        }
        Ok(payload)
    }

    /// Matching resources, one JSON object each.
    pub async fn list(&self, request: &ListingRequest) -> Result<Vec<Map<String, Value>>, QueryError> {
        let payload = self.list_raw(request).await?;
        decode_items(&payload)?
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(QueryError::MalformedRow(other.to_string())),
            })
            .collect()
    }
}
