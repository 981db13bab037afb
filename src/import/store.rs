use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;

use crate::record::Relation;
use crate::schema::{LinkKind, PropertyBag};

use super::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub id: String,
    pub label: String,
    pub properties: PropertyBag,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
}

impl From<&Relation> for Edge {
    fn from(relation: &Relation) -> Self {
        Self {
            source: relation.source.clone(),
            target: relation.target.clone(),
            kind: relation.kind,
        }
    }
}

impl From<Edge> for Relation {
    fn from(edge: Edge) -> Self {
        Relation::new(edge.source, edge.target, edge.kind)
    }
}

/// Graph operations the importer relies on.
///
/// Implementations must make `upsert_vertex` merge by key (supplied keys
/// replace, others stay) and `reconcile_edges` leave exactly one `kind` edge
/// from `source` to each of `targets`.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn upsert_vertex(&self, vertex: &Vertex) -> Result<(), StoreError>;

    async fn vertex_exists(&self, id: &str) -> Result<bool, StoreError>;

    async fn fetch_vertex(&self, id: &str) -> Result<Option<Vertex>, StoreError>;

    /// Fails with `StoreError::MissingEndpoint` unless both ends exist.
    async fn create_edge(&self, edge: &Edge) -> Result<(), StoreError>;

    async fn outgoing_edges(&self, source: &str) -> Result<Vec<Edge>, StoreError>;

    async fn reconcile_edges(
        &self,
        source: &str,
        kind: LinkKind,
        targets: &BTreeSet<String>,
    ) -> Result<(), StoreError>;

    /// Remove the vertex and its incident edges. Absent vertices are not an error.
    async fn drop_vertex(&self, id: &str) -> Result<(), StoreError>;
}
