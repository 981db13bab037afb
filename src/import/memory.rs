//! In-process graph store.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::schema::LinkKind;

use super::{Edge, GraphStore, StoreError, Vertex};

#[derive(Debug, Default)]
struct GraphState {
    vertices: HashMap<String, Vertex>,
    // multiplicity is allowed, hence a list
    edges: Vec<Edge>,
}

impl GraphState {
    fn require_endpoints(&self, from: &str, to: &str) -> Result<(), StoreError> {
        if self.vertices.contains_key(from) && self.vertices.contains_key(to) {
            Ok(())
        } else {
            Err(StoreError::MissingEndpoint {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    state: RwLock<GraphState>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn vertex_count(&self) -> usize {
        self.state.read().await.vertices.len()
    }

    /// Snapshot of every edge, sorted.
    pub async fn edges(&self) -> Vec<Edge> {
        let mut edges = self.state.read().await.edges.clone();
        edges.sort();
        edges
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_vertex(&self, vertex: &Vertex) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.vertices.get_mut(&vertex.id) {
            Some(existing) if existing.label != vertex.label => Err(StoreError::LabelConflict {
                id: vertex.id.clone(),
                existing: existing.label.clone(),
                requested: vertex.label.clone(),
            }),
            Some(existing) => {
                existing
                    .properties
                    .extend(vertex.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
                Ok(())
            }
            None => {
                state.vertices.insert(vertex.id.clone(), vertex.clone());
                Ok(())
            }
        }
    }

    async fn vertex_exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.state.read().await.vertices.contains_key(id))
    }

    async fn fetch_vertex(&self, id: &str) -> Result<Option<Vertex>, StoreError> {
        Ok(self.state.read().await.vertices.get(id).cloned())
    }

    async fn create_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.require_endpoints(&edge.source, &edge.target)?;
        state.edges.push(edge.clone());
        Ok(())
    }

    async fn outgoing_edges(&self, source: &str) -> Result<Vec<Edge>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .iter()
            .filter(|e| e.source == source)
            .cloned()
            .collect())
    }

    async fn reconcile_edges(
        &self,
        source: &str,
        kind: LinkKind,
        targets: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for target in targets {
            state.require_endpoints(source, target)?;
        }

        state
            .edges
            .retain(|e| !(e.source == source && e.kind == kind && !targets.contains(&e.target)));

        let mut present: BTreeSet<String> = BTreeSet::new();
        state.edges.retain(|e| {
            if e.source == source && e.kind == kind {
                // collapse duplicates left by earlier create_edge calls
                present.insert(e.target.clone())
            } else {
                true
            }
        });

        for target in targets.difference(&present) {
            state.edges.push(Edge {
                source: source.to_string(),
                target: target.clone(),
                kind,
            });
        }
        Ok(())
    }

    async fn drop_vertex(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.vertices.remove(id);
        state.edges.retain(|e| e.source != id && e.target != id);
        Ok(())
    }
}
