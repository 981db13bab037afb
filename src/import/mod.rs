//! Graph import: write decoded records as vertices and edges.
//!
//! The importer does not know how the graph is reached; it drives a
//! `GraphStore`. Two stores ship with the crate: `MemoryGraphStore` for tests
//! and dry runs, `GremlinGraphStore` for a live Gremlin server.
//!
//! Concurrent imports of the same id must be serialized by the caller
//! (`update_links` is not atomic across kinds). `sync::Synchronizer` does it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use crate::record::{Relation, ResourceRecord};
use crate::schema::labels::{self, UPDATED_PROPERTY};
use crate::schema::{LinkKind, PropertyValue};

mod errors;
mod gremlin;
mod memory;
mod store;

pub use errors::{MutationError, StoreError};
pub use gremlin::GremlinGraphStore;
pub use memory::MemoryGraphStore;
pub use store::{Edge, GraphStore, Vertex};

pub struct Importer<G> {
    store: G,
}

impl<G: GraphStore> Importer<G> {
    pub fn new(store: G) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &G {
        &self.store
    }

    /// Upsert the vertex for `record`. Supplied property keys replace the
    /// stored ones, keys absent from the record are left as they are.
    pub async fn create(&self, record: &ResourceRecord) -> Result<(), MutationError> {
        let mut properties = record.properties.clone();
        for key in labels::RESERVED_PROPERTIES {
            if properties.remove(*key).is_some() {
                log::warn!(
                    "Resource {} carries reserved property `{}`, it is overwritten",
                    record.id,
                    key
                );
            }
        }
        properties.insert(
            UPDATED_PROPERTY.to_string(),
            PropertyValue::Int(Utc::now().timestamp()),
        );

        let vertex = Vertex {
            id: record.id.clone(),
            label: record.resource_type.clone(),
            properties,
        };
        self.store
            .upsert_vertex(&vertex)
            .await
            .map_err(|e| MutationError::new(&record.id, e))?;
        log::debug!("Upserted {} {}", record.resource_type, record.id);
        Ok(())
    }

    pub async fn exists(&self, id: &str) -> Result<bool, MutationError> {
        self.store
            .vertex_exists(id)
            .await
            .map_err(|e| MutationError::new(id, e))
    }

    /// One edge per relation. Meant for the first import of a resource;
    /// later imports go through `update_links`.
    pub async fn create_links(&self, record: &ResourceRecord) -> Result<(), MutationError> {
        for relation in &record.relations {
            self.store
                .create_edge(&Edge::from(relation))
                .await
                .map_err(|e| MutationError::new(&record.id, e))?;
        }
        Ok(())
    }

    /// Reconcile, per relation kind present in the record, the outgoing
    /// edges of that kind to exactly the targets the record declares.
    /// Kinds the record does not mention are left alone.
    pub async fn update_links(&self, record: &ResourceRecord) -> Result<(), MutationError> {
        for ((source, kind), targets) in group_relations(&record.relations) {
            self.store
                .reconcile_edges(source, kind, &targets)
                .await
                .map_err(|e| MutationError::new(&record.id, e))?;
        }
        Ok(())
    }

    /// Drop the vertex and its incident edges.
    pub async fn delete(&self, id: &str) -> Result<(), MutationError> {
        self.store
            .drop_vertex(id)
            .await
            .map_err(|e| MutationError::new(id, e))?;
        log::info!("Deleted {}", id);
        Ok(())
    }

    /// Rebuild the record stored under `id`, without reserved properties.
    pub async fn derive_record(&self, id: &str) -> Result<Option<ResourceRecord>, MutationError> {
        let vertex = match self.store.fetch_vertex(id).await {
            Ok(Some(vertex)) => vertex,
            Ok(None) => return Ok(None),
            Err(e) => return Err(MutationError::new(id, e)),
        };
        let edges = self
            .store
            .outgoing_edges(id)
            .await
            .map_err(|e| MutationError::new(id, e))?;

        let mut record = ResourceRecord::new(vertex.id, vertex.label);
        record.properties = vertex
            .properties
            .into_iter()
            .filter(|(key, _)| !labels::is_reserved(key))
            .collect();
        record.relations = edges.into_iter().map(Relation::from).collect();
        record.relations.sort();
        Ok(Some(record))
    }
}

fn group_relations(relations: &[Relation]) -> BTreeMap<(&str, LinkKind), BTreeSet<String>> {
    let mut groups: BTreeMap<(&str, LinkKind), BTreeSet<String>> = BTreeMap::new();
    for relation in relations {
        groups
            .entry((relation.source.as_str(), relation.kind))
            .or_default()
            .insert(relation.target.clone());
    }
    groups
}
