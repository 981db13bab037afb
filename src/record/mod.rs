//! Wide-row resource records.
//!
//! A record is what one row of the object store says about one resource:
//! its type, its flattened properties and the relations it declares.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{LinkKind, PropertyBag, PropertyValue};

pub mod decoder;
mod errors;
pub mod source;

pub use decoder::{decode_record, DecodePolicy};
pub use errors::{DecodeError, SourceError, UnknownDecodePolicy};
pub use source::{JsonDumpSource, RowSource};

/// Columns of one row: column name → raw stored value (JSON text).
pub type ColumnSet = BTreeMap<String, String>;

/// A directed relation between two resources, by identifier only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
}

impl Relation {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: LinkKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRecord {
    pub id: String,
    pub resource_type: String,
    pub properties: PropertyBag,
    pub relations: Vec<Relation>,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            properties: PropertyBag::new(),
            relations: Vec::new(),
        }
    }

    pub fn with_property(mut self, path: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(path.into(), value);
        self
    }

    /// Add a relation declared by this record (`self -kind-> target`).
    pub fn with_relation(mut self, kind: LinkKind, target: impl Into<String>) -> Self {
        let relation = Relation::new(self.id.clone(), target, kind);
        self.relations.push(relation);
        self
    }

    /// Relation kinds present in the record, deduplicated.
    pub fn link_kinds(&self) -> Vec<LinkKind> {
        let mut kinds: Vec<LinkKind> = self.relations.iter().map(|r| r.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Order-insensitive comparison of the relation sets; properties are
    /// compared as stored (lists keep their declared order).
    pub fn equivalent_to(&self, other: &ResourceRecord) -> bool {
        let mut mine = self.relations.clone();
        let mut theirs = other.relations.clone();
        mine.sort();
        mine.dedup();
        theirs.sort();
        theirs.dedup();
        self.id == other.id
            && self.resource_type == other.resource_type
            && self.properties == other.properties
            && mine == theirs
    }
}
