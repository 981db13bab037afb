use thiserror::Error;

use crate::client::ExecutionError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("Cannot link `{from}` to `{to}`: endpoint vertex does not exist")]
    MissingEndpoint { from: String, to: String },
    #[error("Vertex `{id}` already exists with label `{existing}`, cannot store it as `{requested}`")]
    LabelConflict {
        id: String,
        existing: String,
        requested: String,
    },
    #[error("Unexpected graph store result: {0}")]
    MalformedResult(String),
}

/// A failed vertex or edge write, attributed to the resource being imported.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Import of `{id}` failed: {source}")]
pub struct MutationError {
    pub id: String,
    #[source]
    pub source: StoreError,
}

impl MutationError {
    pub fn new(id: impl Into<String>, source: StoreError) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}
