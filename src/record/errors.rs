use thiserror::Error;

use crate::schema::PropertyError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error("Resource `{id}` has no `type` column")]
    MissingType { id: String },
    #[error("Resource `{id}` has an invalid `type` column: {reason}")]
    InvalidType { id: String, reason: String },
    #[error("Resource `{id}`: {source}")]
    Property {
        id: String,
        #[source]
        source: PropertyError,
    },
    #[error("Resource `{id}`: malformed relation column `{column}`")]
    Relation { id: String, column: String },
}

impl DecodeError {
    pub fn id(&self) -> &str {
        match self {
            DecodeError::MissingType { id }
            | DecodeError::InvalidType { id, .. }
            | DecodeError::Property { id, .. }
            | DecodeError::Relation { id, .. } => id,
        }
    }

    /// Property path or column the failure is attributed to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            DecodeError::MissingType { .. } | DecodeError::InvalidType { .. } => Some("type"),
            DecodeError::Property { source, .. } => Some(&source.path),
            DecodeError::Relation { column, .. } => Some(column),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Unknown decode policy `{0}` (expected strict or lenient)")]
pub struct UnknownDecodePolicy(pub String);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Resource `{0}` not found in the row source")]
    NotFound(String),
    #[error("Failed to read row source: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse row dump: {0}")]
    Parse(#[from] serde_json::Error),
}
