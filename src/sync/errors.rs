use thiserror::Error;

use crate::import::MutationError;
use crate::record::{DecodeError, SourceError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to fetch `{id}`: {source}")]
    Source {
        id: String,
        #[source]
        source: SourceError,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

impl SyncError {
    /// Identifier of the resource that failed.
    pub fn id(&self) -> &str {
        match self {
            SyncError::Source { id, .. } => id,
            SyncError::Decode(e) => e.id(),
            SyncError::Mutation(e) => &e.id,
        }
    }
}
