use thiserror::Error;

/// A property value that could not be turned into a graph property.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Invalid value for property `{path}`: {reason}")]
pub struct PropertyError {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("Unknown relation kind `{0}` (expected ref, parent or back_ref)")]
    UnknownLinkKind(String),
    #[error("No listing catalog registered for resource `{0}`")]
    UnknownResource(String),
}
