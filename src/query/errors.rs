use thiserror::Error;

use crate::client::ExecutionError;

/// Non-fatal findings of a compilation. The offending key, field or value is
/// dropped and compilation goes on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileWarning {
    #[error("No implementation for filter {key}={values}")]
    UnsupportedFilterKey { key: String, values: String },
    #[error("No implementation for field {0}")]
    UnsupportedField(String),
    #[error("Malformed value `{value}` for composite filter {key} (expected subkey{separator}value)")]
    MalformedCompositeValue {
        key: String,
        value: String,
        separator: char,
    },
    #[error("Filter {0} has no value")]
    EmptyFilter(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("Unexpected result row: {0}")]
    MalformedRow(String),
}
