use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Failed to connect to Gremlin server {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("Gremlin transport error: {0}")]
    Transport(String),
    #[error("Gremlin server closed the connection")]
    Closed,
    #[error("Gremlin server error {code}: {message}")]
    Server { code: u16, message: String },
    #[error("Malformed Gremlin response: {0}")]
    MalformedResponse(String),
    #[error("No Gremlin server configured")]
    NoServer,
}

impl ExecutionError {
    /// Whether the connection that produced this error must be discarded.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ExecutionError::Transport(_) | ExecutionError::Closed)
    }
}
