use thiserror::Error;

/// Errors raised by the audit engine and its host document
#[derive(Debug, Error)]
pub enum AuditError {
    /// Selector text could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A node id does not refer to a live node
    #[error("Node not found: {0}")]
    NodeNotFound(usize),

    /// A tree mutation that would corrupt the document
    #[error("Invalid tree operation: {0}")]
    InvalidOperation(String),

    /// Snapshot input (JSON or HTML) could not be turned into a document
    #[error("Failed to parse document snapshot: {0}")]
    SnapshotParse(String),

    /// No checker is registered under the requested rule id
    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Live browser capture failed
    #[error("Browser capture failed: {0}")]
    Browser(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AuditError>;
