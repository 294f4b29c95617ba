//! Error types for a3s-auditlog

use thiserror::Error;

/// Errors that can occur in the audit log pipeline
#[derive(Debug, Error)]
pub enum AuditLogError {
    /// Event source failure (subscription closed, gateway unavailable)
    #[error("Event source error: {0}")]
    Source(String),

    /// Audit trail query failure
    #[error("Audit log query failed for '{event_type}': {reason}")]
    AuditQuery {
        event_type: String,
        reason: String,
    },

    /// Sending a notification to the output channel failed
    #[error("Failed to deliver notification to channel {channel_id}: {reason}")]
    Delivery {
        channel_id: u64,
        reason: String,
    },

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure (reading thumbnail media)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type alias for audit log operations
pub type Result<T> = std::result::Result<T, AuditLogError>;
