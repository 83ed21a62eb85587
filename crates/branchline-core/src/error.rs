//! Error types for Branchline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Branchline workspace.
///
/// The first four variants form the error taxonomy of the overlay and fork
/// engine; the rest cover the storage and configuration layers.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum BranchlineError {
    /// Cyclic or unresolvable parent references in a conversation tree.
    #[error("Malformed conversation tree: {message}")]
    MalformedTree {
        message: String,
        /// Message id at which the problem was detected
        message_id: Option<String>,
    },

    /// A remote call failed at the transport level or returned non-success.
    #[error("Network error{}: {message}", status_suffix(.status))]
    Network { status: Option<u16>, message: String },

    /// The remote service answered with an unexpected shape.
    #[error("Unexpected response shape: {0}")]
    Parse(String),

    /// The remote service rejected a current-leaf update.
    #[error("Navigation failed for conversation '{conversation_id}': {reason}")]
    NavigationFailed {
        conversation_id: String,
        reason: String,
    },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Local store access error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller aborted the operation
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BranchlineError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a MalformedTree error
    pub fn malformed_tree(message: impl Into<String>, message_id: Option<&str>) -> Self {
        Self::MalformedTree {
            message: message.into(),
            message_id: message_id.map(str::to_string),
        }
    }

    /// Creates a Network error
    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Network {
            status,
            message: message.into(),
        }
    }

    /// Creates a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Creates a NavigationFailed error
    pub fn navigation_failed(conversation_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NavigationFailed {
            conversation_id: conversation_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a MalformedTree error
    pub fn is_malformed_tree(&self) -> bool {
        matches!(self, Self::MalformedTree { .. })
    }

    /// Check if this is a network failure.
    ///
    /// Parse errors count as network failures: an unexpected response shape
    /// is handled exactly like a failed call.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Parse(_))
    }

    /// Check if this is a NavigationFailed error
    pub fn is_navigation_failed(&self) -> bool {
        matches!(self, Self::NavigationFailed { .. })
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Cancelled error
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// HTTP status attached to a network error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for BranchlineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for BranchlineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for BranchlineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for BranchlineError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// A type alias for `Result<T, BranchlineError>`.
pub type Result<T> = std::result::Result<T, BranchlineError>;
