//! Core error types for factweave.

use thiserror::Error;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid encoding
    #[error("Invalid encoding: {reason}")]
    InvalidEncoding {
        /// What the decoder rejected
        reason: String,
    },

    /// Invalid fact reference
    #[error("Invalid fact reference: {reason}")]
    InvalidReference {
        /// Why the reference was rejected
        reason: String,
    },

    /// Fact type registered twice
    #[error("Fact type already exists: {name}")]
    DuplicateFactType {
        /// Fact type name
        name: String,
    },

    /// Role registered twice on the same fact type
    #[error("Role {role} already exists on fact type {fact_type}")]
    DuplicateRole {
        /// Declaring fact type
        fact_type: String,
        /// Role name
        role: String,
    },

    /// Fact type missing from the catalog
    #[error("Fact type not found: {name}")]
    UnknownFactType {
        /// Fact type name
        name: String,
    },
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidEncoding {
            reason: err.to_string(),
        }
    }
}
