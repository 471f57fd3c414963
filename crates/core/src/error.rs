//! Error types for Tessera
//!
//! This module provides unified error handling across the engine. Errors fall
//! into two families with very different lifetimes:
//!
//! - **Schema-build errors** are raised once while a schema is bound and stop
//!   the engine from ever serving requests.
//! - **Per-request errors** surface from a single create/update/delete/read
//!   call and never touch the (immutable) bound schema.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Tessera
#[derive(Debug, Error)]
pub enum EngineError {
    // ========================================================================
    // Schema-build Errors
    // ========================================================================
    /// A relation field or adapter binding references an entity that was never declared
    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    /// Duplicate entity name
    #[error("Duplicate entity name: '{0}' already exists")]
    DuplicateEntity(String),

    /// Duplicate field name
    #[error("Duplicate field name: '{field}' already exists in entity '{entity}'")]
    DuplicateField { entity: String, field: String },

    /// An entity has no unique field usable as a unique-filter input
    #[error("Entity '{entity}' has no unique field '{field}'")]
    MissingUniqueField { entity: String, field: String },

    /// An entity was bound without a storage adapter
    #[error("Entity '{0}' has no storage adapter")]
    MissingAdapter(String),

    /// A relation needs an adapter capability the entity's adapter does not declare
    #[error("Relation '{relation}' requires the {capability} capability on '{entity}'")]
    MissingCapability {
        relation: String,
        entity: String,
        capability: String,
    },

    /// Two sides sharing a relation name do not point at each other
    #[error("Relation '{relation}' is not reciprocal: {message}")]
    RelationMismatch { relation: String, message: String },

    /// More than two fields reuse the same explicit relation name
    #[error("Relation name '{relation}' is used by more than two fields (third use on '{entity}.{field}')")]
    AmbiguousRelationName {
        relation: String,
        entity: String,
        field: String,
    },

    /// Two relations ended up with the same name
    #[error("Duplicate relation name '{0}'")]
    DuplicateRelationName(String),

    /// Two relations would store their foreign key in the same field
    #[error("Relations '{first}' and '{second}' both store their key in '{entity}.{key}'")]
    DuplicateForeignKey {
        entity: String,
        key: String,
        first: String,
        second: String,
    },

    /// The two sides of a one-to-one relation disagree about the owning side
    #[error("Relation '{relation}' has conflicting owner configuration: {message}")]
    ConflictingOwner { relation: String, message: String },

    /// Two relations registered a read resolver for the same field
    #[error("Duplicate resolver for '{entity}.{field}'")]
    DuplicateResolver { entity: String, field: String },

    /// General schema validation error
    #[error("Schema validation error: {0}")]
    Validation(String),

    // ========================================================================
    // Per-request Errors
    // ========================================================================
    /// A nested relation instruction could not be interpreted
    #[error("Invalid instruction for '{entity}.{field}': {message}")]
    InvalidInstruction {
        entity: String,
        field: String,
        message: String,
    },

    /// No record matched a filter that had to match
    #[error("No '{entity}' record matches {filter}")]
    RecordNotFound { entity: String, filter: String },

    /// A record is missing its identifier
    #[error("Record of '{0}' has no identifier")]
    MissingIdentifier(String),

    /// No field resolver is registered under the requested name
    #[error("Field '{field}' of '{entity}' has no resolver")]
    UnknownField { entity: String, field: String },

    /// An adapter was asked for an operation it does not implement
    #[error("Adapter for '{entity}' does not support {capability}")]
    UnsupportedCapability { entity: String, capability: String },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Error raised by a storage adapter, propagated unchanged
    #[error("Storage error in '{entity}': {message}")]
    Storage { entity: String, message: String },

    // ========================================================================
    // Serialization / IO Errors
    // ========================================================================
    /// File IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File read error
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// Invalid schema or configuration document
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl EngineError {
    /// Create a schema validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    /// Create an invalid-instruction error
    pub fn instruction(
        entity: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        EngineError::InvalidInstruction {
            entity: entity.into(),
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a storage error
    pub fn storage(entity: impl Into<String>, msg: impl Into<String>) -> Self {
        EngineError::Storage {
            entity: entity.into(),
            message: msg.into(),
        }
    }

    /// Create an unsupported-capability error
    pub fn unsupported(entity: impl Into<String>, capability: impl Into<String>) -> Self {
        EngineError::UnsupportedCapability {
            entity: entity.into(),
            capability: capability.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        EngineError::Internal(msg.into())
    }

    /// Create an error with context
    pub fn with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Check if this error can only happen while a schema is being bound
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownEntity(_)
                | EngineError::DuplicateEntity(_)
                | EngineError::DuplicateField { .. }
                | EngineError::MissingUniqueField { .. }
                | EngineError::MissingAdapter(_)
                | EngineError::MissingCapability { .. }
                | EngineError::RelationMismatch { .. }
                | EngineError::AmbiguousRelationName { .. }
                | EngineError::DuplicateRelationName(_)
                | EngineError::DuplicateForeignKey { .. }
                | EngineError::ConflictingOwner { .. }
                | EngineError::DuplicateResolver { .. }
                | EngineError::Validation(_)
        )
    }

    /// Check if this error belongs to a single request
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidInstruction { .. }
                | EngineError::RecordNotFound { .. }
                | EngineError::MissingIdentifier(_)
                | EngineError::UnknownField { .. }
                | EngineError::UnsupportedCapability { .. }
                | EngineError::Storage { .. }
        )
    }

    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownEntity(_)
                | EngineError::RecordNotFound { .. }
                | EngineError::UnknownField { .. }
        )
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> EngineResult<T>;
}

impl<T, E: Into<EngineError>> ResultExt<T> for Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> EngineResult<T> {
        self.map_err(|e| {
            let err: EngineError = e.into();
            EngineError::WithContext {
                context: context.into(),
                message: err.to_string(),
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_schema_errors() {
        let err = EngineError::UnknownEntity("Author".to_string());
        assert!(err.is_schema_error());
        assert!(!err.is_request_error());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Unknown entity 'Author'");
    }

    #[test]
    fn test_ambiguous_relation_name() {
        let err = EngineError::AmbiguousRelationName {
            relation: "Authorship".to_string(),
            entity: "Post".to_string(),
            field: "editor".to_string(),
        };
        assert!(err.is_schema_error());
        assert_eq!(
            err.to_string(),
            "Relation name 'Authorship' is used by more than two fields (third use on 'Post.editor')"
        );
    }

    #[test]
    fn test_instruction_error() {
        let err = EngineError::instruction("Team", "players", "expected a list");
        assert!(err.is_request_error());
        assert!(!err.is_schema_error());
        assert_eq!(
            err.to_string(),
            "Invalid instruction for 'Team.players': expected a list"
        );
    }

    #[test]
    fn test_storage_error() {
        let err = EngineError::storage("User", "connection reset");
        assert!(err.is_request_error());
        assert_eq!(err.to_string(), "Storage error in 'User': connection reset");
    }

    #[test]
    fn test_error_with_context() {
        let err = EngineError::with_context("Loading schema", "Permission denied");
        assert_eq!(err.to_string(), "Loading schema: Permission denied");
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result.with_context("Reading config").unwrap_err();
        assert_eq!(err.to_string(), "Reading config: IO error: missing");
    }
}
