//! # Tessera IR (Intermediate Representation)
//!
//! This crate holds the schema model and the relation classifier.
//!
//! ## Core Concepts
//!
//! - **Entity**: A model of the schema (e.g., User, Post) with ordered fields
//! - **Field**: A scalar, enum, nested-object or relation property
//! - **Schema**: The immutable set of entities, built in two phases so
//!   relation fields may reference entities declared later
//! - **Relation**: A typed, named link between two entities derived by
//!   [`classify`], with the entity that stores the key
//!

// Module declarations
pub mod classifier;
pub mod entity;
pub mod field;
pub mod naming;
pub mod relation;
pub mod schema;
pub mod serialization;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types at crate root
pub use classifier::{ClassifierOptions, CollisionPolicy, NameReusePolicy, classify};
pub use entity::Entity;
pub use field::{EntityRef, Field, FieldKind, RelationConfig, RelationField};
pub use naming::{EntityNames, foreign_key_name, generate_relation_name, pluralize};
pub use relation::{Classification, Relation, RelationEnd, RelationStorage, Side};
pub use schema::{AdapterFactory, Schema, SchemaBuilder};
pub use serialization::{
    EntityDecl, FieldDecl, SchemaDocument, load_schema, load_schema_from_str,
    load_schema_from_toml,
};
pub use validation::{
    Issue, IssueCode, ValidationErrorCode, ValidationResult, ValidationRule, ValidationWarningCode,
    Validator,
};

// Re-export core types that are commonly used with IR
pub use tessera_core::{
    Cardinality, EngineError, EngineResult, EntityId, RelationType, ScalarType,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient re-exports for common usage
pub mod prelude {
    pub use crate::{
        Cardinality,
        Classification,
        ClassifierOptions,
        EngineError,
        EngineResult,
        // Core types
        Entity,
        Field,
        Relation,
        RelationType,
        ScalarType,
        Schema,
        Side,
        classify,
        load_schema,
    };
}
