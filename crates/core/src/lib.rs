//! # Tessera Core
//!
//! Core types, traits, and error handling for Tessera.
//!
//! This crate provides the foundational building blocks used throughout
//! the Tessera workspace, including:
//!
//! - **Types**: Records, filters, pagination, cardinalities and relation types
//! - **Adapter**: The capability-based `StorageAdapter` contract
//! - **Traits**: Common behaviors like `Validatable` and `Named`
//! - **Errors**: Unified error handling with `EngineError` and `EngineResult`
//!

pub mod adapter;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use adapter::{StorageAdapter, relation_value};
pub use error::{EngineError, EngineResult, ResultExt};
pub use traits::{Named, Validatable};
pub use types::{
    Capabilities, Capability, Cardinality, EntityId, Filter, ID_FIELD, ManyToManyIndex, OrderBy,
    Page, Pagination, Record, RecordId, RelationType, ScalarType, SortDirection, id_from_value,
    record_id,
};

/// Re-exported so adapter implementations share one JSON value type
pub use serde_json::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
