//! Storage adapter contract
//!
//! Every entity is backed by one [`StorageAdapter`]. The required CRUD
//! operations must always be implemented; the relation operations are grouped
//! into optional capabilities. An adapter declares which groups it supports
//! through [`StorageAdapter::capabilities`], which the engine queries once
//! while binding a schema. Relation operations an adapter does not support
//! keep their default bodies and fail with
//! [`EngineError::UnsupportedCapability`].
//!
//! Adapters own all mutable state. Implementations must serialize their own
//! internal mutations; the engine calls into them concurrently.

use crate::error::{EngineError, EngineResult};
use crate::types::{Capabilities, Filter, ManyToManyIndex, OrderBy, Page, Pagination, Record, RecordId};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

#[async_trait]
pub trait StorageAdapter: Send + Sync + Debug {
    /// Name used in error messages (usually the entity name)
    fn name(&self) -> &str;

    /// Optional operation groups this adapter implements
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    // ========================================================================
    // Required operations
    // ========================================================================

    /// Find a page of records matching a filter
    async fn find(
        &self,
        filter: &Filter,
        pagination: Pagination,
        order_by: Option<&OrderBy>,
    ) -> EngineResult<Page>;

    /// Find the first record matching a filter
    async fn find_one(&self, filter: &Filter) -> EngineResult<Option<Record>>;

    /// Find a record by identifier
    async fn find_one_by_id(&self, id: &RecordId) -> EngineResult<Option<Record>>;

    /// Store a new record and return it with its identifier
    async fn create(&self, payload: Record) -> EngineResult<Record>;

    /// Merge a payload into every record matching a filter
    async fn update(&self, filter: &Filter, payload: Record) -> EngineResult<()>;

    /// Remove every record matching a filter
    async fn delete(&self, filter: &Filter) -> EngineResult<()>;

    // ========================================================================
    // To-one relation capability
    // ========================================================================

    /// Find the record whose `key` equals `value`
    async fn find_one_by_relation(&self, key: &str, value: &RecordId) -> EngineResult<Option<Record>> {
        let _ = (key, value);
        Err(EngineError::unsupported(self.name(), "find_one_by_relation"))
    }

    /// Set (or clear, with `None`) the relation `key` of one record
    async fn update_one_relation(
        &self,
        id: &RecordId,
        key: &str,
        value: Option<RecordId>,
    ) -> EngineResult<()> {
        let _ = (id, key, value);
        Err(EngineError::unsupported(self.name(), "update_one_relation"))
    }

    // ========================================================================
    // One-to-many relation capability
    // ========================================================================

    /// Find every record whose `key` equals `value`
    async fn find_many_from_one_relation(
        &self,
        key: &str,
        value: &RecordId,
    ) -> EngineResult<Vec<Record>> {
        let _ = (key, value);
        Err(EngineError::unsupported(self.name(), "find_many_from_one_relation"))
    }

    // ========================================================================
    // Many-to-many relation capability
    // ========================================================================

    /// Identifiers linked to `this_id` in this side's associative index
    ///
    /// Returns identifiers, not records: the linked records belong to the
    /// other entity, which this adapter does not store. The engine loads
    /// them through the other entity's adapter and skips ids that no longer
    /// resolve.
    async fn find_ids_from_many_relation(
        &self,
        index: &ManyToManyIndex,
        this_id: &RecordId,
    ) -> EngineResult<Vec<RecordId>> {
        let _ = (index, this_id);
        Err(EngineError::unsupported(self.name(), "find_ids_from_many_relation"))
    }

    /// Link `other_id` to `this_id` in this side's associative index
    async fn add_id_to_many_relation(
        &self,
        index: &ManyToManyIndex,
        this_id: &RecordId,
        other_id: &RecordId,
    ) -> EngineResult<()> {
        let _ = (index, this_id, other_id);
        Err(EngineError::unsupported(self.name(), "add_id_to_many_relation"))
    }

    /// Unlink `other_id` from `this_id`; unlinking a missing entry is a no-op
    async fn remove_id_from_many_relation(
        &self,
        index: &ManyToManyIndex,
        this_id: &RecordId,
        other_id: &RecordId,
    ) -> EngineResult<()> {
        let _ = (index, this_id, other_id);
        Err(EngineError::unsupported(self.name(), "remove_id_from_many_relation"))
    }
}

/// Read a relation key from a record as an identifier
///
/// Missing keys and explicit nulls both mean "not linked".
pub fn relation_value(record: &Record, key: &str) -> Option<RecordId> {
    match record.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => crate::types::id_from_value(value),
    }
}

// ============================================================================
// Tests
// ============================================================================
