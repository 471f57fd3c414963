//! In-memory storage adapter
//!
//! Records live in insertion order behind a `tokio::sync::RwLock`. Each
//! many-to-many index is a map from a record id to the ids it links to, with
//! set semantics: adding an existing link and removing a missing one are
//! both no-ops.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tessera_core::{
    Capabilities, Capability, EngineError, EngineResult, Filter, ID_FIELD, ManyToManyIndex,
    OrderBy, Page, Pagination, Record, RecordId, SortDirection, StorageAdapter, record_id,
    relation_value,
};
use tokio::sync::RwLock;
use uuid::Uuid;

type LinkTable = HashMap<RecordId, Vec<RecordId>>;

/// Storage adapter keeping one entity's records in memory
#[derive(Debug)]
pub struct MemoryAdapter {
    name: String,
    capabilities: Capabilities,
    records: RwLock<Vec<Record>>,
    links: RwLock<HashMap<ManyToManyIndex, LinkTable>>,
}

impl MemoryAdapter {
    /// Create an empty adapter declaring every capability
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Capabilities::ALL,
            records: RwLock::new(Vec::new()),
            links: RwLock::new(HashMap::new()),
        }
    }

    /// Restrict the declared capabilities
    ///
    /// Operations of undeclared groups fail with `UnsupportedCapability`.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Seed the adapter with records (ids are generated where missing)
    pub fn with_records(self, records: impl IntoIterator<Item = Record>) -> Self {
        let seeded = records.into_iter().map(with_id).collect();
        Self {
            records: RwLock::new(seeded),
            ..self
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn require(&self, capability: Capability, operation: &str) -> EngineResult<()> {
        if self.capabilities.supports(capability) {
            Ok(())
        } else {
            Err(EngineError::unsupported(&self.name, operation))
        }
    }

    fn not_found(&self, id: &RecordId) -> EngineError {
        EngineError::RecordNotFound {
            entity: self.name.clone(),
            filter: Filter::by_id(id.clone()).to_string(),
        }
    }
}

/// Give a record a fresh identifier unless it already has one
fn with_id(mut record: Record) -> Record {
    if record_id(&record).is_none() {
        record.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    record
}

fn has_id(record: &Record, id: &RecordId) -> bool {
    record_id(record).as_ref() == Some(id)
}

/// Total order over JSON values: null, booleans, numbers, strings, then the rest by text
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    // ========================================================================
    // Required operations
    // ========================================================================

    async fn find(
        &self,
        filter: &Filter,
        pagination: Pagination,
        order_by: Option<&OrderBy>,
    ) -> EngineResult<Page> {
        let records = self.records.read().await;
        let mut matching: Vec<Record> = records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();

        if let Some(order) = order_by {
            matching.sort_by(|a, b| {
                let a = a.get(&order.field).unwrap_or(&Value::Null);
                let b = b.get(&order.field).unwrap_or(&Value::Null);
                match order.direction {
                    SortDirection::Asc => compare_values(a, b),
                    SortDirection::Desc => compare_values(b, a),
                }
            });
        }

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(pagination.offset)
            .take(pagination.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(Page { items, total })
    }

    async fn find_one(&self, filter: &Filter) -> EngineResult<Option<Record>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| filter.matches(record)).cloned())
    }

    async fn find_one_by_id(&self, id: &RecordId) -> EngineResult<Option<Record>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| has_id(record, id)).cloned())
    }

    async fn create(&self, payload: Record) -> EngineResult<Record> {
        let record = with_id(payload);
        let id = record_id(&record).unwrap_or_default();

        let mut records = self.records.write().await;
        if records.iter().any(|existing| has_id(existing, &id)) {
            return Err(EngineError::storage(
                &self.name,
                format!("a record with id '{}' already exists", id),
            ));
        }
        records.push(record.clone());
        tracing::trace!("{}: created record {}", self.name, id);
        Ok(record)
    }

    async fn update(&self, filter: &Filter, payload: Record) -> EngineResult<()> {
        let mut records = self.records.write().await;
        for record in records.iter_mut().filter(|record| filter.matches(record)) {
            for (key, value) in &payload {
                record.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, filter: &Filter) -> EngineResult<()> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| !filter.matches(record));
        tracing::trace!("{}: deleted {} record(s)", self.name, before - records.len());
        Ok(())
    }

    // ========================================================================
    // To-one relation capability
    // ========================================================================

    async fn find_one_by_relation(&self, key: &str, value: &RecordId) -> EngineResult<Option<Record>> {
        self.require(Capability::ToOne, "find_one_by_relation")?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| relation_value(record, key).as_ref() == Some(value))
            .cloned())
    }

    async fn update_one_relation(
        &self,
        id: &RecordId,
        key: &str,
        value: Option<RecordId>,
    ) -> EngineResult<()> {
        self.require(Capability::ToOne, "update_one_relation")?;
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| has_id(record, id))
            .ok_or_else(|| self.not_found(id))?;
        record.insert(key.to_string(), value.map_or(Value::Null, Value::String));
        Ok(())
    }

    // ========================================================================
    // One-to-many relation capability
    // ========================================================================

    async fn find_many_from_one_relation(
        &self,
        key: &str,
        value: &RecordId,
    ) -> EngineResult<Vec<Record>> {
        self.require(Capability::OneToMany, "find_many_from_one_relation")?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| relation_value(record, key).as_ref() == Some(value))
            .cloned()
            .collect())
    }

    // ========================================================================
    // Many-to-many relation capability
    // ========================================================================

    async fn find_ids_from_many_relation(
        &self,
        index: &ManyToManyIndex,
        this_id: &RecordId,
    ) -> EngineResult<Vec<RecordId>> {
        self.require(Capability::ManyToMany, "find_ids_from_many_relation")?;
        let links = self.links.read().await;
        Ok(links
            .get(index)
            .and_then(|table| table.get(this_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_id_to_many_relation(
        &self,
        index: &ManyToManyIndex,
        this_id: &RecordId,
        other_id: &RecordId,
    ) -> EngineResult<()> {
        self.require(Capability::ManyToMany, "add_id_to_many_relation")?;
        let mut links = self.links.write().await;
        let linked = links
            .entry(index.clone())
            .or_default()
            .entry(this_id.clone())
            .or_default();
        if !linked.contains(other_id) {
            linked.push(other_id.clone());
        }
        Ok(())
    }

    async fn remove_id_from_many_relation(
        &self,
        index: &ManyToManyIndex,
        this_id: &RecordId,
        other_id: &RecordId,
    ) -> EngineResult<()> {
        self.require(Capability::ManyToMany, "remove_id_from_many_relation")?;
        let mut links = self.links.write().await;
        if let Some(linked) = links.get_mut(index).and_then(|table| table.get_mut(this_id)) {
            linked.retain(|id| id != other_id);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
