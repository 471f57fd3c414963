//! The behavior of one relation field
//!
//! A [`RelationHook`] is the create cascade, update cascade and read
//! resolver of a single relation field. Generators pick a [`Link`] per
//! participating side; the link decides which adapter calls implement
//! connect, create, disconnect, delete and the join.

use crate::cascade::{CreateCascade, CreateNext, UpdateCascade, UpdateNext, UpdateRequest};
use crate::engine::Engine;
use crate::instruction::{InstructionSite, ToManyInstruction, ToOneInstruction};
use crate::resolver::{ReadResolver, Resolved};
use async_trait::async_trait;
use futures::future::{join_all, try_join};
use serde_json::Value;
use tessera_core::{
    Cardinality, EngineError, EngineResult, EntityId, Filter, ManyToManyIndex, Record, RecordId,
    record_id, relation_value,
};
use tessera_ir::{Relation, Side};

// ============================================================================
// Link
// ============================================================================

/// How one side of a relation reaches the other side's records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// To-one; the key lives on this entity's records.
    ///
    /// `exclusive` links (one-to-one) unset the key on any other record that
    /// pointed at the same target.
    LocalKey { key: String, exclusive: bool },
    /// To-one; the key lives on the other entity's records
    ReverseKey { key: String },
    /// To-many; the key lives on the other entity's records
    ForeignKeyList { key: String },
    /// To-many; both entities keep an associative index
    Associative { index: ManyToManyIndex },
}

impl Link {
    /// Cardinality of the field using this link
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Link::LocalKey { .. } | Link::ReverseKey { .. } => Cardinality::One,
            Link::ForeignKeyList { .. } | Link::Associative { .. } => Cardinality::Many,
        }
    }
}

enum Pending {
    ToOne(ToOneInstruction),
    ToMany(ToManyInstruction),
}

// ============================================================================
// RelationHook
// ============================================================================

/// Cascades and resolver of one relation field
#[derive(Debug, Clone)]
pub struct RelationHook {
    relation: String,
    entity: EntityId,
    entity_name: String,
    field: String,
    target: EntityId,
    target_name: String,
    link: Link,
}

impl RelationHook {
    /// Build the hook of one declared side of a relation
    pub fn for_side(relation: &Relation, side: Side, link: Link) -> EngineResult<Self> {
        let end = relation.end(side);
        let other = relation.end(side.opposite());
        let field = end.field.clone().ok_or_else(|| {
            EngineError::internal(format!(
                "'{}' declares no field on the {:?} side of '{}'",
                end.entity_name, side, relation.name
            ))
        })?;
        Ok(Self {
            relation: relation.name.clone(),
            entity: end.entity,
            entity_name: end.entity_name.clone(),
            field,
            target: other.entity,
            target_name: other.entity_name.clone(),
            link,
        })
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    fn site(&self) -> InstructionSite<'_> {
        InstructionSite {
            entity: &self.entity_name,
            field: &self.field,
        }
    }

    /// Strip this field's instruction from a payload
    fn take_instruction(&self, payload: &mut Record) -> EngineResult<Option<Pending>> {
        let Some(value) = payload.remove(&self.field) else {
            return Ok(None);
        };
        Ok(match self.link.cardinality() {
            Cardinality::One => ToOneInstruction::parse(self.site(), &value)?.map(Pending::ToOne),
            Cardinality::Many => ToManyInstruction::parse(self.site(), &value)?.map(Pending::ToMany),
        })
    }

    /// Apply an instruction to the record produced by the base operation
    async fn apply(&self, engine: &Engine, record: &mut Record, pending: Pending) -> EngineResult<()> {
        let this_id =
            record_id(record).ok_or_else(|| EngineError::MissingIdentifier(self.entity_name.clone()))?;
        match pending {
            Pending::ToOne(instruction) => self.apply_to_one(engine, &this_id, record, instruction).await,
            Pending::ToMany(instruction) => self.apply_to_many(engine, &this_id, instruction).await,
        }
    }

    // ========================================================================
    // Target lookup
    // ========================================================================

    /// Resolve a unique input to a target identifier
    ///
    /// Bare identifiers are trusted as-is. Other unique inputs are looked up;
    /// a miss fails when `required`, otherwise yields `None`.
    async fn target_id(&self, engine: &Engine, filter: &Filter, required: bool) -> EngineResult<Option<RecordId>> {
        if let Some(id) = filter.only_id() {
            return Ok(Some(id));
        }

        let target = engine.schema().entity(self.target);
        if let Some(field) = filter.fields().find(|f| !target.is_unique_field(f)) {
            return Err(EngineError::instruction(
                &self.entity_name,
                &self.field,
                format!("'{}' is not a unique field of '{}'", field, target.name),
            ));
        }

        let found = engine.adapter(self.target)?.find_one(filter).await?;
        match found.as_ref().and_then(record_id) {
            Some(id) => Ok(Some(id)),
            None if required => Err(EngineError::RecordNotFound {
                entity: self.target_name.clone(),
                filter: filter.to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn require_target_id(&self, engine: &Engine, filter: &Filter) -> EngineResult<RecordId> {
        self.target_id(engine, filter, true).await?.ok_or_else(|| EngineError::RecordNotFound {
            entity: self.target_name.clone(),
            filter: filter.to_string(),
        })
    }

    /// Create a target record through its own create chain
    async fn create_target(&self, engine: &Engine, payload: Record) -> EngineResult<RecordId> {
        let created = engine.create_entity(self.target, payload).await?;
        record_id(&created).ok_or_else(|| EngineError::MissingIdentifier(self.target_name.clone()))
    }

    // ========================================================================
    // To-one
    // ========================================================================

    async fn apply_to_one(
        &self,
        engine: &Engine,
        this_id: &RecordId,
        record: &mut Record,
        instruction: ToOneInstruction,
    ) -> EngineResult<()> {
        if let Some(filter) = &instruction.connect {
            tracing::trace!("{}.{}: connect {}", self.entity_name, self.field, filter);
            let target_id = self.require_target_id(engine, filter).await?;
            self.connect_one(engine, this_id, record, &target_id).await?;
        }

        if let Some(payload) = instruction.create {
            tracing::trace!("{}.{}: create {}", self.entity_name, self.field, self.target_name);
            let target_id = self.create_target(engine, payload).await?;
            self.connect_one(engine, this_id, record, &target_id).await?;
        }

        if instruction.disconnect {
            tracing::trace!("{}.{}: disconnect", self.entity_name, self.field);
            self.disconnect_one(engine, this_id, record).await?;
        }

        if instruction.delete {
            tracing::trace!("{}.{}: delete", self.entity_name, self.field);
            self.delete_one(engine, this_id, record).await?;
        }

        Ok(())
    }

    async fn connect_one(
        &self,
        engine: &Engine,
        this_id: &RecordId,
        record: &mut Record,
        target_id: &RecordId,
    ) -> EngineResult<()> {
        match &self.link {
            Link::LocalKey { key, exclusive } => {
                let adapter = engine.adapter(self.entity)?;
                if *exclusive {
                    let holder = adapter.find_one_by_relation(key, target_id).await?;
                    if let Some(holder_id) = holder.as_ref().and_then(record_id) {
                        if &holder_id != this_id {
                            adapter.update_one_relation(&holder_id, key, None).await?;
                        }
                    }
                }
                adapter
                    .update_one_relation(this_id, key, Some(target_id.clone()))
                    .await?;
                record.insert(key.clone(), Value::String(target_id.clone()));
            }
            Link::ReverseKey { key } => {
                let adapter = engine.adapter(self.target)?;
                let previous = adapter.find_one_by_relation(key, this_id).await?;
                if let Some(previous_id) = previous.as_ref().and_then(record_id) {
                    if &previous_id != target_id {
                        adapter.update_one_relation(&previous_id, key, None).await?;
                    }
                }
                adapter
                    .update_one_relation(target_id, key, Some(this_id.clone()))
                    .await?;
            }
            _ => return Err(self.cardinality_mismatch()),
        }
        Ok(())
    }

    async fn disconnect_one(&self, engine: &Engine, this_id: &RecordId, record: &mut Record) -> EngineResult<()> {
        match &self.link {
            Link::LocalKey { key, .. } => {
                engine
                    .adapter(self.entity)?
                    .update_one_relation(this_id, key, None)
                    .await?;
                record.insert(key.clone(), Value::Null);
            }
            Link::ReverseKey { key } => {
                let adapter = engine.adapter(self.target)?;
                let linked = adapter.find_one_by_relation(key, this_id).await?;
                if let Some(linked_id) = linked.as_ref().and_then(record_id) {
                    adapter.update_one_relation(&linked_id, key, None).await?;
                }
            }
            _ => return Err(self.cardinality_mismatch()),
        }
        Ok(())
    }

    async fn delete_one(&self, engine: &Engine, this_id: &RecordId, record: &mut Record) -> EngineResult<()> {
        match &self.link {
            Link::LocalKey { key, .. } => {
                let Some(target_id) = relation_value(record, key) else {
                    return Ok(());
                };
                engine
                    .adapter(self.entity)?
                    .update_one_relation(this_id, key, None)
                    .await?;
                record.insert(key.clone(), Value::Null);
                engine
                    .adapter(self.target)?
                    .delete(&Filter::by_id(target_id))
                    .await?;
            }
            Link::ReverseKey { key } => {
                let adapter = engine.adapter(self.target)?;
                let linked = adapter.find_one_by_relation(key, this_id).await?;
                if let Some(linked_id) = linked.as_ref().and_then(record_id) {
                    adapter.delete(&Filter::by_id(linked_id)).await?;
                }
            }
            _ => return Err(self.cardinality_mismatch()),
        }
        Ok(())
    }

    // ========================================================================
    // To-many
    // ========================================================================

    async fn apply_to_many(&self, engine: &Engine, this_id: &RecordId, instruction: ToManyInstruction) -> EngineResult<()> {
        let ToManyInstruction {
            connect,
            create,
            disconnect,
            delete,
        } = instruction;

        // Each kind fans out concurrently and completes before the next starts
        if !connect.is_empty() {
            tracing::trace!("{}.{}: connect {} record(s)", self.entity_name, self.field, connect.len());
            all_ok(
                join_all(connect.iter().map(|filter| async move {
                    let target_id = self.require_target_id(engine, filter).await?;
                    self.connect_many(engine, this_id, &target_id).await
                }))
                .await,
            )?;
        }

        if !create.is_empty() {
            tracing::trace!("{}.{}: create {} record(s)", self.entity_name, self.field, create.len());
            all_ok(
                join_all(create.into_iter().map(|payload| async move {
                    let target_id = self.create_target(engine, payload).await?;
                    self.connect_many(engine, this_id, &target_id).await
                }))
                .await,
            )?;
        }

        if !disconnect.is_empty() {
            tracing::trace!("{}.{}: disconnect {} record(s)", self.entity_name, self.field, disconnect.len());
            all_ok(
                join_all(disconnect.iter().map(|filter| async move {
                    match self.target_id(engine, filter, false).await? {
                        Some(target_id) => self.disconnect_many(engine, this_id, &target_id).await,
                        None => Ok(()),
                    }
                }))
                .await,
            )?;
        }

        if !delete.is_empty() {
            tracing::trace!("{}.{}: delete {} record(s)", self.entity_name, self.field, delete.len());
            all_ok(
                join_all(delete.iter().map(|filter| async move {
                    match self.target_id(engine, filter, false).await? {
                        Some(target_id) => self.delete_many(engine, this_id, &target_id).await,
                        None => Ok(()),
                    }
                }))
                .await,
            )?;
        }

        Ok(())
    }

    async fn connect_many(&self, engine: &Engine, this_id: &RecordId, target_id: &RecordId) -> EngineResult<()> {
        match &self.link {
            Link::ForeignKeyList { key } => {
                engine
                    .adapter(self.target)?
                    .update_one_relation(target_id, key, Some(this_id.clone()))
                    .await
            }
            Link::Associative { index } => {
                let mirrored = index.mirrored();
                let this_side = engine.adapter(self.entity)?;
                let other_side = engine.adapter(self.target)?;
                try_join(
                    this_side.add_id_to_many_relation(index, this_id, target_id),
                    other_side.add_id_to_many_relation(&mirrored, target_id, this_id),
                )
                .await
                .map(|_| ())
            }
            _ => Err(self.cardinality_mismatch()),
        }
    }

    async fn disconnect_many(&self, engine: &Engine, this_id: &RecordId, target_id: &RecordId) -> EngineResult<()> {
        match &self.link {
            Link::ForeignKeyList { key } => {
                if self.is_linked(engine, this_id, target_id).await? {
                    engine
                        .adapter(self.target)?
                        .update_one_relation(target_id, key, None)
                        .await?;
                }
                Ok(())
            }
            Link::Associative { index } => {
                let mirrored = index.mirrored();
                let this_side = engine.adapter(self.entity)?;
                let other_side = engine.adapter(self.target)?;
                try_join(
                    this_side.remove_id_from_many_relation(index, this_id, target_id),
                    other_side.remove_id_from_many_relation(&mirrored, target_id, this_id),
                )
                .await
                .map(|_| ())
            }
            _ => Err(self.cardinality_mismatch()),
        }
    }

    /// Unlink and destroy a record, if it is linked to this one
    async fn delete_many(&self, engine: &Engine, this_id: &RecordId, target_id: &RecordId) -> EngineResult<()> {
        if !self.is_linked(engine, this_id, target_id).await? {
            return Ok(());
        }
        if let Link::Associative { .. } = &self.link {
            self.disconnect_many(engine, this_id, target_id).await?;
        }
        engine
            .adapter(self.target)?
            .delete(&Filter::by_id(target_id.clone()))
            .await
    }

    async fn is_linked(&self, engine: &Engine, this_id: &RecordId, target_id: &RecordId) -> EngineResult<bool> {
        match &self.link {
            Link::ForeignKeyList { key } => {
                let target = engine.adapter(self.target)?.find_one_by_id(target_id).await?;
                Ok(target
                    .as_ref()
                    .and_then(|record| relation_value(record, key))
                    .is_some_and(|linked| &linked == this_id))
            }
            Link::Associative { index } => {
                let ids = engine
                    .adapter(self.entity)?
                    .find_ids_from_many_relation(index, this_id)
                    .await?;
                Ok(ids.contains(target_id))
            }
            _ => Err(self.cardinality_mismatch()),
        }
    }

    fn cardinality_mismatch(&self) -> EngineError {
        EngineError::internal(format!(
            "link of '{}.{}' does not match its cardinality",
            self.entity_name, self.field
        ))
    }
}

/// Surface the first error of a fan-out, after every operation completed
fn all_ok(results: Vec<EngineResult<()>>) -> EngineResult<()> {
    results.into_iter().collect()
}

// ============================================================================
// Trait Implementations
// ============================================================================

#[async_trait]
impl CreateCascade for RelationHook {
    fn field(&self) -> &str {
        &self.field
    }

    async fn create<'a>(&'a self, mut payload: Record, next: CreateNext<'a>) -> EngineResult<Record> {
        let Some(pending) = self.take_instruction(&mut payload)? else {
            return next.run(payload).await;
        };
        let engine = next.engine();
        let mut record = next.run(payload).await?;
        self.apply(engine, &mut record, pending).await?;
        Ok(record)
    }
}

#[async_trait]
impl UpdateCascade for RelationHook {
    fn field(&self) -> &str {
        &self.field
    }

    async fn update<'a>(&'a self, mut request: UpdateRequest, next: UpdateNext<'a>) -> EngineResult<Record> {
        let Some(pending) = self.take_instruction(&mut request.payload)? else {
            return next.run(request).await;
        };
        let engine = next.engine();
        let mut record = next.run(request).await?;
        self.apply(engine, &mut record, pending).await?;
        Ok(record)
    }
}

#[async_trait]
impl ReadResolver for RelationHook {
    fn field(&self) -> &str {
        &self.field
    }

    async fn resolve(&self, engine: &Engine, parent: &Record) -> EngineResult<Resolved> {
        if let Link::LocalKey { key, .. } = &self.link {
            let Some(target_id) = relation_value(parent, key) else {
                return Ok(Resolved::One(None));
            };
            let target = engine.adapter(self.target)?.find_one_by_id(&target_id).await?;
            return Ok(Resolved::One(target));
        }

        let this_id =
            record_id(parent).ok_or_else(|| EngineError::MissingIdentifier(self.entity_name.clone()))?;
        match &self.link {
            Link::ReverseKey { key } => {
                let linked = engine
                    .adapter(self.target)?
                    .find_one_by_relation(key, &this_id)
                    .await?;
                Ok(Resolved::One(linked))
            }
            Link::ForeignKeyList { key } => {
                let linked = engine
                    .adapter(self.target)?
                    .find_many_from_one_relation(key, &this_id)
                    .await?;
                Ok(Resolved::Many(linked))
            }
            Link::Associative { index } => {
                let ids = engine
                    .adapter(self.entity)?
                    .find_ids_from_many_relation(index, &this_id)
                    .await?;
                let other_side = engine.adapter(self.target)?;
                let fetched = join_all(ids.iter().map(|id| other_side.find_one_by_id(id))).await;

                // Stale index entries resolve to nothing and are skipped
                let mut records = Vec::with_capacity(fetched.len());
                for record in fetched {
                    if let Some(record) = record? {
                        records.push(record);
                    }
                }
                Ok(Resolved::Many(records))
            }
            Link::LocalKey { .. } => Err(self.cardinality_mismatch()),
        }
    }
}
