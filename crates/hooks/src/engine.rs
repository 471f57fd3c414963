//! # Bound Engine
//!
//! [`Engine::bind`] runs the whole relation pipeline once:
//!
//! ```text
//! Schema ──► classify ──► Relation[] ──► generate ──► BehaviorBundle[]
//!                                                         │
//!                                  EntityHandlers[] ◄── merge
//! ```
//!
//! The resulting engine is immutable and may be shared across concurrent
//! requests; all mutable state lives in the storage adapters.

use crate::bundle::BehaviorBundle;
use crate::cascade::{CreateNext, UpdateNext, UpdateRequest};
use crate::config::EngineConfig;
use crate::generators::{self, GeneratorContext};
use crate::pipeline::{EntityHandlers, HookPipeline};
use crate::resolver::Resolved;
use futures::future::BoxFuture;
use std::sync::Arc;
use tessera_core::{
    EngineError, EngineResult, EntityId, Filter, OrderBy, Page, Pagination, Record, StorageAdapter,
    record_id,
};
use tessera_ir::{Classification, Relation, Schema, classify};

/// A schema bound to its storage adapters and merged relation handlers
#[derive(Debug)]
pub struct Engine {
    schema: Schema,
    config: EngineConfig,
    classification: Classification,
    handlers: Vec<EntityHandlers>,
}

impl Engine {
    /// Classify, generate and merge the handlers of every relation
    pub fn bind(schema: Schema, config: EngineConfig) -> EngineResult<Self> {
        Self::bind_with_bundles(schema, config, Vec::new())
    }

    /// Bind, then register `extra` bundles after the generated ones
    pub fn bind_with_bundles(
        schema: Schema,
        config: EngineConfig,
        extra: Vec<BehaviorBundle>,
    ) -> EngineResult<Self> {
        let ctx = GeneratorContext::from_schema(&schema)?;
        let classification = classify(&schema, &config.classifier)?;

        let mut pipeline = HookPipeline::new(&schema, config.resolver_collision);
        for relation in classification.relations() {
            pipeline.register_all(generators::generate(&ctx, relation)?)?;
        }
        pipeline.register_all(extra)?;
        let bundle_count = pipeline.bundle_count();
        let handlers = pipeline.compile();

        tracing::info!(
            "Bound {} entities, {} relations, {} handler bundles",
            schema.entity_count(),
            classification.len(),
            bundle_count
        );

        Ok(Self {
            schema,
            config,
            classification,
            handlers,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Every classified relation
    pub fn relations(&self) -> &[Relation] {
        self.classification.relations()
    }

    /// Name of the relation a field takes part in
    pub fn relation_name(&self, entity: &str, field: &str) -> Option<&str> {
        let id = self.schema.entity_by_name(entity)?.id;
        self.classification.relation_name(id, field)
    }

    /// Merged handlers of an entity
    pub fn handlers(&self, entity: &str) -> EngineResult<&EntityHandlers> {
        let id = self.schema.entity_id(entity)?;
        self.handlers_of(id)
    }

    /// Storage adapter of an entity
    pub fn adapter(&self, entity: EntityId) -> EngineResult<&Arc<dyn StorageAdapter>> {
        self.schema.entity(entity).require_adapter()
    }

    fn handlers_of(&self, entity: EntityId) -> EngineResult<&EntityHandlers> {
        self.handlers
            .get(entity.index())
            .ok_or_else(|| EngineError::UnknownEntity(entity.to_string()))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a record, running every create cascade of the entity
    pub async fn create(&self, entity: &str, payload: Record) -> EngineResult<Record> {
        let id = self.schema.entity_id(entity)?;
        self.create_entity(id, payload).await
    }

    /// Create through the cascade chain; boxed so nested creates can recurse
    pub(crate) fn create_entity(&self, entity: EntityId, payload: Record) -> BoxFuture<'_, EngineResult<Record>> {
        Box::pin(async move {
            let handlers = self.handlers_of(entity)?;
            CreateNext::new(self, entity, handlers.create_chain())
                .run(payload)
                .await
        })
    }

    /// The storage create at the end of every create chain
    pub(crate) async fn base_create(&self, entity: EntityId, payload: Record) -> EngineResult<Record> {
        self.adapter(entity)?.create(payload).await
    }

    /// Update the first record matching `filter`, running every update cascade
    pub async fn update(&self, entity: &str, filter: Filter, payload: Record) -> EngineResult<Record> {
        let id = self.schema.entity_id(entity)?;
        let handlers = self.handlers_of(id)?;
        UpdateNext::new(self, id, handlers.update_chain())
            .run(UpdateRequest::new(filter, payload))
            .await
    }

    /// The storage update at the end of every update chain
    ///
    /// Returns the record as stored after the update.
    pub(crate) async fn base_update(&self, entity: EntityId, request: UpdateRequest) -> EngineResult<Record> {
        let name = &self.schema.entity(entity).name;
        let adapter = self.adapter(entity)?;

        let found = adapter
            .find_one(&request.filter)
            .await?
            .ok_or_else(|| EngineError::RecordNotFound {
                entity: name.clone(),
                filter: request.filter.to_string(),
            })?;
        let id = record_id(&found).ok_or_else(|| EngineError::MissingIdentifier(name.clone()))?;

        if !request.payload.is_empty() {
            adapter.update(&Filter::by_id(id.clone()), request.payload).await?;
        }

        adapter
            .find_one_by_id(&id)
            .await?
            .ok_or_else(|| EngineError::RecordNotFound {
                entity: name.clone(),
                filter: Filter::by_id(id).to_string(),
            })
    }

    /// Delete every record matching `filter`; relations are not cascaded
    pub async fn delete(&self, entity: &str, filter: &Filter) -> EngineResult<()> {
        let id = self.schema.entity_id(entity)?;
        self.adapter(id)?.delete(filter).await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn find(
        &self,
        entity: &str,
        filter: &Filter,
        pagination: Pagination,
        order_by: Option<&OrderBy>,
    ) -> EngineResult<Page> {
        let id = self.schema.entity_id(entity)?;
        self.adapter(id)?.find(filter, pagination, order_by).await
    }

    pub async fn find_one(&self, entity: &str, filter: &Filter) -> EngineResult<Option<Record>> {
        let id = self.schema.entity_id(entity)?;
        self.adapter(id)?.find_one(filter).await
    }

    /// Resolve one relation field of a parent record
    pub async fn resolve(&self, entity: &str, field: &str, parent: &Record) -> EngineResult<Resolved> {
        let handlers = self.handlers(entity)?;
        let resolver = handlers
            .resolver(field)
            .ok_or_else(|| EngineError::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            })?;
        resolver.resolve(self, parent).await
    }
}

// ============================================================================
// Tests
// ============================================================================
