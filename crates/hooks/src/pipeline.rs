//! # Hook Merge Pipeline
//!
//! Collects the behavior bundles of every relation and merges them per
//! entity:
//!
//! - create and update cascades keep registration order; the first
//!   registered cascade runs outermost and receives the rest of the chain
//! - read resolvers form a flat map keyed by field name; a collision is
//!   resolved by [`ResolverPolicy`]
//!
//! The merged [`EntityHandlers`] are compiled once at bind time and never
//! change afterwards.

use crate::bundle::BehaviorBundle;
use crate::cascade::{CreateCascade, UpdateCascade};
use crate::config::ResolverPolicy;
use crate::resolver::ReadResolver;
use std::collections::BTreeMap;
use std::sync::Arc;
use tessera_core::{EngineError, EngineResult, EntityId};
use tessera_ir::Schema;

// ============================================================================
// EntityHandlers
// ============================================================================

/// The merged handlers of one entity
///
/// Delete has no cascade logic and always goes straight to the adapter.
#[derive(Debug, Clone)]
pub struct EntityHandlers {
    entity: EntityId,
    entity_name: String,
    create: Vec<Arc<dyn CreateCascade>>,
    update: Vec<Arc<dyn UpdateCascade>>,
    resolvers: BTreeMap<String, Arc<dyn ReadResolver>>,
}

impl EntityHandlers {
    fn new(entity: EntityId, entity_name: impl Into<String>) -> Self {
        Self {
            entity,
            entity_name: entity_name.into(),
            create: Vec::new(),
            update: Vec::new(),
            resolvers: BTreeMap::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Create cascades, outermost first
    pub fn create_chain(&self) -> &[Arc<dyn CreateCascade>] {
        &self.create
    }

    /// Update cascades, outermost first
    pub fn update_chain(&self) -> &[Arc<dyn UpdateCascade>] {
        &self.update
    }

    /// The resolver registered for a field
    pub fn resolver(&self, field: &str) -> Option<&Arc<dyn ReadResolver>> {
        self.resolvers.get(field)
    }

    /// Fields with a resolver, sorted by name
    pub fn resolver_fields(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    /// Fields with a create cascade, in chain order
    pub fn cascade_fields(&self) -> impl Iterator<Item = &str> {
        self.create.iter().map(|cascade| cascade.field())
    }

    /// Check if nothing was registered for this entity
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.resolvers.is_empty()
    }
}

// ============================================================================
// HookPipeline
// ============================================================================

/// Merges behavior bundles into per-entity handlers
#[derive(Debug)]
pub struct HookPipeline {
    policy: ResolverPolicy,
    entities: Vec<EntityHandlers>,
    bundle_count: usize,
}

impl HookPipeline {
    /// Create an empty pipeline with one slot per schema entity
    pub fn new(schema: &Schema, policy: ResolverPolicy) -> Self {
        Self {
            policy,
            entities: schema
                .entities()
                .map(|entity| EntityHandlers::new(entity.id, &entity.name))
                .collect(),
            bundle_count: 0,
        }
    }

    /// Register a bundle after every previously registered one
    pub fn register(&mut self, bundle: BehaviorBundle) -> EngineResult<()> {
        let policy = self.policy;
        let handlers = self
            .entities
            .get_mut(bundle.entity.index())
            .ok_or_else(|| EngineError::UnknownEntity(bundle.entity.to_string()))?;

        if handlers.resolvers.contains_key(&bundle.field) {
            match policy {
                ResolverPolicy::Reject => {
                    return Err(EngineError::DuplicateResolver {
                        entity: handlers.entity_name.clone(),
                        field: bundle.field,
                    });
                }
                ResolverPolicy::LastWins => {
                    tracing::warn!(
                        "Resolver for '{}.{}' replaced by relation '{}'",
                        handlers.entity_name,
                        bundle.field,
                        bundle.relation
                    );
                }
            }
        }

        handlers.create.push(bundle.create);
        handlers.update.push(bundle.update);
        handlers.resolvers.insert(bundle.field, bundle.resolver);
        self.bundle_count += 1;
        Ok(())
    }

    /// Register several bundles in order
    pub fn register_all(&mut self, bundles: impl IntoIterator<Item = BehaviorBundle>) -> EngineResult<()> {
        for bundle in bundles {
            self.register(bundle)?;
        }
        Ok(())
    }

    /// Number of bundles registered so far
    pub fn bundle_count(&self) -> usize {
        self.bundle_count
    }

    /// Freeze the merged handlers, indexed by entity id
    pub fn compile(self) -> Vec<EntityHandlers> {
        self.entities
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{CreateNext, UpdateNext, UpdateRequest};
    use crate::engine::Engine;
    use crate::resolver::Resolved;
    use async_trait::async_trait;
    use tessera_core::Record;
    use tessera_ir::Entity;

    /// Named no-op behavior used to observe merge order
    #[derive(Debug)]
    struct Marker(&'static str);

    #[async_trait]
    impl CreateCascade for Marker {
        fn field(&self) -> &str {
            self.0
        }

        async fn create<'a>(&'a self, payload: Record, next: CreateNext<'a>) -> EngineResult<Record> {
            next.run(payload).await
        }
    }

    #[async_trait]
    impl UpdateCascade for Marker {
        fn field(&self) -> &str {
            self.0
        }

        async fn update<'a>(&'a self, request: UpdateRequest, next: UpdateNext<'a>) -> EngineResult<Record> {
            next.run(request).await
        }
    }

    #[async_trait]
    impl ReadResolver for Marker {
        fn field(&self) -> &str {
            self.0
        }

        async fn resolve(&self, _: &Engine, _: &Record) -> EngineResult<Resolved> {
            Ok(Resolved::One(None))
        }
    }

    fn bundle(relation: &str, field: &'static str) -> BehaviorBundle {
        let marker = Arc::new(Marker(field));
        BehaviorBundle::new(
            relation,
            EntityId(0),
            field,
            marker.clone(),
            marker.clone(),
            marker,
        )
    }

    fn schema() -> Schema {
        Schema::builder()
            .entity(Entity::new("User"))
            .entity(Entity::new("Post"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_merge_keeps_registration_order() {
        let mut pipeline = HookPipeline::new(&schema(), ResolverPolicy::LastWins);
        pipeline
            .register_all([bundle("Authorship", "posts"), bundle("Membership", "groups")])
            .unwrap();
        assert_eq!(pipeline.bundle_count(), 2);

        let handlers = pipeline.compile();
        assert_eq!(handlers.len(), 2);
        let user = &handlers[0];
        assert_eq!(user.cascade_fields().collect::<Vec<_>>(), vec!["posts", "groups"]);
        assert_eq!(user.resolver_fields().collect::<Vec<_>>(), vec!["groups", "posts"]);
        assert!(user.resolver("posts").is_some());
        assert!(handlers[1].is_empty());
    }

    #[test]
    fn test_resolver_collision_last_wins() {
        let mut pipeline = HookPipeline::new(&schema(), ResolverPolicy::LastWins);
        pipeline.register(bundle("First", "posts")).unwrap();

        let replacement = Arc::new(Marker("latest"));
        pipeline
            .register(BehaviorBundle::new(
                "Second",
                EntityId(0),
                "posts",
                replacement.clone(),
                replacement.clone(),
                replacement,
            ))
            .unwrap();

        let handlers = pipeline.compile();
        assert_eq!(handlers[0].resolver("posts").unwrap().field(), "latest");
        assert_eq!(handlers[0].resolver_fields().count(), 1);
        assert_eq!(handlers[0].create_chain().len(), 2);
    }

    #[test]
    fn test_resolver_collision_rejected() {
        let mut pipeline = HookPipeline::new(&schema(), ResolverPolicy::Reject);
        pipeline.register(bundle("First", "posts")).unwrap();
        let err = pipeline.register(bundle("Second", "posts")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DuplicateResolver { entity, field } if entity == "User" && field == "posts"
        ));
    }

    #[test]
    fn test_unknown_entity_rejected() {
        let mut pipeline = HookPipeline::new(&schema(), ResolverPolicy::LastWins);
        let mut stray = bundle("Stray", "x");
        stray.entity = EntityId(9);
        assert!(matches!(
            pipeline.register(stray),
            Err(EngineError::UnknownEntity(_))
        ));
    }
}
