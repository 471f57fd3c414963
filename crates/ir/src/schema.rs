//! Schema assembly
//!
//! A [`Schema`] is built in two phases so that relation fields may reference
//! entities declared later (or cyclically):
//!
//! 1. **Declare**: entities are added to a [`SchemaBuilder`] with relation
//!    targets held as [`EntityRef::Deferred`] names.
//! 2. **Build**: once every entity exists, each deferred target is resolved
//!    to an [`EntityId`], identifier fields are ensured, adapters are bound
//!    and the whole schema is validated.
//!
//! The resulting `Schema` is immutable.

use crate::entity::Entity;
use crate::field::EntityRef;
use crate::validation::Validator;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tessera_core::{EngineError, EngineResult, EntityId, StorageAdapter, Validatable};

/// Factory producing an adapter for entities without an explicit binding
pub type AdapterFactory = Box<dyn Fn(&Entity) -> Arc<dyn StorageAdapter> + Send + Sync>;

// ============================================================================
// Schema
// ============================================================================

/// An immutable, fully resolved set of entities
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: Vec<Entity>,
    by_name: HashMap<String, EntityId>,
}

impl Schema {
    /// Start declaring a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Get an entity by ID
    ///
    /// IDs always come from this schema, so lookup cannot miss.
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    /// Get an entity by name
    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.by_name.get(name).map(|id| self.entity(*id))
    }

    /// Get an entity ID by name
    pub fn entity_id(&self, name: &str) -> EngineResult<EntityId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownEntity(name.to_string()))
    }

    /// Get all entities in declaration order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Get the number of entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Check if the schema has no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// ============================================================================
// SchemaBuilder
// ============================================================================

/// Collects entity declarations and adapter bindings
#[derive(Default)]
pub struct SchemaBuilder {
    entities: Vec<Entity>,
    adapters: Vec<(String, Arc<dyn StorageAdapter>)>,
    default_adapter: Option<AdapterFactory>,
}

impl SchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an entity
    pub fn entity(mut self, entity: Entity) -> Self {
        self.add_entity(entity);
        self
    }

    /// Declare an entity
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Bind a storage adapter to an entity by name
    pub fn adapter(mut self, entity: impl Into<String>, adapter: Arc<dyn StorageAdapter>) -> Self {
        self.adapters.push((entity.into(), adapter));
        self
    }

    /// Bind adapters produced by a factory to every entity without an explicit adapter
    pub fn default_adapter<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Entity) -> Arc<dyn StorageAdapter> + Send + Sync + 'static,
    {
        self.default_adapter = Some(Box::new(factory));
        self
    }

    /// Resolve every deferred reference and produce the immutable schema
    pub fn build(self) -> EngineResult<Schema> {
        let SchemaBuilder {
            mut entities,
            adapters,
            default_adapter,
        } = self;

        // Phase 1: assign ids and index names
        let mut by_name = HashMap::new();
        for (index, entity) in entities.iter_mut().enumerate() {
            entity.id = EntityId(index);
            if by_name.insert(entity.name.clone(), entity.id).is_some() {
                return Err(EngineError::DuplicateEntity(entity.name.clone()));
            }
            entity.ensure_id_field();
            entity.validate()?;
        }

        // Phase 2: resolve deferred relation targets
        for entity in entities.iter_mut() {
            for field in entity.fields_mut() {
                if let Some(relation) = field.relation_field_mut() {
                    let name = relation.target.name().to_string();
                    let id = by_name
                        .get(&name)
                        .copied()
                        .ok_or_else(|| EngineError::UnknownEntity(name.clone()))?;
                    relation.target = EntityRef::Resolved { id, name };
                }
            }
        }

        // Bind adapters
        for (name, adapter) in adapters {
            let id = by_name
                .get(&name)
                .copied()
                .ok_or_else(|| EngineError::UnknownEntity(name.clone()))?;
            entities[id.index()].bind_adapter(adapter);
        }
        if let Some(factory) = default_adapter {
            for entity in entities.iter_mut() {
                if entity.adapter().is_none() {
                    let adapter = factory(entity);
                    entity.bind_adapter(adapter);
                }
            }
        }

        let schema = Schema { entities, by_name };
        Validator::with_default_rules()
            .validate(&schema)
            .into_result()?;

        tracing::debug!("Built schema with {} entities", schema.entity_count());
        Ok(schema)
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("entities", &self.entities)
            .field("adapters", &self.adapters)
            .field("default_adapter", &self.default_adapter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::test_support::StubAdapter;
    use tessera_core::{Capabilities, ScalarType};

    #[test]
    fn test_forward_references_resolve() {
        // Post references User before User is declared
        let schema = Schema::builder()
            .entity(Entity::new("Post").with_field(Field::relation("author", "User")))
            .entity(Entity::new("User").with_field(Field::relation("posts", "Post").list()))
            .build()
            .unwrap();

        let post = schema.entity_by_name("Post").unwrap();
        let author = post.field("author").unwrap().relation_field().unwrap();
        assert_eq!(author.target.id(), Some(schema.entity_id("User").unwrap()));
        assert!(post.has_field("id"));
    }

    #[test]
    fn test_unknown_target_fails() {
        let err = Schema::builder()
            .entity(Entity::new("Post").with_field(Field::relation("author", "Author")))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownEntity(name) if name == "Author"));
    }

    #[test]
    fn test_duplicate_entity_fails() {
        let err = Schema::builder()
            .entity(Entity::new("User"))
            .entity(Entity::new("User"))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateEntity(_)));
    }

    #[test]
    fn test_adapter_binding() {
        let schema = Schema::builder()
            .entity(Entity::new("User").with_field(Field::scalar("name", ScalarType::String)))
            .entity(Entity::new("Group"))
            .adapter("User", StubAdapter::shared("User", Capabilities::ALL))
            .default_adapter(|entity| StubAdapter::shared(&entity.name, Capabilities::NONE))
            .build()
            .unwrap();

        let user = schema.entity_by_name("User").unwrap();
        assert_eq!(user.capabilities(), Capabilities::ALL);
        let group = schema.entity_by_name("Group").unwrap();
        assert_eq!(group.require_adapter().unwrap().name(), "Group");
        assert_eq!(group.capabilities(), Capabilities::NONE);
    }

    #[test]
    fn test_adapter_for_unknown_entity_fails() {
        let err = Schema::builder()
            .entity(Entity::new("User"))
            .adapter("Ghost", StubAdapter::shared("Ghost", Capabilities::NONE))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownEntity(_)));
    }

    #[test]
    fn test_unbound_entity_has_no_adapter() {
        let schema = Schema::builder().entity(Entity::new("User")).build().unwrap();
        let err = schema.entity_by_name("User").unwrap().require_adapter().unwrap_err();
        assert!(matches!(err, EngineError::MissingAdapter(_)));
    }
}
