//! Entity definitions for data models
//!
//! This module contains the `Entity` struct: one model of the schema with its
//! ordered fields, derived naming forms, and (once bound) the storage adapter
//! that persists its records.

use crate::field::Field;
use crate::naming::{EntityNames, is_valid_identifier};
use std::sync::Arc;
use tessera_core::traits::{find_named, first_duplicate, validate_named};
use tessera_core::{
    Capabilities, EngineError, EngineResult, EntityId, ID_FIELD, Named, StorageAdapter,
    Validatable,
};

// ============================================================================
// Entity
// ============================================================================

/// Represents one entity of the schema
///
/// Entities are assembled through [`crate::SchemaBuilder`] and are read-only
/// once the schema is built.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Position of this entity in its schema (assigned at build time)
    pub id: EntityId,

    /// Declared entity name, e.g. "BlogPost"
    pub name: String,

    /// Derived naming forms
    pub names: EntityNames,

    /// Human-readable description
    pub description: Option<String>,

    /// Fields in declaration order, unique by name
    fields: Vec<Field>,

    /// Storage adapter bound at schema-build time
    adapter: Option<Arc<dyn StorageAdapter>>,
}

impl Entity {
    /// Create a new entity with the given name and no fields
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let names = EntityNames::from_name(&name);

        Self {
            id: EntityId(0),
            name,
            names,
            description: None,
            fields: Vec::new(),
            adapter: None,
        }
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a field using builder pattern
    ///
    /// Duplicate names are kept here and reported when the schema is built.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a field, rejecting duplicate names
    pub fn add_field(&mut self, field: Field) -> EngineResult<()> {
        if self.has_field(&field.name) {
            return Err(EngineError::DuplicateField {
                entity: self.name.clone(),
                field: field.name,
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// Insert the identifier field at the front if it was not declared
    pub(crate) fn ensure_id_field(&mut self) {
        if !self.has_field(ID_FIELD) {
            self.fields.insert(0, Field::id());
        }
    }

    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.fields.iter_mut()
    }

    pub(crate) fn bind_adapter(&mut self, adapter: Arc<dyn StorageAdapter>) {
        self.adapter = Some(adapter);
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Get all fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        find_named(&self.fields, name)
    }

    /// Check if entity has a specific field name
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Get all relation fields in declaration order
    pub fn relation_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_relation())
    }

    /// Get all unique fields
    pub fn unique_fields(&self) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.unique).collect()
    }

    /// Check if a field can be used as a unique filter
    pub fn is_unique_field(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.unique)
    }

    /// Get the number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// UpperCamel singular name
    pub fn type_name(&self) -> &str {
        &self.names.type_name
    }

    /// lowerCamel singular name
    pub fn singular(&self) -> &str {
        &self.names.singular
    }

    /// lowerCamel plural name
    pub fn plural(&self) -> &str {
        &self.names.plural
    }

    /// The bound storage adapter, if any
    pub fn adapter(&self) -> Option<&Arc<dyn StorageAdapter>> {
        self.adapter.as_ref()
    }

    /// The bound storage adapter, or a schema-build error
    pub fn require_adapter(&self) -> EngineResult<&Arc<dyn StorageAdapter>> {
        self.adapter
            .as_ref()
            .ok_or_else(|| EngineError::MissingAdapter(self.name.clone()))
    }

    /// Capabilities of the bound adapter (none when unbound)
    pub fn capabilities(&self) -> Capabilities {
        self.adapter
            .as_ref()
            .map(|adapter| adapter.capabilities())
            .unwrap_or(Capabilities::NONE)
    }
}

impl Named for Entity {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Validatable for Entity {
    fn validate(&self) -> EngineResult<()> {
        if self.name.is_empty() {
            return Err(EngineError::validation("Entity name cannot be empty"));
        }

        if !is_valid_identifier(&self.name) {
            return Err(EngineError::validation(format!(
                "Entity name '{}' is not a valid identifier",
                self.name
            )));
        }

        validate_named(&self.name, &self.fields)?;

        if let Some(field) = first_duplicate(&self.fields) {
            return Err(EngineError::DuplicateField {
                entity: self.name.clone(),
                field: field.name.clone(),
            });
        }

        match self.field(ID_FIELD) {
            Some(id) if id.unique && !id.is_relation() && !id.list => Ok(()),
            _ => Err(EngineError::MissingUniqueField {
                entity: self.name.clone(),
                field: ID_FIELD.to_string(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::ScalarType;

    #[test]
    fn test_entity_new() {
        let entity = Entity::new("BlogPost");
        assert_eq!(entity.name, "BlogPost");
        assert_eq!(entity.type_name(), "BlogPost");
        assert_eq!(entity.singular(), "blogPost");
        assert_eq!(entity.plural(), "blogPosts");
        assert_eq!(entity.field_count(), 0);
        assert!(entity.adapter().is_none());
        assert_eq!(entity.capabilities(), Capabilities::NONE);
    }

    #[test]
    fn test_entity_add_field() {
        let mut entity = Entity::new("User");
        entity
            .add_field(Field::scalar("email", ScalarType::String).unique())
            .unwrap();
        assert!(entity.has_field("email"));
        assert!(entity.is_unique_field("email"));

        let err = entity
            .add_field(Field::scalar("email", ScalarType::String))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateField { .. }));
    }

    #[test]
    fn test_ensure_id_field() {
        let mut entity = Entity::new("User").with_field(Field::scalar("name", ScalarType::String));
        entity.ensure_id_field();
        assert_eq!(entity.fields()[0].name, "id");
        assert_eq!(entity.field_count(), 2);

        entity.ensure_id_field();
        assert_eq!(entity.field_count(), 2);
    }

    #[test]
    fn test_relation_fields_in_order() {
        let entity = Entity::new("User")
            .with_field(Field::relation("posts", "Post").list())
            .with_field(Field::scalar("name", ScalarType::String))
            .with_field(Field::relation("groups", "Group").list());
        let names: Vec<&str> = entity.relation_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["posts", "groups"]);
    }

    #[test]
    fn test_entity_validation() {
        let mut entity = Entity::new("User");
        entity.ensure_id_field();
        assert!(entity.validate().is_ok());

        let mut no_id = Entity::new("User").with_field(Field::scalar("name", ScalarType::String));
        assert!(matches!(
            no_id.validate(),
            Err(EngineError::MissingUniqueField { .. })
        ));
        no_id.ensure_id_field();
        assert!(no_id.validate().is_ok());

        let non_unique_id = Entity::new("User").with_field(Field::scalar("id", ScalarType::Id));
        assert!(non_unique_id.validate().is_err());

        let duplicate = Entity::new("User")
            .with_field(Field::id())
            .with_field(Field::scalar("name", ScalarType::String))
            .with_field(Field::scalar("name", ScalarType::String));
        assert!(matches!(
            duplicate.validate(),
            Err(EngineError::DuplicateField { .. })
        ));

        let mut unnamed = Entity::new("");
        unnamed.ensure_id_field();
        assert!(unnamed.validate().is_err());
    }
}
