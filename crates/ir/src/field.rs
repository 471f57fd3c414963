//! Field definitions for entity properties
//!
//! A [`Field`] is a tagged union over scalar, enum, nested-object and
//! relation kinds, plus the attributes every kind shares (nullability,
//! list-ness, uniqueness, ...). Relation fields carry an [`EntityRef`] that
//! starts out deferred (just a name) and is resolved once every entity of the
//! schema exists.

use crate::naming::is_valid_identifier;
use serde::{Deserialize, Serialize};
use tessera_core::{Cardinality, EngineError, EngineResult, EntityId, ID_FIELD, Named, ScalarType, Validatable};

// ============================================================================
// Field
// ============================================================================

/// Represents a field within an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as used in payloads and records
    pub name: String,

    /// What kind of value the field holds
    pub kind: FieldKind,

    /// Whether the field may be null
    pub nullable: bool,

    /// Whether the field holds a list
    pub list: bool,

    /// Whether list items may be null
    pub item_nullable: bool,

    /// Whether the field must be unique (usable as a unique filter)
    pub unique: bool,

    /// Whether the field is read-only for mutations
    pub read_only: bool,

    /// Whether the value is generated by the store
    pub auto_generated: bool,
}

impl Field {
    /// Create a new nullable, non-list field
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            list: false,
            item_nullable: false,
            unique: false,
            read_only: false,
            auto_generated: false,
        }
    }

    /// Create a scalar field
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, FieldKind::Scalar(scalar))
    }

    /// Create an enum field
    pub fn enumeration(
        name: impl Into<String>,
        enum_name: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self::new(
            name,
            FieldKind::Enum {
                name: enum_name.into(),
                values,
            },
        )
    }

    /// Create a nested-object field
    pub fn object(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Object {
                type_name: type_name.into(),
            },
        )
    }

    /// Create a relation field targeting an entity by name
    ///
    /// The target stays deferred until the schema is built, so entities can
    /// reference each other in any declaration order.
    pub fn relation(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Relation(RelationField::new(target)))
    }

    /// Create the identifier field every entity carries
    pub fn id() -> Self {
        let mut field = Self::scalar(ID_FIELD, ScalarType::Id);
        field.nullable = false;
        field.unique = true;
        field.read_only = true;
        field.auto_generated = true;
        field
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Mark the field as non-null
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark the field as a list
    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    /// Allow null items inside a list field
    pub fn with_nullable_items(mut self) -> Self {
        self.item_nullable = true;
        self
    }

    /// Mark the field as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the field as read-only
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Mark the field as generated by the store
    pub fn auto_generated(mut self) -> Self {
        self.auto_generated = true;
        self
    }

    /// Give a relation field an explicit relation name
    ///
    /// Has no effect on non-relation fields.
    pub fn with_relation_name(mut self, relation_name: impl Into<String>) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.relation_name = Some(relation_name.into());
        }
        self
    }

    /// Pick the side that stores the key of an ambiguous one-to-one relation
    ///
    /// `owner` is an entity name, or a field name for self-relations.
    /// Has no effect on non-relation fields.
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.config.owner = Some(owner.into());
        }
        self
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Check if this is a relation field
    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Relation(_))
    }

    /// Relation details, if this is a relation field
    pub fn relation_field(&self) -> Option<&RelationField> {
        match &self.kind {
            FieldKind::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    /// Mutable relation details, if this is a relation field
    pub fn relation_field_mut(&mut self) -> Option<&mut RelationField> {
        match &mut self.kind {
            FieldKind::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    /// Cardinality of a relation field ("many" iff declared as a list)
    pub fn cardinality(&self) -> Option<Cardinality> {
        self.relation_field().map(|_| Cardinality::of_list(self.list))
    }

    /// Check if this is the identifier field
    pub fn is_id(&self) -> bool {
        self.name == ID_FIELD
    }

    /// Get a short type description, e.g. "[User!]" or "String"
    pub fn type_label(&self) -> String {
        let base = match &self.kind {
            FieldKind::Scalar(scalar) => scalar.display_name().to_string(),
            FieldKind::Enum { name, .. } => name.clone(),
            FieldKind::Object { type_name } => type_name.clone(),
            FieldKind::Relation(relation) => relation.target.name().to_string(),
        };
        let inner = if self.list {
            let item = if self.item_nullable { base } else { format!("{}!", base) };
            format!("[{}]", item)
        } else {
            base
        };
        if self.nullable { inner } else { format!("{}!", inner) }
    }
}

impl Named for Field {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Validatable for Field {
    fn validate(&self) -> EngineResult<()> {
        if self.name.is_empty() {
            return Err(EngineError::validation("Field name cannot be empty"));
        }

        if !is_valid_identifier(&self.name) {
            return Err(EngineError::validation(format!(
                "Field name '{}' is not a valid identifier",
                self.name
            )));
        }

        if self.item_nullable && !self.list {
            return Err(EngineError::validation(format!(
                "Field '{}' declares nullable items but is not a list",
                self.name
            )));
        }

        match &self.kind {
            FieldKind::Enum { name, values } if values.is_empty() => {
                Err(EngineError::validation(format!(
                    "Enum '{}' of field '{}' has no values",
                    name, self.name
                )))
            }
            FieldKind::Relation(relation) if relation.target.name().is_empty() => Err(
                EngineError::validation(format!("Relation field '{}' has no target", self.name)),
            ),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// FieldKind
// ============================================================================

/// The kind of value a field holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum FieldKind {
    /// Built-in scalar
    Scalar(ScalarType),
    /// Enumeration with named values
    Enum { name: String, values: Vec<String> },
    /// Embedded object stored inline with the record
    Object { type_name: String },
    /// Reference to another entity
    Relation(RelationField),
}

// ============================================================================
// RelationField
// ============================================================================

/// Relation-specific part of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationField {
    /// Target entity, deferred until the schema is built
    pub target: EntityRef,

    /// Explicit relation name pairing this field with a reciprocal field
    pub relation_name: Option<String>,

    /// Extra relation configuration
    pub config: RelationConfig,
}

impl RelationField {
    /// Create a relation to an entity that has not been resolved yet
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: EntityRef::Deferred(target.into()),
            relation_name: None,
            config: RelationConfig::default(),
        }
    }
}

/// Configuration attached to a relation field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Entity (or field, for self-relations) that stores the foreign key
    pub owner: Option<String>,
}

// ============================================================================
// EntityRef
// ============================================================================

/// Reference from a relation field to its target entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRef {
    /// Placeholder holding the target's name (first build phase)
    Deferred(String),
    /// Target resolved to an entity of the schema (second build phase)
    Resolved { id: EntityId, name: String },
}

impl EntityRef {
    /// Name of the target entity
    pub fn name(&self) -> &str {
        match self {
            EntityRef::Deferred(name) => name,
            EntityRef::Resolved { name, .. } => name,
        }
    }

    /// Resolved target, if the schema has been built
    pub fn id(&self) -> Option<EntityId> {
        match self {
            EntityRef::Deferred(_) => None,
            EntityRef::Resolved { id, .. } => Some(*id),
        }
    }

    /// Check if the reference is still a placeholder
    pub fn is_deferred(&self) -> bool {
        matches!(self, EntityRef::Deferred(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_builders() {
        let email = Field::scalar("email", ScalarType::String).required().unique();
        assert!(!email.nullable);
        assert!(email.unique);
        assert!(!email.is_relation());
        assert_eq!(email.cardinality(), None);
        assert_eq!(email.type_label(), "String!");
    }

    #[test]
    fn test_relation_field() {
        let players = Field::relation("players", "User").list();
        assert!(players.is_relation());
        assert_eq!(players.cardinality(), Some(Cardinality::Many));
        assert_eq!(players.type_label(), "[User!]");

        let relation = players.relation_field().unwrap();
        assert!(relation.target.is_deferred());
        assert_eq!(relation.target.name(), "User");
        assert_eq!(relation.relation_name, None);
    }

    #[test]
    fn test_relation_name_and_owner() {
        let author = Field::relation("author", "User")
            .with_relation_name("Authorship")
            .owned_by("Book");
        let relation = author.relation_field().unwrap();
        assert_eq!(relation.relation_name.as_deref(), Some("Authorship"));
        assert_eq!(relation.config.owner.as_deref(), Some("Book"));
        assert_eq!(author.cardinality(), Some(Cardinality::One));

        // Ignored on scalar fields
        let title = Field::scalar("title", ScalarType::String).with_relation_name("X");
        assert_eq!(title.relation_field(), None);
    }

    #[test]
    fn test_id_field() {
        let id = Field::id();
        assert!(id.is_id());
        assert!(id.unique);
        assert!(id.read_only);
        assert!(id.auto_generated);
        assert_eq!(id.type_label(), "ID!");
    }

    #[test]
    fn test_field_validation() {
        assert!(Field::scalar("title", ScalarType::String).validate().is_ok());
        assert!(Field::scalar("", ScalarType::String).validate().is_err());
        assert!(Field::scalar("bad name", ScalarType::String).validate().is_err());
        assert!(Field::enumeration("role", "Role", vec![]).validate().is_err());
        assert!(
            Field::scalar("tags", ScalarType::String)
                .with_nullable_items()
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_entity_ref() {
        let deferred = EntityRef::Deferred("User".to_string());
        assert_eq!(deferred.id(), None);

        let resolved = EntityRef::Resolved {
            id: EntityId(2),
            name: "User".to_string(),
        };
        assert_eq!(resolved.id(), Some(EntityId(2)));
        assert_eq!(resolved.name(), "User");
        assert!(!resolved.is_deferred());
    }
}
