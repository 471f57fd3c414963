//! Relation definitions between entities
//!
//! Relations are never declared directly. They are derived from relation
//! fields by the classifier each time a schema is bound, and describe which
//! entity stores the linking identifier.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tessera_core::{EntityId, RelationType};

// ============================================================================
// Side
// ============================================================================

/// One of the two ends of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    /// The other end
    pub fn opposite(self) -> Self {
        match self {
            Side::Source => Side::Target,
            Side::Target => Side::Source,
        }
    }
}

// ============================================================================
// RelationEnd
// ============================================================================

/// An entity taking part in a relation, with its relation field if it has one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEnd {
    pub entity: EntityId,
    pub entity_name: String,
    /// Relation field declared on this end (`None` for the target of a
    /// unidirectional relation)
    pub field: Option<String>,
}

impl RelationEnd {
    pub fn new(entity: EntityId, entity_name: impl Into<String>, field: Option<String>) -> Self {
        Self {
            entity,
            entity_name: entity_name.into(),
            field,
        }
    }

    /// Get a `Entity.field` label, or just the entity name
    pub fn label(&self) -> String {
        match &self.field {
            Some(field) => format!("{}.{}", self.entity_name, field),
            None => self.entity_name.clone(),
        }
    }
}

// ============================================================================
// RelationStorage
// ============================================================================

/// Where the link between two records lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationStorage {
    /// A key field on the records of one end
    ForeignKey { owner: Side, key: String },
    /// Symmetric per-side indexes, no key
    AssociativeIndex,
}

// ============================================================================
// Relation
// ============================================================================

/// A classified relation between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Explicit or generated relation name
    pub name: String,

    /// Shape of the relation
    pub kind: RelationType,

    /// Source end; for one-to-many relations this is the end whose field
    /// has cardinality one
    pub source: RelationEnd,

    /// Target end
    pub target: RelationEnd,

    /// Foreign key owner, or the associative index for many-to-many
    pub storage: RelationStorage,
}

impl Relation {
    /// Get one end of the relation
    pub fn end(&self, side: Side) -> &RelationEnd {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// Find which end declares `field` on `entity`
    pub fn side_of(&self, entity: EntityId, field: &str) -> Option<Side> {
        [Side::Source, Side::Target].into_iter().find(|side| {
            let end = self.end(*side);
            end.entity == entity && end.field.as_deref() == Some(field)
        })
    }

    /// Ends that declare a relation field
    pub fn declared_sides(&self) -> impl Iterator<Item = Side> + '_ {
        [Side::Source, Side::Target]
            .into_iter()
            .filter(|side| self.end(*side).field.is_some())
    }

    /// Foreign key owner and key name, if the relation uses a key
    pub fn foreign_key(&self) -> Option<(Side, &str)> {
        match &self.storage {
            RelationStorage::ForeignKey { owner, key } => Some((*owner, key.as_str())),
            RelationStorage::AssociativeIndex => None,
        }
    }

    /// The end storing the foreign key
    pub fn key_owner(&self) -> Option<&RelationEnd> {
        self.foreign_key().map(|(side, _)| self.end(side))
    }

    /// Check if both ends are the same entity
    pub fn is_self_relation(&self) -> bool {
        self.source.entity == self.target.entity
    }

    /// Check if the relation involves an entity
    pub fn involves(&self, entity: EntityId) -> bool {
        self.source.entity == entity || self.target.entity == entity
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} {} {}",
            self.name,
            self.kind,
            self.source.label(),
            self.kind.arrow_symbol(),
            self.target.label()
        )?;
        match &self.storage {
            RelationStorage::ForeignKey { owner, key } => {
                write!(f, " [key {}.{}]", self.end(*owner).entity_name, key)
            }
            RelationStorage::AssociativeIndex => write!(f, " [index]"),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Output of the classifier: every relation plus a field-to-relation lookup
///
/// The lookup table stands in for writing relation names back into fields,
/// so entities stay untouched after the schema is built.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    relations: Vec<Relation>,
    by_field: HashMap<(EntityId, String), usize>,
}

impl Classification {
    pub(crate) fn new(relations: Vec<Relation>) -> Self {
        let mut by_field = HashMap::new();
        for (index, relation) in relations.iter().enumerate() {
            for side in relation.declared_sides() {
                let end = relation.end(side);
                if let Some(field) = &end.field {
                    by_field.insert((end.entity, field.clone()), index);
                }
            }
        }
        Self {
            relations,
            by_field,
        }
    }

    /// All relations in classification order
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// The relation a field belongs to
    pub fn relation_for(&self, entity: EntityId, field: &str) -> Option<&Relation> {
        self.by_field
            .get(&(entity, field.to_string()))
            .map(|index| &self.relations[*index])
    }

    /// The resolved relation name of a field
    pub fn relation_name(&self, entity: EntityId, field: &str) -> Option<&str> {
        self.relation_for(entity, field).map(|r| r.name.as_str())
    }

    /// Relations an entity takes part in
    pub fn relations_of(&self, entity: EntityId) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.involves(entity))
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
