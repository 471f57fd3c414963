//! Core types used throughout Tessera
//!
//! This module contains the value types shared by the schema IR, the relation
//! hooks, and the storage adapters: records and filters, pagination, and the
//! small enums that describe relation shapes and adapter capabilities.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Identifiers and Records
// ============================================================================

/// Name of the identifier field every entity carries
pub const ID_FIELD: &str = "id";

/// Identifier of a stored record
pub type RecordId = String;

/// A stored record or mutation payload: field name to JSON value
pub type Record = Map<String, Value>;

/// Index of an entity inside a bound schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub usize);

impl EntityId {
    /// Position of the entity in its schema
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read the identifier of a record
///
/// String identifiers are returned as-is; numeric identifiers are rendered
/// to their decimal form so both kinds of store can share one key type.
pub fn record_id(record: &Record) -> Option<RecordId> {
    id_from_value(record.get(ID_FIELD)?)
}

/// Interpret a JSON value as a record identifier
pub fn id_from_value(value: &Value) -> Option<RecordId> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Equality filter over record fields
///
/// Every entry must match for a record to be selected. An empty filter
/// selects every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(pub Record);

impl Filter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter selecting a single identifier
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().and(ID_FIELD, Value::String(id.into()))
    }

    /// Create a filter with a single equality condition
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(field, value)
    }

    /// Add an equality condition
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Check if the filter has no conditions
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names the filter constrains
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The identifier, if the filter is exactly `{ id: ... }`
    pub fn only_id(&self) -> Option<RecordId> {
        if self.0.len() == 1 {
            self.0.get(ID_FIELD).and_then(id_from_value)
        } else {
            None
        }
    }

    /// Check if a record satisfies every condition
    pub fn matches(&self, record: &Record) -> bool {
        self.0.iter().all(|(field, expected)| {
            let actual = record.get(field).unwrap_or(&Value::Null);
            values_equal(actual, expected)
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

impl From<Record> for Filter {
    fn from(record: Record) -> Self {
        Self(record)
    }
}

/// Identifier-aware equality: `"7"` and `7` compare equal
fn values_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::String(_), Value::Number(_)) | (Value::Number(_), Value::String(_)) => {
            id_from_value(actual) == id_from_value(expected)
        }
        _ => false,
    }
}

// ============================================================================
// Pagination and Ordering
// ============================================================================

/// Offset-based page request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of records to skip
    pub offset: usize,
    /// Maximum number of records to return (`None` for all)
    pub limit: Option<usize>,
}

impl Pagination {
    /// Request every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Request a window of records
    pub fn window(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Ordering on a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderBy {
    /// Ascending order on a field
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending order on a field
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Records in this page
    pub items: Vec<Record>,
    /// Number of records matching the filter before pagination
    pub total: usize,
}

// ============================================================================
// Scalar Types
// ============================================================================

/// Scalar types a field can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    #[serde(alias = "ID")]
    Id,
    String,
    Int,
    Float,
    #[serde(alias = "Bool")]
    Boolean,
    DateTime,
    Json,
}

impl ScalarType {
    /// Parse a scalar type from its schema spelling
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ID" | "Id" => Some(ScalarType::Id),
            "String" => Some(ScalarType::String),
            "Int" => Some(ScalarType::Int),
            "Float" => Some(ScalarType::Float),
            "Boolean" | "Bool" => Some(ScalarType::Boolean),
            "DateTime" => Some(ScalarType::DateTime),
            "JSON" | "Json" => Some(ScalarType::Json),
            _ => None,
        }
    }

    /// Get the schema spelling of this scalar
    pub fn display_name(&self) -> &'static str {
        match self {
            ScalarType::Id => "ID",
            ScalarType::String => "String",
            ScalarType::Int => "Int",
            ScalarType::Float => "Float",
            ScalarType::Boolean => "Boolean",
            ScalarType::DateTime => "DateTime",
            ScalarType::Json => "JSON",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Relation Types
// ============================================================================

/// How many records a relation field refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    /// A list field refers to many records
    pub fn of_list(list: bool) -> Self {
        if list { Cardinality::Many } else { Cardinality::One }
    }
}

/// The shape of a classified relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// Single to-one field with no reciprocal field
    UniOneToOne,
    /// Single list field with no reciprocal field
    UniOneToMany,
    /// Two to-one fields pointing at each other
    BiOneToOne,
    /// A to-one field paired with a list field
    BiOneToMany,
    /// Two list fields pointing at each other
    BiManyToMany,
}

impl RelationType {
    /// Classify a cardinality pair
    ///
    /// `other` is `None` for unidirectional relations. A mixed pair always
    /// yields [`RelationType::BiOneToMany`]; callers orient the roles.
    pub fn from_cardinalities(side: Cardinality, other: Option<Cardinality>) -> Self {
        match (side, other) {
            (Cardinality::One, None) => RelationType::UniOneToOne,
            (Cardinality::Many, None) => RelationType::UniOneToMany,
            (Cardinality::One, Some(Cardinality::One)) => RelationType::BiOneToOne,
            (Cardinality::One, Some(Cardinality::Many))
            | (Cardinality::Many, Some(Cardinality::One)) => RelationType::BiOneToMany,
            (Cardinality::Many, Some(Cardinality::Many)) => RelationType::BiManyToMany,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            RelationType::UniOneToOne => "Unidirectional One to One",
            RelationType::UniOneToMany => "Unidirectional One to Many",
            RelationType::BiOneToOne => "One to One",
            RelationType::BiOneToMany => "One to Many",
            RelationType::BiManyToMany => "Many to Many",
        }
    }

    /// Get arrow symbol for visual representation
    pub fn arrow_symbol(&self) -> &'static str {
        match self {
            RelationType::UniOneToOne => "1 ───> 1",
            RelationType::UniOneToMany => "1 ───> *",
            RelationType::BiOneToOne => "1 ─── 1",
            RelationType::BiOneToMany => "* >─── 1",
            RelationType::BiManyToMany => "* >──< *",
        }
    }

    /// Check if the relation has a field on both entities
    pub fn is_bidirectional(&self) -> bool {
        !matches!(
            self,
            RelationType::UniOneToOne | RelationType::UniOneToMany
        )
    }

    /// Check if the relation is linked through associative indexes instead of a key
    pub fn uses_associative_index(&self) -> bool {
        matches!(self, RelationType::BiManyToMany)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Adapter Capabilities
// ============================================================================

/// Optional operation groups a storage adapter declares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    /// `find_one_by_relation` and `update_one_relation`
    pub to_one: bool,
    /// `find_many_from_one_relation`
    pub one_to_many: bool,
    /// `find_ids_from_many_relation`, `add_id_to_many_relation`, `remove_id_from_many_relation`
    pub many_to_many: bool,
}

impl Capabilities {
    /// Only the required CRUD operations
    pub const NONE: Capabilities = Capabilities {
        to_one: false,
        one_to_many: false,
        many_to_many: false,
    };

    /// Every optional operation group
    pub const ALL: Capabilities = Capabilities {
        to_one: true,
        one_to_many: true,
        many_to_many: true,
    };

    /// Check if a capability group is declared
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::ToOne => self.to_one,
            Capability::OneToMany => self.one_to_many,
            Capability::ManyToMany => self.many_to_many,
        }
    }
}

/// A single optional capability group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    ToOne,
    OneToMany,
    ManyToMany,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ToOne => "to-one relation",
            Capability::OneToMany => "one-to-many relation",
            Capability::ManyToMany => "many-to-many relation",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Many-to-many Index Descriptor
// ============================================================================

/// Names one side of a many-to-many associative index
///
/// Each side of the relation keeps its own index; `this_side` and
/// `other_side` are the relation field names on the entity that owns the
/// index and on the opposite entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManyToManyIndex {
    pub relation: String,
    pub this_side: String,
    pub other_side: String,
}

impl ManyToManyIndex {
    pub fn new(
        relation: impl Into<String>,
        this_side: impl Into<String>,
        other_side: impl Into<String>,
    ) -> Self {
        Self {
            relation: relation.into(),
            this_side: this_side.into(),
            other_side: other_side.into(),
        }
    }

    /// The descriptor of the opposite side's index
    pub fn mirrored(&self) -> Self {
        Self {
            relation: self.relation.clone(),
            this_side: self.other_side.clone(),
            other_side: self.this_side.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
