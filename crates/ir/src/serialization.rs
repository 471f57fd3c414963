//! Schema documents
//!
//! A [`SchemaDocument`] is the structured, serde-friendly form of a schema.
//! Documents are read from JSON or TOML and turned into a [`SchemaBuilder`];
//! adapters are attached to the builder before it is built.
//!
//! ```toml
//! [[entities]]
//! name = "Post"
//!
//! [[entities.fields]]
//! name = "author"
//! type = "User"
//! ```

use crate::entity::Entity;
use crate::field::Field;
use crate::schema::{Schema, SchemaBuilder};
use heck::ToUpperCamelCase;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tessera_core::{EngineError, EngineResult, ScalarType};

/// Field type spelling for enumerations
pub const ENUM_TYPE: &str = "enum";

/// Field type spelling for nested objects
pub const OBJECT_TYPE: &str = "object";

// ============================================================================
// Document Types
// ============================================================================

/// A whole schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub entities: Vec<EntityDecl>,
}

/// One entity declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// One field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,

    /// Scalar name, `enum`, `object`, or the name of a declared entity
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub list: bool,

    #[serde(default = "default_nullable")]
    pub nullable: bool,

    #[serde(default)]
    pub item_nullable: bool,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub read_only: bool,

    /// Value generated by the store
    #[serde(default)]
    pub auto: bool,

    /// Explicit relation name (relation fields only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    /// Owning side of a one-to-one relation (relation fields only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Enumeration values (`enum` fields only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    /// Enumeration or object type name; defaults to the UpperCamel field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl FieldDecl {
    /// Create a nullable, non-list declaration
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            list: false,
            nullable: true,
            item_nullable: false,
            unique: false,
            read_only: false,
            auto: false,
            relation: None,
            owner: None,
            values: Vec::new(),
            type_ref: None,
        }
    }

    /// Convert into a field, treating `entities` as valid relation targets
    fn into_field(self, entity: &str, entities: &HashSet<&str>) -> EngineResult<Field> {
        let nested_type = || {
            self.type_ref
                .clone()
                .unwrap_or_else(|| self.name.to_upper_camel_case())
        };

        let mut field = if self.type_name == ENUM_TYPE {
            Field::enumeration(&self.name, nested_type(), self.values.clone())
        } else if self.type_name == OBJECT_TYPE {
            Field::object(&self.name, nested_type())
        } else if let Some(scalar) = ScalarType::parse(&self.type_name) {
            Field::scalar(&self.name, scalar)
        } else if entities.contains(self.type_name.as_str()) {
            let mut relation = Field::relation(&self.name, &self.type_name);
            if let Some(name) = &self.relation {
                relation = relation.with_relation_name(name);
            }
            if let Some(owner) = &self.owner {
                relation = relation.owned_by(owner);
            }
            relation
        } else {
            return Err(EngineError::InvalidDocument(format!(
                "Field '{}.{}' has unknown type '{}'",
                entity, self.name, self.type_name
            )));
        };

        if !field.is_relation() && (self.relation.is_some() || self.owner.is_some()) {
            return Err(EngineError::InvalidDocument(format!(
                "Field '{}.{}' is not a relation but declares relation settings",
                entity, self.name
            )));
        }

        field.nullable = self.nullable;
        field.list = self.list;
        field.item_nullable = self.item_nullable;
        field.unique = self.unique;
        field.read_only = self.read_only;
        field.auto_generated = self.auto;
        Ok(field)
    }
}

impl SchemaDocument {
    /// Convert the document into a schema builder
    ///
    /// Relation targets stay deferred; they are resolved by
    /// [`SchemaBuilder::build`].
    pub fn into_builder(self) -> EngineResult<SchemaBuilder> {
        let names: Vec<String> = self.entities.iter().map(|e| e.name.clone()).collect();
        let known: HashSet<&str> = names.iter().map(String::as_str).collect();

        let mut builder = Schema::builder();
        for decl in self.entities {
            let mut entity = Entity::new(&decl.name);
            if let Some(description) = decl.description {
                entity = entity.with_description(description);
            }
            for field in decl.fields {
                entity.add_field(field.into_field(&decl.name, &known)?)?;
            }
            builder.add_entity(entity);
        }
        Ok(builder)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Load Functions
// ============================================================================

/// Load a schema document from a file
///
/// Files ending in `.toml` are read as TOML, everything else as JSON.
///
/// # Example
///
/// ```rust,ignore
/// use tessera_ir::load_schema;
///
/// let schema = load_schema("blog.toml")?.into_builder()?.build()?;
/// ```
pub fn load_schema(path: impl AsRef<Path>) -> EngineResult<SchemaDocument> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let parsed = if is_toml {
        load_schema_from_toml(&text)
    } else {
        load_schema_from_str(&text)
    };

    parsed.map_err(|e| match e {
        EngineError::InvalidDocument(message) => EngineError::FileRead {
            path: path.to_path_buf(),
            message: format!("Invalid schema document: {}", message),
        },
        other => other,
    })
}

/// Load a schema document from a JSON string
pub fn load_schema_from_str(json: &str) -> EngineResult<SchemaDocument> {
    serde_json::from_str(json).map_err(|e| EngineError::InvalidDocument(e.to_string()))
}

/// Load a schema document from a TOML string
pub fn load_schema_from_toml(text: &str) -> EngineResult<SchemaDocument> {
    toml::from_str(text).map_err(|e| EngineError::InvalidDocument(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tessera_core::Cardinality;

    const BLOG_JSON: &str = r#"{
        "entities": [
            {
                "name": "Post",
                "fields": [
                    { "name": "title", "type": "String", "nullable": false },
                    { "name": "status", "type": "enum", "values": ["DRAFT", "PUBLISHED"] },
                    { "name": "author", "type": "User", "relation": "Authorship" }
                ]
            },
            {
                "name": "User",
                "fields": [
                    { "name": "email", "type": "String", "unique": true },
                    { "name": "posts", "type": "Post", "list": true, "relation": "Authorship" }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_load_from_json() {
        let document = load_schema_from_str(BLOG_JSON).unwrap();
        assert_eq!(document.entities.len(), 2);

        let schema = document.into_builder().unwrap().build().unwrap();
        let post = schema.entity_by_name("Post").unwrap();
        assert_eq!(post.field("title").unwrap().type_label(), "String!");
        assert_eq!(post.field("status").unwrap().type_label(), "Status");

        let author = post.field("author").unwrap();
        assert_eq!(author.cardinality(), Some(Cardinality::One));
        assert_eq!(
            author.relation_field().unwrap().relation_name.as_deref(),
            Some("Authorship")
        );

        let user = schema.entity_by_name("User").unwrap();
        assert!(user.is_unique_field("email"));
        assert_eq!(user.field("posts").unwrap().cardinality(), Some(Cardinality::Many));
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("team.toml");
        std::fs::write(
            &path,
            r#"
[[entities]]
name = "Team"

[[entities.fields]]
name = "players"
type = "User"
list = true

[[entities]]
name = "User"

[[entities.fields]]
name = "name"
type = "String"
"#,
        )
        .unwrap();

        let schema = load_schema(&path).unwrap().into_builder().unwrap().build().unwrap();
        let team = schema.entity_by_name("Team").unwrap();
        assert!(team.field("players").unwrap().is_relation());
        assert!(team.has_field("id"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let document = load_schema_from_str(
            r#"{ "entities": [ { "name": "Post", "fields": [ { "name": "author", "type": "Writer" } ] } ] }"#,
        )
        .unwrap();
        let err = document.into_builder().unwrap_err();
        assert!(matches!(err, EngineError::InvalidDocument(msg) if msg.contains("Writer")));
    }

    #[test]
    fn test_relation_settings_on_scalar_rejected() {
        let mut document = SchemaDocument::default();
        let mut title = FieldDecl::new("title", "String");
        title.owner = Some("Post".to_string());
        document.entities.push(EntityDecl {
            name: "Post".to_string(),
            description: None,
            fields: vec![title],
        });
        assert!(document.into_builder().is_err());
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_schema(&path).unwrap_err();
        assert!(matches!(err, EngineError::FileRead { .. }));

        let missing = load_schema(temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, EngineError::FileRead { .. }));
    }

    #[test]
    fn test_document_to_json() {
        let document = load_schema_from_str(BLOG_JSON).unwrap();
        let json = document.to_json_string().unwrap();
        assert_eq!(load_schema_from_str(&json).unwrap(), document);
    }
}
