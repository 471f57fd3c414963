//! Naming helpers
//!
//! Canonical naming forms for entities and the deterministic names the
//! classifier derives for relations and foreign keys.
//!
//! ## Conventions
//!
//! - **Type name**: UpperCamel singular (`BlogPost`)
//! - **Singular**: lowerCamel (`blogPost`)
//! - **Plural**: lowerCamel plural (`blogPosts`)
//! - **Foreign key**: `<field>Id` (`author` -> `authorId`)
//! - **Generated relation name**: `<SourceType>And<TargetType>On<field>`

use heck::{ToLowerCamelCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};

// ============================================================================
// EntityNames
// ============================================================================

/// Naming forms derived from an entity's declared name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityNames {
    /// UpperCamel singular, e.g. "BlogPost"
    pub type_name: String,
    /// lowerCamel singular, e.g. "blogPost"
    pub singular: String,
    /// lowerCamel plural, e.g. "blogPosts"
    pub plural: String,
}

impl EntityNames {
    /// Derive every naming form from a declared name
    pub fn from_name(name: &str) -> Self {
        let singular = name.to_lower_camel_case();
        Self {
            type_name: name.to_upper_camel_case(),
            plural: pluralize(&singular),
            singular,
        }
    }
}

// ============================================================================
// Relation and Key Names
// ============================================================================

/// Generate the name of a relation that was not named explicitly
///
/// # Examples
///
/// - ("Team", "User", "players") -> "TeamAndUserOnplayers"
/// - ("Post", "User", "author") -> "PostAndUserOnauthor"
pub fn generate_relation_name(source_type: &str, target_type: &str, source_field: &str) -> String {
    format!("{}And{}On{}", source_type, target_type, source_field)
}

/// Generate the foreign key stored for a relation field
///
/// # Examples
///
/// - "author" -> "authorId"
/// - "players" -> "playersId"
pub fn foreign_key_name(field: &str) -> String {
    format!("{}Id", field)
}

// ============================================================================
// Word Helpers
// ============================================================================

/// Capitalize the first letter of a string
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Pluralize a lowerCamel or UpperCamel word using English rules
///
/// Only the last camel-case segment is inflected, so "salesPerson"
/// becomes "salesPeople".
pub fn pluralize(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    let split = s
        .char_indices()
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    let (head, tail) = s.split_at(split);

    let lower = tail.to_lowercase();
    let irregular = match lower.as_str() {
        "person" => Some("people"),
        "child" => Some("children"),
        "man" => Some("men"),
        "woman" => Some("women"),
        "foot" => Some("feet"),
        "tooth" => Some("teeth"),
        "goose" => Some("geese"),
        "mouse" => Some("mice"),
        _ => None,
    };
    if let Some(plural) = irregular {
        let inflected = if tail.starts_with(char::is_uppercase) {
            capitalize(plural)
        } else {
            plural.to_string()
        };
        return format!("{}{}", head, inflected);
    }

    // Words ending in 's', 'x', 'z', 'ch', 'sh'
    if s.ends_with('s')
        || s.ends_with('x')
        || s.ends_with('z')
        || s.ends_with("ch")
        || s.ends_with("sh")
    {
        return format!("{}es", s);
    }

    // Consonant + 'y'
    if s.ends_with('y') {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() >= 2 && !"aeiou".contains(chars[chars.len() - 2]) {
            return format!("{}ies", &s[..s.len() - 1]);
        }
    }

    if s.ends_with("fe") {
        return format!("{}ves", &s[..s.len() - 2]);
    }
    if s.ends_with('f') {
        return format!("{}ves", &s[..s.len() - 1]);
    }

    format!("{}s", s)
}

/// Check if a string is a valid schema identifier
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entity_names() {
        let names = EntityNames::from_name("BlogPost");
        assert_eq!(names.type_name, "BlogPost");
        assert_eq!(names.singular, "blogPost");
        assert_eq!(names.plural, "blogPosts");

        let names = EntityNames::from_name("category");
        assert_eq!(names.type_name, "Category");
        assert_eq!(names.plural, "categories");
    }

    #[test]
    fn test_generate_relation_name() {
        assert_eq!(
            generate_relation_name("Team", "User", "players"),
            "TeamAndUserOnplayers"
        );
    }

    #[test]
    fn test_foreign_key_name() {
        assert_eq!(foreign_key_name("author"), "authorId");
        assert_eq!(foreign_key_name("players"), "playersId");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("bus"), "buses");
        assert_eq!(pluralize("leaf"), "leaves");
        assert_eq!(pluralize("key"), "keys");
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("salesPerson"), "salesPeople");
        assert_eq!(pluralize("blogPost"), "blogPosts");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("user"), "User");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("author"));
        assert!(is_valid_identifier("_hidden"));
        assert!(!is_valid_identifier("1st"));
        assert!(!is_valid_identifier("with-dash"));
        assert!(!is_valid_identifier(""));
    }
}
