//! Schema validation
//!
//! Rules run once when a schema is built and report [`Issue`]s. Any error
//! aborts the build; warnings are logged and the build continues.

use crate::schema::Schema;
use std::collections::HashSet;
use std::fmt;
use tessera_core::{EngineError, EngineResult};

// ============================================================================
// Issues
// ============================================================================

/// Code attached to a reported issue
pub trait IssueCode: fmt::Debug + Copy {
    /// Prefix used when the issue is displayed
    const SEVERITY: &'static str;
}

/// Schema-breaking problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorCode {
    AmbiguousEntityName,
    UnresolvedTarget,
    InvalidOwner,
    InvalidRelationName,
}

impl IssueCode for ValidationErrorCode {
    const SEVERITY: &'static str = "error";
}

/// Suspicious but harmless declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationWarningCode {
    UniqueRelationField,
    NullableRelationItems,
    OwnerOnManyRelation,
    NoFields,
}

impl IssueCode for ValidationWarningCode {
    const SEVERITY: &'static str = "warning";
}

/// One finding of a rule, located at an entity or `Entity.field` path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue<C> {
    pub code: C,
    pub path: String,
    pub message: String,
}

impl<C: IssueCode> Issue<C> {
    pub fn new(code: C, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl<C: IssueCode> fmt::Display for Issue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", C::SEVERITY, self.path, self.message)
    }
}

pub type ValidationError = Issue<ValidationErrorCode>;
pub type ValidationWarning = Issue<ValidationWarningCode>;

// ============================================================================
// ValidationResult
// ============================================================================

/// Everything the rules reported
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(&mut self, code: ValidationErrorCode, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Issue::new(code, path, message));
    }

    pub fn warn(&mut self, code: ValidationWarningCode, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Issue::new(code, path, message));
    }

    /// Append the findings of another rule
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Log the warnings and fail with every error joined into one message
    pub fn into_result(self) -> EngineResult<()> {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
        if self.is_valid() {
            return Ok(());
        }
        let message = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(EngineError::validation(message))
    }
}

// ============================================================================
// Rules
// ============================================================================

/// A whole-schema check
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, schema: &Schema, result: &mut ValidationResult);
}

/// Runs a list of rules in order
#[derive(Default)]
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rules every schema build runs
    pub fn with_default_rules() -> Self {
        Self::new()
            .with_rule(EntityNamesRule)
            .with_rule(RelationTargetsRule)
            .with_rule(RelationConfigRule)
    }

    pub fn with_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn validate(&self, schema: &Schema) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for rule in &self.rules {
            let before = (result.errors.len(), result.warnings.len());
            rule.check(schema, &mut result);
            tracing::trace!(
                "Rule '{}': {} error(s), {} warning(s)",
                rule.name(),
                result.errors.len() - before.0,
                result.warnings.len() - before.1
            );
        }
        result
    }
}

// ============================================================================
// Built-in Rules
// ============================================================================

/// Entity names must not collide case-insensitively, since generated type
/// names and plural forms would clash
pub struct EntityNamesRule;

impl ValidationRule for EntityNamesRule {
    fn name(&self) -> &'static str {
        "entity_names"
    }

    fn check(&self, schema: &Schema, result: &mut ValidationResult) {
        let mut seen: HashSet<String> = HashSet::new();
        for entity in schema.entities() {
            if !seen.insert(entity.type_name().to_lowercase()) {
                result.error(
                    ValidationErrorCode::AmbiguousEntityName,
                    &entity.name,
                    format!("Entity name '{}' differs from another only by case", entity.name),
                );
            }
            if entity.field_count() == 1 {
                result.warn(
                    ValidationWarningCode::NoFields,
                    &entity.name,
                    "No fields besides the identifier",
                );
            }
        }
    }
}

/// Every relation target must be resolved
pub struct RelationTargetsRule;

impl ValidationRule for RelationTargetsRule {
    fn name(&self) -> &'static str {
        "relation_targets"
    }

    fn check(&self, schema: &Schema, result: &mut ValidationResult) {
        for entity in schema.entities() {
            for field in entity.relation_fields() {
                let Some(relation) = field.relation_field() else {
                    continue;
                };
                if relation.target.is_deferred() {
                    result.error(
                        ValidationErrorCode::UnresolvedTarget,
                        format!("{}.{}", entity.name, field.name),
                        format!("Target '{}' was never resolved", relation.target.name()),
                    );
                }
            }
        }
    }
}

/// Relation names and owner settings must make sense
pub struct RelationConfigRule;

impl ValidationRule for RelationConfigRule {
    fn name(&self) -> &'static str {
        "relation_config"
    }

    fn check(&self, schema: &Schema, result: &mut ValidationResult) {
        for entity in schema.entities() {
            for field in entity.relation_fields() {
                let Some(relation) = field.relation_field() else {
                    continue;
                };
                let path = format!("{}.{}", entity.name, field.name);

                if relation
                    .relation_name
                    .as_deref()
                    .is_some_and(|name| name.trim().is_empty())
                {
                    result.error(
                        ValidationErrorCode::InvalidRelationName,
                        &path,
                        "Relation name cannot be empty",
                    );
                }

                if let Some(owner) = &relation.config.owner {
                    let target = relation.target.name();
                    let names_a_side = owner == &entity.name
                        || owner == target
                        || owner == &field.name
                        || schema
                            .entity_by_name(target)
                            .is_some_and(|t| t.has_field(owner));
                    if !names_a_side {
                        result.error(
                            ValidationErrorCode::InvalidOwner,
                            &path,
                            format!("Owner '{}' is neither '{}' nor '{}'", owner, entity.name, target),
                        );
                    }
                    if field.list {
                        result.warn(
                            ValidationWarningCode::OwnerOnManyRelation,
                            &path,
                            "Owner configuration only applies to one-to-one relations",
                        );
                    }
                }

                if field.unique {
                    result.warn(
                        ValidationWarningCode::UniqueRelationField,
                        &path,
                        "Relation fields cannot be used as unique filters",
                    );
                }

                if field.item_nullable {
                    result.warn(
                        ValidationWarningCode::NullableRelationItems,
                        &path,
                        "Relation lists never contain null items",
                    );
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, Field};
    use tessera_core::ScalarType;

    #[test]
    fn test_into_result_joins_errors() {
        let mut result = ValidationResult::ok();
        let mut other = ValidationResult::ok();
        other.error(ValidationErrorCode::InvalidOwner, "Book.author", "bad owner");
        other.error(ValidationErrorCode::UnresolvedTarget, "Book.shelf", "no Shelf");
        result.merge(other);
        assert!(!result.is_valid());
        assert!(!result.has_warnings());

        let err = result.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema validation error: error at Book.author: bad owner; error at Book.shelf: no Shelf"
        );
    }

    #[test]
    fn test_case_insensitive_entity_names_rejected() {
        let err = crate::Schema::builder()
            .entity(Entity::new("User"))
            .entity(Entity::new("user"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("differs from another only by case"));
    }

    #[test]
    fn test_invalid_owner_rejected() {
        let err = crate::Schema::builder()
            .entity(Entity::new("Book").with_field(Field::relation("author", "User").owned_by("Library")))
            .entity(Entity::new("User").with_field(Field::relation("book", "Book")))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Owner 'Library'"));
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let schema = crate::Schema::builder()
            .entity(
                Entity::new("Team")
                    .with_field(Field::scalar("name", ScalarType::String))
                    .with_field(Field::relation("players", "User").list().with_nullable_items()),
            )
            .entity(Entity::new("User"))
            .build()
            .unwrap();

        let result = Validator::with_default_rules().validate(&schema);
        assert!(result.is_valid());
        let codes: Vec<_> = result.warnings.iter().map(|w| w.code).collect();
        assert!(codes.contains(&ValidationWarningCode::NullableRelationItems));
        assert!(codes.contains(&ValidationWarningCode::NoFields));

        let nullable = result
            .warnings
            .iter()
            .find(|w| w.code == ValidationWarningCode::NullableRelationItems)
            .unwrap();
        assert_eq!(
            nullable.to_string(),
            "warning at Team.players: Relation lists never contain null items"
        );
    }

    struct NoTeams;

    impl ValidationRule for NoTeams {
        fn name(&self) -> &'static str {
            "no_teams"
        }

        fn check(&self, schema: &Schema, result: &mut ValidationResult) {
            if schema.entity_by_name("Team").is_some() {
                result.error(ValidationErrorCode::AmbiguousEntityName, "Team", "teams are not allowed");
            }
        }
    }

    #[test]
    fn test_custom_rule() {
        let schema = crate::Schema::builder()
            .entity(Entity::new("Team").with_field(Field::scalar("name", ScalarType::String)))
            .build()
            .unwrap();
        assert!(Validator::new().validate(&schema).is_valid());
        assert!(!Validator::new().with_rule(NoTeams).validate(&schema).is_valid());
    }
}
