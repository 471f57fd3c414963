//! Relation classification
//!
//! [`classify`] turns the relation fields of a built [`Schema`] into a list
//! of typed, named [`Relation`]s with a deterministic foreign key owner.
//!
//! ## Pairing
//!
//! - Fields carrying an explicit relation name are paired by that name. A
//!   name used once yields a unidirectional relation, a name used twice a
//!   bidirectional one.
//! - Unnamed fields are bucketed by `(source entity, target entity)`. A bucket
//!   holding a single field whose reciprocal bucket also holds a single field
//!   forms a bidirectional relation; every other unnamed field is
//!   unidirectional.
//!
//! ## Key ownership
//!
//! | type | key |
//! |---|---|
//! | uni one-to-one | `<field>Id` on the source |
//! | uni one-to-many | `<field>Id` on the target |
//! | bi one-to-many | `<field>Id` on the source (the to-one field's entity) |
//! | bi one-to-one | explicit owner, else the only side with to-one support, else alphabetical |
//! | bi many-to-many | none, associative indexes on both sides |

use crate::naming::{foreign_key_name, generate_relation_name};
use crate::relation::{Classification, Relation, RelationEnd, RelationStorage, Side};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tessera_core::{Cardinality, EngineError, EngineResult, EntityId, RelationType};

// ============================================================================
// Options
// ============================================================================

/// What to do when a third field reuses an explicit relation name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameReusePolicy {
    /// Fail the bind with `AmbiguousRelationName`
    #[default]
    Reject,
    /// Replace the second side with the latest field
    Overwrite,
}

/// What to do when two relations end up with the same name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Fail the bind with `DuplicateRelationName`
    #[default]
    Reject,
    /// Keep both relations and log a warning
    Permit,
}

/// Classifier configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    pub relation_name_reuse: NameReusePolicy,
    pub generated_name_collision: CollisionPolicy,
}

impl ClassifierOptions {
    pub fn with_relation_name_reuse(mut self, policy: NameReusePolicy) -> Self {
        self.relation_name_reuse = policy;
        self
    }

    pub fn with_generated_name_collision(mut self, policy: CollisionPolicy) -> Self {
        self.generated_name_collision = policy;
        self
    }
}

// ============================================================================
// Classification
// ============================================================================

/// One relation field, reduced to what classification needs
#[derive(Debug, Clone)]
struct FieldTuple {
    entity: EntityId,
    field: String,
    cardinality: Cardinality,
    target: EntityId,
    owner: Option<String>,
}

#[derive(Debug)]
struct NamedBucket {
    first: FieldTuple,
    second: Option<FieldTuple>,
}

/// Classify every relation field of a schema
///
/// Pure and deterministic: the same schema always yields the same relations
/// in the same order with the same owners.
pub fn classify(schema: &Schema, options: &ClassifierOptions) -> EngineResult<Classification> {
    let mut named: Vec<(String, NamedBucket)> = Vec::new();
    let mut anonymous: Vec<((EntityId, EntityId), Vec<FieldTuple>)> = Vec::new();

    // Step 1: scan relation fields in declaration order
    for entity in schema.entities() {
        for field in entity.relation_fields() {
            let Some(relation) = field.relation_field() else {
                continue;
            };
            let target = relation
                .target
                .id()
                .ok_or_else(|| EngineError::UnknownEntity(relation.target.name().to_string()))?;
            let tuple = FieldTuple {
                entity: entity.id,
                field: field.name.clone(),
                cardinality: Cardinality::of_list(field.list),
                target,
                owner: relation.config.owner.clone(),
            };

            match &relation.relation_name {
                Some(name) => add_named(schema, &mut named, name, tuple, options)?,
                None => match anonymous.iter_mut().find(|(key, _)| *key == (entity.id, target)) {
                    Some((_, bucket)) => bucket.push(tuple),
                    None => anonymous.push(((entity.id, target), vec![tuple])),
                },
            }
        }
    }

    let mut relations = Vec::new();

    // Step 2: named buckets first
    for (name, bucket) in named {
        let relation = match bucket.second {
            None => unidirectional(schema, name, bucket.first),
            Some(second) => {
                let first = bucket.first;
                if first.target != second.entity || second.target != first.entity {
                    return Err(EngineError::RelationMismatch {
                        relation: name,
                        message: format!(
                            "'{}.{}' and '{}.{}' do not point at each other",
                            schema.entity(first.entity).name,
                            first.field,
                            schema.entity(second.entity).name,
                            second.field
                        ),
                    });
                }
                bidirectional(schema, name, first, second)?
            }
        };
        relations.push(relation);
    }

    // Step 3: anonymous buckets
    let sizes: HashMap<(EntityId, EntityId), usize> = anonymous
        .iter()
        .map(|(key, bucket)| (*key, bucket.len()))
        .collect();
    let mut consumed: HashSet<(EntityId, EntityId)> = HashSet::new();

    for ((source, target), bucket) in &anonymous {
        let key = (*source, *target);
        if consumed.contains(&key) {
            continue;
        }
        let reciprocal = (*target, *source);
        let pairs = source != target
            && bucket.len() == 1
            && sizes.get(&reciprocal) == Some(&1)
            && !consumed.contains(&reciprocal);

        if pairs {
            let other = anonymous
                .iter()
                .find(|(k, _)| *k == reciprocal)
                .and_then(|(_, b)| b.first())
                .cloned()
                .ok_or_else(|| EngineError::internal("reciprocal bucket vanished"))?;
            let this = bucket[0].clone();
            let name = generated_name(schema, &this);
            relations.push(bidirectional(schema, name, this, other)?);
            consumed.insert(key);
            consumed.insert(reciprocal);
        } else {
            for tuple in bucket {
                let name = generated_name(schema, tuple);
                relations.push(unidirectional(schema, name, tuple.clone()));
            }
            consumed.insert(key);
        }
    }

    check_names(&relations, options)?;
    check_keys(schema, &relations)?;

    for relation in &relations {
        tracing::debug!("Classified relation {}", relation);
    }

    Ok(Classification::new(relations))
}

fn add_named(
    schema: &Schema,
    named: &mut Vec<(String, NamedBucket)>,
    name: &str,
    tuple: FieldTuple,
    options: &ClassifierOptions,
) -> EngineResult<()> {
    let Some((_, bucket)) = named.iter_mut().find(|(n, _)| n == name) else {
        named.push((
            name.to_string(),
            NamedBucket {
                first: tuple,
                second: None,
            },
        ));
        return Ok(());
    };

    if bucket.second.is_some() {
        match options.relation_name_reuse {
            NameReusePolicy::Reject => {
                return Err(EngineError::AmbiguousRelationName {
                    relation: name.to_string(),
                    entity: schema.entity(tuple.entity).name.clone(),
                    field: tuple.field,
                });
            }
            NameReusePolicy::Overwrite => {
                tracing::warn!(
                    "Relation name '{}' reused by field '{}'; replacing its second side",
                    name,
                    tuple.field
                );
            }
        }
    }
    bucket.second = Some(tuple);
    Ok(())
}

fn generated_name(schema: &Schema, tuple: &FieldTuple) -> String {
    generate_relation_name(
        schema.entity(tuple.entity).type_name(),
        schema.entity(tuple.target).type_name(),
        &tuple.field,
    )
}

fn end_of(schema: &Schema, tuple: &FieldTuple) -> RelationEnd {
    RelationEnd::new(
        tuple.entity,
        schema.entity(tuple.entity).name.clone(),
        Some(tuple.field.clone()),
    )
}

fn unidirectional(schema: &Schema, name: String, tuple: FieldTuple) -> Relation {
    let kind = RelationType::from_cardinalities(tuple.cardinality, None);
    let key = foreign_key_name(&tuple.field);
    let owner = match kind {
        RelationType::UniOneToMany => Side::Target,
        _ => Side::Source,
    };
    Relation {
        name,
        kind,
        source: end_of(schema, &tuple),
        target: RelationEnd::new(tuple.target, schema.entity(tuple.target).name.clone(), None),
        storage: RelationStorage::ForeignKey { owner, key },
    }
}

fn bidirectional(
    schema: &Schema,
    name: String,
    first: FieldTuple,
    second: FieldTuple,
) -> EngineResult<Relation> {
    let kind = RelationType::from_cardinalities(first.cardinality, Some(second.cardinality));

    // The to-one field's entity is always the source of a one-to-many relation
    let (source, target) = if kind == RelationType::BiOneToMany && first.cardinality == Cardinality::Many {
        (second, first)
    } else {
        (first, second)
    };

    let storage = match kind {
        RelationType::BiManyToMany => RelationStorage::AssociativeIndex,
        RelationType::BiOneToOne => {
            let owner = one_to_one_owner(schema, &name, &source, &target)?;
            let field = match owner {
                Side::Source => &source.field,
                Side::Target => &target.field,
            };
            RelationStorage::ForeignKey {
                owner,
                key: foreign_key_name(field),
            }
        }
        _ => RelationStorage::ForeignKey {
            owner: Side::Source,
            key: foreign_key_name(&source.field),
        },
    };

    Ok(Relation {
        name,
        kind,
        source: end_of(schema, &source),
        target: end_of(schema, &target),
        storage,
    })
}

/// Pick the end of a one-to-one relation that stores the key
fn one_to_one_owner(
    schema: &Schema,
    relation: &str,
    source: &FieldTuple,
    target: &FieldTuple,
) -> EngineResult<Side> {
    // Explicit configuration on either field
    let mut explicit: Option<Side> = None;
    for tuple in [source, target] {
        let Some(owner) = &tuple.owner else {
            continue;
        };
        let side = owner_side(schema, relation, owner, source, target)?;
        match explicit {
            Some(previous) if previous != side => {
                return Err(EngineError::ConflictingOwner {
                    relation: relation.to_string(),
                    message: format!(
                        "'{}.{}' and '{}.{}' name different owners",
                        schema.entity(source.entity).name,
                        source.field,
                        schema.entity(target.entity).name,
                        target.field
                    ),
                });
            }
            _ => explicit = Some(side),
        }
    }
    if let Some(side) = explicit {
        return Ok(side);
    }

    // Prefer the only side whose adapter can look records up by key
    let source_lookup = schema.entity(source.entity).capabilities().to_one;
    let target_lookup = schema.entity(target.entity).capabilities().to_one;
    if source_lookup != target_lookup {
        return Ok(if source_lookup { Side::Source } else { Side::Target });
    }

    // Stable tie-break
    let source_key = (&schema.entity(source.entity).name, &source.field);
    let target_key = (&schema.entity(target.entity).name, &target.field);
    Ok(if source_key <= target_key {
        Side::Source
    } else {
        Side::Target
    })
}

/// Resolve an owner setting: field names first, then entity names
fn owner_side(
    schema: &Schema,
    relation: &str,
    owner: &str,
    source: &FieldTuple,
    target: &FieldTuple,
) -> EngineResult<Side> {
    if owner == source.field {
        return Ok(Side::Source);
    }
    if owner == target.field {
        return Ok(Side::Target);
    }

    let source_name = &schema.entity(source.entity).name;
    let target_name = &schema.entity(target.entity).name;
    match (owner == source_name, owner == target_name) {
        (true, false) => Ok(Side::Source),
        (false, true) => Ok(Side::Target),
        (true, true) => Err(EngineError::ConflictingOwner {
            relation: relation.to_string(),
            message: format!(
                "'{}' names both sides of a self-relation; name a field instead",
                owner
            ),
        }),
        (false, false) => Err(EngineError::ConflictingOwner {
            relation: relation.to_string(),
            message: format!("owner '{}' is neither '{}' nor '{}'", owner, source_name, target_name),
        }),
    }
}

fn check_names(relations: &[Relation], options: &ClassifierOptions) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for relation in relations {
        if seen.insert(relation.name.as_str()) {
            continue;
        }
        match options.generated_name_collision {
            CollisionPolicy::Reject => {
                return Err(EngineError::DuplicateRelationName(relation.name.clone()));
            }
            CollisionPolicy::Permit => {
                tracing::warn!("Relation name '{}' is used by more than one relation", relation.name);
            }
        }
    }
    Ok(())
}

/// Every foreign key must live in its own field on the owning entity
fn check_keys(schema: &Schema, relations: &[Relation]) -> EngineResult<()> {
    let mut seen: HashMap<(EntityId, &str), &str> = HashMap::new();
    for relation in relations {
        let Some((side, key)) = relation.foreign_key() else {
            continue;
        };
        let entity = relation.end(side).entity;
        if let Some(first) = seen.insert((entity, key), relation.name.as_str()) {
            return Err(EngineError::DuplicateForeignKey {
                entity: schema.entity(entity).name.clone(),
                key: key.to_string(),
                first: first.to_string(),
                second: relation.name.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubAdapter;
    use crate::{Entity, Field};
    use pretty_assertions::assert_eq;
    use tessera_core::{Capabilities, ScalarType};

    fn build(entities: Vec<Entity>) -> Schema {
        let mut builder = Schema::builder();
        for entity in entities {
            builder.add_entity(entity);
        }
        builder.build().unwrap()
    }

    fn classify_default(schema: &Schema) -> Classification {
        classify(schema, &ClassifierOptions::default()).unwrap()
    }

    fn blog() -> Schema {
        build(vec![
            Entity::new("Post")
                .with_field(Field::scalar("title", ScalarType::String))
                .with_field(Field::relation("author", "User")),
            Entity::new("User").with_field(Field::relation("posts", "Post").list()),
        ])
    }

    #[test]
    fn test_unnamed_reciprocal_fields_pair() {
        let schema = blog();
        let classification = classify_default(&schema);
        assert_eq!(classification.len(), 1);

        let relation = &classification.relations()[0];
        assert_eq!(relation.kind, RelationType::BiOneToMany);
        assert_eq!(relation.name, "PostAndUserOnauthor");
        assert_eq!(relation.source.entity_name, "Post");
        assert_eq!(relation.target.field.as_deref(), Some("posts"));
        assert_eq!(relation.foreign_key(), Some((Side::Source, "authorId")));
    }

    #[test]
    fn test_one_to_many_orients_on_to_one_field() {
        // The list field is declared first, but the to-one side stays the source
        let schema = build(vec![
            Entity::new("User").with_field(Field::relation("posts", "Post").list()),
            Entity::new("Post").with_field(Field::relation("author", "User")),
        ]);
        let classification = classify_default(&schema);
        let relation = &classification.relations()[0];
        assert_eq!(relation.kind, RelationType::BiOneToMany);
        assert_eq!(relation.name, "UserAndPostOnposts");
        assert_eq!(relation.source.label(), "Post.author");
        assert_eq!(relation.target.label(), "User.posts");
        assert_eq!(relation.foreign_key(), Some((Side::Source, "authorId")));
    }

    #[test]
    fn test_unidirectional_relations() {
        let schema = build(vec![
            Entity::new("Team")
                .with_field(Field::relation("players", "User").list())
                .with_field(Field::relation("captain", "User")),
            Entity::new("User"),
        ]);
        let classification = classify_default(&schema);
        let relations = classification.relations();
        assert_eq!(relations.len(), 2);

        assert_eq!(relations[0].kind, RelationType::UniOneToMany);
        assert_eq!(relations[0].name, "TeamAndUserOnplayers");
        assert_eq!(relations[0].target.field, None);
        assert_eq!(relations[0].foreign_key(), Some((Side::Target, "playersId")));

        assert_eq!(relations[1].kind, RelationType::UniOneToOne);
        assert_eq!(relations[1].foreign_key(), Some((Side::Source, "captainId")));
    }

    #[test]
    fn test_ambiguous_unnamed_fields_stay_unidirectional() {
        let schema = build(vec![
            Entity::new("Match")
                .with_field(Field::relation("home", "Team"))
                .with_field(Field::relation("away", "Team")),
            Entity::new("Team").with_field(Field::relation("matches", "Match").list()),
        ]);
        let classification = classify_default(&schema);
        let kinds: Vec<_> = classification.relations().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RelationType::UniOneToOne,
                RelationType::UniOneToOne,
                RelationType::UniOneToMany
            ]
        );
    }

    #[test]
    fn test_named_relation_pairs_across_ambiguity() {
        let schema = build(vec![
            Entity::new("Match")
                .with_field(Field::relation("home", "Team").with_relation_name("HomeGames"))
                .with_field(Field::relation("away", "Team")),
            Entity::new("Team")
                .with_field(Field::relation("homeGames", "Match").list().with_relation_name("HomeGames")),
        ]);
        let classification = classify_default(&schema);
        assert_eq!(classification.len(), 2);

        let home = &classification.relations()[0];
        assert_eq!(home.name, "HomeGames");
        assert_eq!(home.kind, RelationType::BiOneToMany);
        assert_eq!(home.source.label(), "Match.home");

        let away = &classification.relations()[1];
        assert_eq!(away.kind, RelationType::UniOneToOne);
        assert_eq!(away.name, "MatchAndTeamOnaway");
    }

    #[test]
    fn test_named_relation_mismatch() {
        let schema = build(vec![
            Entity::new("A").with_field(Field::relation("b", "B").with_relation_name("Link")),
            Entity::new("B"),
            Entity::new("C").with_field(Field::relation("a", "A").with_relation_name("Link")),
        ]);
        let err = classify(&schema, &ClassifierOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::RelationMismatch { .. }));
    }

    #[test]
    fn test_relation_name_reuse_policy() {
        let schema = build(vec![
            Entity::new("A")
                .with_field(Field::relation("b1", "B").with_relation_name("Link"))
                .with_field(Field::relation("b2", "B").with_relation_name("Link")),
            Entity::new("B").with_field(Field::relation("a", "A").with_relation_name("Link")),
        ]);
        let err = classify(&schema, &ClassifierOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::AmbiguousRelationName { .. }));

        let options = ClassifierOptions::default().with_relation_name_reuse(NameReusePolicy::Overwrite);
        let classification = classify(&schema, &options).unwrap();
        let relation = &classification.relations()[0];
        assert_eq!(relation.kind, RelationType::BiOneToOne);
        assert_eq!(relation.target.label(), "B.a");
        assert_eq!(classification.relation_for(schema.entity_id("A").unwrap(), "b2"), None);
    }

    #[test]
    fn test_many_to_many() {
        let schema = build(vec![
            Entity::new("User").with_field(Field::relation("groups", "Group").list()),
            Entity::new("Group").with_field(Field::relation("members", "User").list()),
        ]);
        let classification = classify_default(&schema);
        let relation = &classification.relations()[0];
        assert_eq!(relation.kind, RelationType::BiManyToMany);
        assert_eq!(relation.storage, RelationStorage::AssociativeIndex);
        assert_eq!(relation.key_owner(), None);
    }

    #[test]
    fn test_self_relations_are_unidirectional() {
        let schema = build(vec![
            Entity::new("User")
                .with_field(Field::relation("manager", "User"))
                .with_field(Field::relation("reports", "User").list()),
        ]);
        let classification = classify_default(&schema);
        assert_eq!(classification.len(), 2);
        assert!(classification.relations().iter().all(|r| !r.kind.is_bidirectional()));
    }

    #[test]
    fn test_one_to_one_owner_alphabetical_and_idempotent() {
        let schema = build(vec![
            Entity::new("User").with_field(Field::relation("profile", "Profile")),
            Entity::new("Profile").with_field(Field::relation("user", "User")),
        ]);
        let first = classify_default(&schema);
        let relation = &first.relations()[0];
        assert_eq!(relation.kind, RelationType::BiOneToOne);
        assert_eq!(relation.key_owner().unwrap().entity_name, "Profile");
        assert_eq!(relation.foreign_key().unwrap().1, "userId");

        for _ in 0..3 {
            assert_eq!(classify_default(&schema).relations(), first.relations());
        }
    }

    #[test]
    fn test_one_to_one_owner_explicit() {
        let schema = build(vec![
            Entity::new("Book").with_field(Field::relation("author", "User").owned_by("Book")),
            Entity::new("User").with_field(Field::relation("book", "Book")),
        ]);
        let classification = classify_default(&schema);
        let relation = &classification.relations()[0];
        assert_eq!(relation.key_owner().unwrap().entity_name, "Book");
        assert_eq!(relation.foreign_key().unwrap().1, "authorId");
    }

    #[test]
    fn test_one_to_one_owner_conflict() {
        let schema = build(vec![
            Entity::new("Book").with_field(Field::relation("author", "User").owned_by("Book")),
            Entity::new("User").with_field(Field::relation("book", "Book").owned_by("User")),
        ]);
        let err = classify(&schema, &ClassifierOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::ConflictingOwner { .. }));
    }

    #[test]
    fn test_one_to_one_owner_prefers_lookup_capability() {
        let schema = Schema::builder()
            .entity(Entity::new("Account").with_field(Field::relation("user", "User")))
            .entity(Entity::new("User").with_field(Field::relation("account", "Account")))
            .adapter("Account", StubAdapter::shared("Account", Capabilities::NONE))
            .adapter("User", StubAdapter::shared("User", Capabilities::ALL))
            .build()
            .unwrap();
        let classification = classify_default(&schema);
        let relation = &classification.relations()[0];
        assert_eq!(relation.key_owner().unwrap().entity_name, "User");
        assert_eq!(relation.foreign_key().unwrap().1, "accountId");
    }

    #[test]
    fn test_generated_name_collision_policy() {
        let schema = build(vec![
            Entity::new("Team")
                .with_field(Field::relation("players", "User").list())
                .with_field(
                    Field::relation("coach", "User").with_relation_name("TeamAndUserOnplayers"),
                ),
            Entity::new("User"),
        ]);
        let err = classify(&schema, &ClassifierOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateRelationName(name) if name == "TeamAndUserOnplayers"));

        let options =
            ClassifierOptions::default().with_generated_name_collision(CollisionPolicy::Permit);
        assert_eq!(classify(&schema, &options).unwrap().len(), 2);
    }

    #[test]
    fn test_shared_foreign_key_rejected() {
        let schema = build(vec![
            Entity::new("Team").with_field(Field::relation("players", "User").list()),
            Entity::new("Club").with_field(Field::relation("players", "User").list()),
            Entity::new("User"),
        ]);
        let err = classify(&schema, &ClassifierOptions::default()).unwrap_err();
        assert!(err.is_schema_error());
        assert_eq!(
            err.to_string(),
            "Relations 'TeamAndUserOnplayers' and 'ClubAndUserOnplayers' both store their key in 'User.playersId'"
        );

        // Same field name, different key owners
        let schema = build(vec![
            Entity::new("Team").with_field(Field::relation("captain", "User")),
            Entity::new("Club").with_field(Field::relation("captain", "User")),
            Entity::new("User"),
        ]);
        assert_eq!(classify_default(&schema).len(), 2);
    }
}
