//! Bidirectional many-to-many
//!
//! No key. Each side keeps an associative index named after the relation
//! and both field names; every link is written to both indexes.

use super::GeneratorContext;
use crate::bundle::BehaviorBundle;
use crate::hook::{Link, RelationHook};
use tessera_core::{Capability, EngineError, EngineResult, ManyToManyIndex};
use tessera_ir::{Relation, Side};

pub fn generate(ctx: &GeneratorContext, relation: &Relation) -> EngineResult<Vec<BehaviorBundle>> {
    let (Some(source_field), Some(target_field)) = (&relation.source.field, &relation.target.field) else {
        return Err(EngineError::RelationMismatch {
            relation: relation.name.clone(),
            message: "a many-to-many relation needs a field on both sides".to_string(),
        });
    };

    ctx.require(relation, relation.source.entity, Capability::ManyToMany)?;
    ctx.require(relation, relation.target.entity, Capability::ManyToMany)?;

    let index = ManyToManyIndex::new(&relation.name, source_field, target_field);
    let source = RelationHook::for_side(
        relation,
        Side::Source,
        Link::Associative {
            index: index.clone(),
        },
    )?;
    let target = RelationHook::for_side(
        relation,
        Side::Target,
        Link::Associative {
            index: index.mirrored(),
        },
    )?;
    Ok(vec![
        BehaviorBundle::from_hook(source),
        BehaviorBundle::from_hook(target),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_helpers::classified;
    use tessera_core::Capabilities;
    use tessera_ir::{Entity, Field};

    fn membership() -> Vec<Entity> {
        vec![
            Entity::new("User").with_field(Field::relation("groups", "Group").list()),
            Entity::new("Group").with_field(Field::relation("members", "User").list()),
        ]
    }

    #[test]
    fn test_both_sides_bundled() {
        let (ctx, relations) = classified(membership(), Capabilities::ALL);
        let bundles = generate(&ctx, &relations[0]).unwrap();
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].field, "groups");
        assert_eq!(bundles[1].field, "members");
    }

    #[test]
    fn test_requires_many_to_many_capability() {
        let caps = Capabilities {
            to_one: true,
            one_to_many: true,
            many_to_many: false,
        };
        let (ctx, relations) = classified(membership(), caps);
        assert!(matches!(
            generate(&ctx, &relations[0]),
            Err(EngineError::MissingCapability { .. })
        ));
    }
}
