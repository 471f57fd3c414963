//! Unidirectional one-to-many
//!
//! Only the source declares a (list) field. The key `<field>Id` lives on the
//! target's records, so linking a target sets its key to the source's id.

use super::{GeneratorContext, foreign_key};
use crate::bundle::BehaviorBundle;
use crate::hook::{Link, RelationHook};
use tessera_core::{Capability, EngineError, EngineResult};
use tessera_ir::{Relation, Side};

pub fn generate(ctx: &GeneratorContext, relation: &Relation) -> EngineResult<Vec<BehaviorBundle>> {
    let (owner, key) = foreign_key(relation)?;
    if owner != Side::Target {
        return Err(EngineError::RelationMismatch {
            relation: relation.name.clone(),
            message: "the key of a unidirectional one-to-many relation belongs to its target".to_string(),
        });
    }

    let target = relation.target.entity;
    ctx.require(relation, target, Capability::ToOne)?;
    ctx.require(relation, target, Capability::OneToMany)?;

    let hook = RelationHook::for_side(relation, Side::Source, Link::ForeignKeyList { key })?;
    Ok(vec![BehaviorBundle::from_hook(hook)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_helpers::classified;
    use tessera_core::Capabilities;
    use tessera_ir::{Entity, Field};

    fn team() -> Vec<Entity> {
        vec![
            Entity::new("Team").with_field(Field::relation("players", "User").list()),
            Entity::new("User"),
        ]
    }

    #[test]
    fn test_source_bundle_only() {
        let (ctx, relations) = classified(team(), Capabilities::ALL);
        let bundles = generate(&ctx, &relations[0]).unwrap();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].field, "players");
    }

    #[test]
    fn test_requires_one_to_many_on_target() {
        let caps = Capabilities {
            to_one: true,
            one_to_many: false,
            many_to_many: false,
        };
        let (ctx, relations) = classified(team(), caps);
        let err = generate(&ctx, &relations[0]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingCapability { entity, capability, .. }
                if entity == "User" && capability == "one-to-many relation"
        ));
    }
}
