//! Unidirectional one-to-one
//!
//! Only the source declares a field. The key `<field>Id` lives on the
//! source's records and the resolver looks the target up by that key.

use super::{GeneratorContext, foreign_key};
use crate::bundle::BehaviorBundle;
use crate::hook::{Link, RelationHook};
use tessera_core::{Capability, EngineError, EngineResult};
use tessera_ir::{Relation, Side};

pub fn generate(ctx: &GeneratorContext, relation: &Relation) -> EngineResult<Vec<BehaviorBundle>> {
    let (owner, key) = foreign_key(relation)?;
    if owner != Side::Source {
        return Err(EngineError::RelationMismatch {
            relation: relation.name.clone(),
            message: "the key of a unidirectional one-to-one relation belongs to its source".to_string(),
        });
    }

    ctx.require(relation, relation.source.entity, Capability::ToOne)?;

    let hook = RelationHook::for_side(
        relation,
        Side::Source,
        Link::LocalKey {
            key,
            exclusive: false,
        },
    )?;
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
            Entity::new("Team").with_field(Field::relation("captain", "User")),
            Entity::new("User"),
        ]
    }

    #[test]
    fn test_source_bundle_only() {
        let (ctx, relations) = classified(team(), Capabilities::ALL);
        let bundles = generate(&ctx, &relations[0]).unwrap();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].field, "captain");
        assert_eq!(bundles[0].relation, "TeamAndUserOncaptain");
    }

    #[test]
    fn test_requires_to_one_capability() {
        let (ctx, relations) = classified(team(), Capabilities::NONE);
        let err = generate(&ctx, &relations[0]).unwrap_err();
        assert!(matches!(err, EngineError::MissingCapability { entity, .. } if entity == "Team"));
    }
}
