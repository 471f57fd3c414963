//! Bidirectional one-to-many
//!
//! The source declares the to-one field and stores the key; the target
//! declares the list field and finds its records by that key.

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
            message: "the key of a one-to-many relation belongs to its to-one side".to_string(),
        });
    }

    let source = relation.source.entity;
    ctx.require(relation, source, Capability::ToOne)?;
    ctx.require(relation, source, Capability::OneToMany)?;

    let one = RelationHook::for_side(
        relation,
        Side::Source,
        Link::LocalKey {
            key: key.clone(),
            exclusive: false,
        },
    )?;
    let many = RelationHook::for_side(relation, Side::Target, Link::ForeignKeyList { key })?;
    Ok(vec![
        BehaviorBundle::from_hook(one),
        BehaviorBundle::from_hook(many),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_helpers::classified;
    use tessera_core::Capabilities;
    use tessera_ir::{Entity, Field};

    #[test]
    fn test_both_sides_bundled() {
        let (ctx, relations) = classified(
            vec![
                Entity::new("User").with_field(Field::relation("posts", "Post").list()),
                Entity::new("Post").with_field(Field::relation("author", "User")),
            ],
            Capabilities::ALL,
        );
        let bundles = generate(&ctx, &relations[0]).unwrap();
        let fields: Vec<&str> = bundles.iter().map(|b| b.field.as_str()).collect();
        assert_eq!(fields, vec!["author", "posts"]);
    }
}
