//! Bidirectional one-to-one
//!
//! Both sides declare a to-one field. The owning side (chosen by the
//! classifier) stores the key and steals the link from any previous holder;
//! the other side reaches it by reverse lookup.

use super::{GeneratorContext, foreign_key};
use crate::bundle::BehaviorBundle;
use crate::hook::{Link, RelationHook};
use tessera_core::{Capability, EngineResult};
use tessera_ir::{Relation, Side};

pub fn generate(ctx: &GeneratorContext, relation: &Relation) -> EngineResult<Vec<BehaviorBundle>> {
    let (owner, key) = foreign_key(relation)?;
    ctx.require(relation, relation.end(owner).entity, Capability::ToOne)?;

    [Side::Source, Side::Target]
        .into_iter()
        .map(|side| {
            let link = if side == owner {
                Link::LocalKey {
                    key: key.clone(),
                    exclusive: true,
                }
            } else {
                Link::ReverseKey { key: key.clone() }
            };
            RelationHook::for_side(relation, side, link).map(BehaviorBundle::from_hook)
        })
        .collect()
}
