//! Behavior bundles
//!
//! A bundle is what one relation contributes to one entity: the create
//! cascade, update cascade and read resolver of one relation field. Bundles
//! are immutable once generated; the pipeline merges them per entity.

use crate::cascade::{CreateCascade, UpdateCascade};
use crate::hook::RelationHook;
use crate::resolver::ReadResolver;
use std::sync::Arc;
use tessera_core::EntityId;

/// The {create cascade, update cascade, read resolver} triple of one field
#[derive(Debug, Clone)]
pub struct BehaviorBundle {
    /// Relation that produced the bundle
    pub relation: String,

    /// Entity the bundle attaches to
    pub entity: EntityId,

    /// Relation field the bundle handles
    pub field: String,

    pub create: Arc<dyn CreateCascade>,
    pub update: Arc<dyn UpdateCascade>,
    pub resolver: Arc<dyn ReadResolver>,
}

impl BehaviorBundle {
    /// Assemble a bundle from independent parts
    pub fn new(
        relation: impl Into<String>,
        entity: EntityId,
        field: impl Into<String>,
        create: Arc<dyn CreateCascade>,
        update: Arc<dyn UpdateCascade>,
        resolver: Arc<dyn ReadResolver>,
    ) -> Self {
        Self {
            relation: relation.into(),
            entity,
            field: field.into(),
            create,
            update,
            resolver,
        }
    }

    /// Bundle a relation hook, which plays all three roles
    pub fn from_hook(hook: RelationHook) -> Self {
        let relation = hook.relation().to_string();
        let entity = hook.entity();
        let field = CreateCascade::field(&hook).to_string();
        let hook = Arc::new(hook);
        Self {
            relation,
            entity,
            field,
            create: hook.clone(),
            update: hook.clone(),
            resolver: hook,
        }
    }
}
