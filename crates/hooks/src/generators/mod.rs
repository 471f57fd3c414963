//! # Relation Behavior Generators
//!
//! One generator per relation type. Each checks, once at bind time, that the
//! adapters involved declare the capabilities its links rely on, then emits
//! one [`BehaviorBundle`] per side that declares a relation field.
//!
//! ```text
//! Relation ──► generate() ──┬──► uni_one_to_one   ──► [source]
//!                           ├──► uni_one_to_many  ──► [source]
//!                           ├──► bi_one_to_one    ──► [source, target]
//!                           ├──► bi_one_to_many   ──► [source, target]
//!                           └──► many_to_many     ──► [source, target]
//! ```

pub mod bi_one_to_many;
pub mod bi_one_to_one;
pub mod many_to_many;
pub mod uni_one_to_many;
pub mod uni_one_to_one;

use crate::bundle::BehaviorBundle;
use tessera_core::{Capabilities, Capability, EngineError, EngineResult, EntityId, RelationType};
use tessera_ir::{Relation, Schema, Side};

// ============================================================================
// GeneratorContext
// ============================================================================

/// Adapter capabilities of every entity, queried once per bind
#[derive(Debug, Clone)]
pub struct GeneratorContext {
    names: Vec<String>,
    capabilities: Vec<Capabilities>,
}

impl GeneratorContext {
    /// Query every bound adapter; unbound entities are a schema error
    pub fn from_schema(schema: &Schema) -> EngineResult<Self> {
        let mut names = Vec::with_capacity(schema.entity_count());
        let mut capabilities = Vec::with_capacity(schema.entity_count());
        for entity in schema.entities() {
            capabilities.push(entity.require_adapter()?.capabilities());
            names.push(entity.name.clone());
        }
        Ok(Self {
            names,
            capabilities,
        })
    }

    /// Capabilities of an entity's adapter
    pub fn capabilities(&self, entity: EntityId) -> Capabilities {
        self.capabilities
            .get(entity.index())
            .copied()
            .unwrap_or(Capabilities::NONE)
    }

    /// Fail with `MissingCapability` unless the entity's adapter declares `capability`
    pub fn require(&self, relation: &Relation, entity: EntityId, capability: Capability) -> EngineResult<()> {
        if self.capabilities(entity).supports(capability) {
            return Ok(());
        }
        Err(EngineError::MissingCapability {
            relation: relation.name.clone(),
            entity: self
                .names
                .get(entity.index())
                .cloned()
                .unwrap_or_else(|| entity.to_string()),
            capability: capability.to_string(),
        })
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Generate the bundles of one relation
pub fn generate(ctx: &GeneratorContext, relation: &Relation) -> EngineResult<Vec<BehaviorBundle>> {
    let bundles = match relation.kind {
        RelationType::UniOneToOne => uni_one_to_one::generate(ctx, relation)?,
        RelationType::UniOneToMany => uni_one_to_many::generate(ctx, relation)?,
        RelationType::BiOneToOne => bi_one_to_one::generate(ctx, relation)?,
        RelationType::BiOneToMany => bi_one_to_many::generate(ctx, relation)?,
        RelationType::BiManyToMany => many_to_many::generate(ctx, relation)?,
    };
    tracing::debug!(
        "Generated {} bundle(s) for relation '{}' ({})",
        bundles.len(),
        relation.name,
        relation.kind
    );
    Ok(bundles)
}

/// The foreign key of a key-based relation
pub(crate) fn foreign_key(relation: &Relation) -> EngineResult<(Side, String)> {
    relation
        .foreign_key()
        .map(|(side, key)| (side, key.to_string()))
        .ok_or_else(|| EngineError::RelationMismatch {
            relation: relation.name.clone(),
            message: format!("a {} relation needs a foreign key", relation.kind),
        })
}

// ============================================================================
// Test helpers
// ============================================================================

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use std::sync::Arc;
    use tessera_core::StorageAdapter;
    use tessera_ir::{ClassifierOptions, Entity, classify};
    use tessera_store::MemoryAdapter;

    /// Build, classify and wrap a schema whose adapters all have `capabilities`
    pub fn classified(entities: Vec<Entity>, capabilities: Capabilities) -> (GeneratorContext, Vec<Relation>) {
        let mut builder = Schema::builder().default_adapter(move |entity| {
            let adapter: Arc<dyn StorageAdapter> =
                Arc::new(MemoryAdapter::new(&entity.name).with_capabilities(capabilities));
            adapter
        });
        for entity in entities {
            builder.add_entity(entity);
        }
        let schema = builder.build().unwrap();
        let classification = classify(&schema, &ClassifierOptions::default()).unwrap();
        (
            GeneratorContext::from_schema(&schema).unwrap(),
            classification.relations().to_vec(),
        )
    }
}
