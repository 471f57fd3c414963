//! Write cascades and their continuation chain
//!
//! Each relation an entity takes part in contributes one [`CreateCascade`]
//! and one [`UpdateCascade`]. The pipeline stores them in registration order;
//! at request time the first cascade is called with a continuation
//! ([`CreateNext`] / [`UpdateNext`]) that runs the rest of the chain and
//! finally the base storage operation.
//!
//! A cascade whose field is absent from the payload must call straight
//! through to its continuation.

use crate::engine::Engine;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt::Debug;
use std::sync::Arc;
use tessera_core::{EngineResult, EntityId, Filter, Record};

// ============================================================================
// Traits
// ============================================================================

/// Create-phase behavior of one relation field
#[async_trait]
pub trait CreateCascade: Send + Sync + Debug {
    /// The relation field this cascade handles
    fn field(&self) -> &str;

    /// Handle `payload`, delegating to `next` exactly once on success
    async fn create<'a>(&'a self, payload: Record, next: CreateNext<'a>) -> EngineResult<Record>;
}

/// Update-phase behavior of one relation field
#[async_trait]
pub trait UpdateCascade: Send + Sync + Debug {
    /// The relation field this cascade handles
    fn field(&self) -> &str;

    /// Handle `request`, delegating to `next` exactly once on success
    async fn update<'a>(&'a self, request: UpdateRequest, next: UpdateNext<'a>) -> EngineResult<Record>;
}

/// An update addressed to one record
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// Selects the record to update (first match)
    pub filter: Filter,
    /// Fields to write, possibly carrying nested relation instructions
    pub payload: Record,
}

impl UpdateRequest {
    pub fn new(filter: Filter, payload: Record) -> Self {
        Self { filter, payload }
    }
}

// ============================================================================
// Continuations
// ============================================================================

/// The rest of a create chain
#[derive(Clone, Copy)]
pub struct CreateNext<'a> {
    engine: &'a Engine,
    entity: EntityId,
    rest: &'a [Arc<dyn CreateCascade>],
}

impl<'a> CreateNext<'a> {
    pub(crate) fn new(engine: &'a Engine, entity: EntityId, chain: &'a [Arc<dyn CreateCascade>]) -> Self {
        Self {
            engine,
            entity,
            rest: chain,
        }
    }

    /// The engine running this chain
    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    /// The entity being created
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Run the remaining cascades, then the base create
    pub fn run(self, payload: Record) -> BoxFuture<'a, EngineResult<Record>> {
        match self.rest.split_first() {
            Some((head, rest)) => head.create(payload, Self { rest, ..self }),
            None => Box::pin(self.engine.base_create(self.entity, payload)),
        }
    }
}

/// The rest of an update chain
#[derive(Clone, Copy)]
pub struct UpdateNext<'a> {
    engine: &'a Engine,
    entity: EntityId,
    rest: &'a [Arc<dyn UpdateCascade>],
}

impl<'a> UpdateNext<'a> {
    pub(crate) fn new(engine: &'a Engine, entity: EntityId, chain: &'a [Arc<dyn UpdateCascade>]) -> Self {
        Self {
            engine,
            entity,
            rest: chain,
        }
    }

    /// The engine running this chain
    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    /// The entity being updated
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Run the remaining cascades, then the base update
    pub fn run(self, request: UpdateRequest) -> BoxFuture<'a, EngineResult<Record>> {
        match self.rest.split_first() {
            Some((head, rest)) => head.update(request, Self { rest, ..self }),
            None => Box::pin(self.engine.base_update(self.entity, request)),
        }
    }
}

impl Debug for CreateNext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateNext")
            .field("entity", &self.entity)
            .field("remaining", &self.rest.len())
            .finish()
    }
}

impl Debug for UpdateNext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateNext")
            .field("entity", &self.entity)
            .field("remaining", &self.rest.len())
            .finish()
    }
}
