//! # Tessera Hooks
//!
//! Turns classified relations into request handlers.
//!
//! ## Pipeline
//!
//! 1. Each [`tessera_ir::Relation`] is handed to the generator for its
//!    relation type, which checks adapter capabilities and emits one
//!    [`BehaviorBundle`] per participating side
//! 2. The [`HookPipeline`] merges bundles per entity into
//!    [`EntityHandlers`]: ordered create/update cascade chains plus a flat
//!    resolver map
//! 3. The [`Engine`] serves create, update, delete and read requests through
//!    those handlers
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_hooks::{Engine, EngineConfig};
//!
//! let engine = Engine::bind(schema, EngineConfig::default())?;
//! let team = engine
//!     .create("Team", json!({ "players": { "connect": [{ "id": "u1" }] } }))
//!     .await?;
//! let players = engine.resolve("Team", "players", &team).await?;
//! ```

pub mod bundle;
pub mod cascade;
pub mod config;
pub mod engine;
pub mod generators;
pub mod hook;
pub mod instruction;
pub mod pipeline;
pub mod resolver;

pub use bundle::BehaviorBundle;
pub use cascade::{CreateCascade, CreateNext, UpdateCascade, UpdateNext, UpdateRequest};
pub use config::{EngineConfig, ResolverPolicy};
pub use engine::Engine;
pub use generators::{GeneratorContext, generate};
pub use hook::{Link, RelationHook};
pub use instruction::{InstructionSite, ToManyInstruction, ToOneInstruction};
pub use pipeline::{EntityHandlers, HookPipeline};
pub use resolver::{ReadResolver, Resolved};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
