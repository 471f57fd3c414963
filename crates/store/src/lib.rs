//! # Tessera Store
//!
//! Reference storage adapters for Tessera.
//!
//! [`MemoryAdapter`] keeps every record of one entity in process memory and
//! implements each optional relation capability. It backs tests and the
//! `tessera check` diagnostic binary.

pub mod memory;

pub use memory::MemoryAdapter;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
