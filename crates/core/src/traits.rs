//! Shared traits for schema declarations
//!
//! Entities and fields are both named and self-validating; the helpers at the
//! bottom work over ordered lists of such declarations.

use crate::error::{EngineResult, ResultExt};
use std::collections::HashSet;

// ============================================================================
// Validatable Trait
// ============================================================================

/// A declaration that can check its own consistency
///
/// Only local checks belong here. Checks that need the whole schema are
/// validation rules of the IR crate.
pub trait Validatable {
    fn validate(&self) -> EngineResult<()>;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

// ============================================================================
// Named Trait
// ============================================================================

/// A declaration identified by name within its parent
pub trait Named {
    fn name(&self) -> &str;

    /// Case-insensitive comparison
    fn name_matches(&self, other: &str) -> bool {
        self.name().eq_ignore_ascii_case(other)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Find a declaration by exact name
pub fn find_named<'a, T: Named>(items: &'a [T], name: &str) -> Option<&'a T> {
    items.iter().find(|item| item.name() == name)
}

/// The first declaration whose name was already used earlier in the list
pub fn first_duplicate<T: Named>(items: &[T]) -> Option<&T> {
    let mut seen = HashSet::new();
    items.iter().find(|item| !seen.insert(item.name()))
}

/// Validate every declaration, prefixing errors with `owner.name`
pub fn validate_named<T: Validatable + Named>(owner: &str, items: &[T]) -> EngineResult<()> {
    for item in items {
        item.validate()
            .with_context(format!("{}.{}", owner, item.name()))?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
