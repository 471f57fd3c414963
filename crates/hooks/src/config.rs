//! Engine configuration
//!
//! ```toml
//! resolver_collision = "reject"
//!
//! [classifier]
//! relation_name_reuse = "overwrite"
//! generated_name_collision = "permit"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tessera_core::{EngineError, EngineResult};
use tessera_ir::ClassifierOptions;

/// What to do when two bundles register a resolver for the same field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverPolicy {
    /// Keep the last registered resolver and log a warning
    #[default]
    LastWins,
    /// Fail the bind with `DuplicateResolver`
    Reject,
}

/// Configuration used by [`crate::Engine::bind`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Relation classification policies
    pub classifier: ClassifierOptions,

    /// Resolver merge policy
    pub resolver_collision: ResolverPolicy,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    pub fn with_classifier(mut self, classifier: ClassifierOptions) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_resolver_collision(mut self, policy: ResolverPolicy) -> Self {
        self.resolver_collision = policy;
        self
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        toml::from_str(text).map_err(|e| EngineError::InvalidDocument(e.to_string()))
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ir::{CollisionPolicy, NameReusePolicy};

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.resolver_collision, ResolverPolicy::LastWins);
        assert_eq!(config.classifier.relation_name_reuse, NameReusePolicy::Reject);
        assert_eq!(config.classifier.generated_name_collision, CollisionPolicy::Reject);
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
resolver_collision = "reject"

[classifier]
relation_name_reuse = "overwrite"
"#,
        )
        .unwrap();
        assert_eq!(config.resolver_collision, ResolverPolicy::Reject);
        assert_eq!(config.classifier.relation_name_reuse, NameReusePolicy::Overwrite);
        assert_eq!(config.classifier.generated_name_collision, CollisionPolicy::Reject);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tessera.toml");
        std::fs::write(&path, "resolver_collision = \"last_wins\"\n").unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), EngineConfig::new());

        std::fs::write(&path, "resolver_collision = 3\n").unwrap();
        assert!(matches!(
            EngineConfig::load(&path),
            Err(EngineError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_resolver_collision(ResolverPolicy::Reject)
            .with_classifier(
                ClassifierOptions::default().with_generated_name_collision(CollisionPolicy::Permit),
            );
        assert_eq!(config.resolver_collision, ResolverPolicy::Reject);
        assert_eq!(config.classifier.generated_name_collision, CollisionPolicy::Permit);
    }
}
