//! Read-path joins

use crate::engine::Engine;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use tessera_core::{EngineResult, Record};

/// Resolves one relation field of a parent record
///
/// Join misses are not errors: a to-one field resolves to `One(None)` and a
/// to-many field to an empty list.
#[async_trait]
pub trait ReadResolver: Send + Sync + Debug {
    /// The relation field this resolver answers for
    fn field(&self) -> &str;

    async fn resolve(&self, engine: &Engine, parent: &Record) -> EngineResult<Resolved>;
}

/// Result of resolving a relation field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolved {
    One(Option<Record>),
    Many(Vec<Record>),
}

impl Resolved {
    /// The single record of a to-one result
    pub fn one(&self) -> Option<&Record> {
        match self {
            Resolved::One(record) => record.as_ref(),
            Resolved::Many(_) => None,
        }
    }

    /// The records of a to-many result (empty for to-one results)
    pub fn many(&self) -> &[Record] {
        match self {
            Resolved::One(_) => &[],
            Resolved::Many(records) => records,
        }
    }

    /// Convert into a JSON value (`null`, an object, or an array)
    pub fn into_value(self) -> Value {
        match self {
            Resolved::One(Some(record)) => Value::Object(record),
            Resolved::One(None) => Value::Null,
            Resolved::Many(records) => Value::Array(records.into_iter().map(Value::Object).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolved_accessors() {
        let mut record = Record::new();
        record.insert("id".to_string(), json!("u1"));

        let one = Resolved::One(Some(record.clone()));
        assert_eq!(one.one(), Some(&record));
        assert!(one.many().is_empty());
        assert_eq!(one.into_value(), json!({ "id": "u1" }));

        let many = Resolved::Many(vec![record]);
        assert_eq!(many.one(), None);
        assert_eq!(many.many().len(), 1);
        assert_eq!(Resolved::One(None).into_value(), Value::Null);
    }
}
