//! Nested relation instructions
//!
//! A mutation payload may carry, under a relation field's name, an object
//! with up to four keys:
//!
//! | key | to-one field | to-many field |
//! |---|---|---|
//! | `connect` | unique input | unique input or list of them |
//! | `create` | record | record or list of records |
//! | `disconnect` | `true` | unique input or list of them |
//! | `delete` | `true` | unique input or list of them |
//!
//! A unique input is an object naming unique fields of the target
//! (`{"id": "u1"}`, `{"email": "a@b"}`) or a bare identifier.

use serde_json::Value;
use tessera_core::{EngineError, EngineResult, Filter, Record, id_from_value};

const CONNECT: &str = "connect";
const CREATE: &str = "create";
const DISCONNECT: &str = "disconnect";
const DELETE: &str = "delete";

/// Where an instruction came from, for error messages
#[derive(Debug, Clone, Copy)]
pub struct InstructionSite<'a> {
    pub entity: &'a str,
    pub field: &'a str,
}

impl InstructionSite<'_> {
    fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::instruction(self.entity, self.field, message)
    }
}

// ============================================================================
// To-one
// ============================================================================

/// Instruction for a to-one relation field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToOneInstruction {
    pub connect: Option<Filter>,
    pub create: Option<Record>,
    pub disconnect: bool,
    pub delete: bool,
}

impl ToOneInstruction {
    /// Parse the value found under a relation key; `null` means no instruction
    pub fn parse(site: InstructionSite<'_>, value: &Value) -> EngineResult<Option<Self>> {
        let Some(object) = instruction_object(site, value)? else {
            return Ok(None);
        };

        let mut instruction = Self::default();
        for (key, value) in object {
            match key.as_str() {
                CONNECT => instruction.connect = Some(unique_input(site, value)?),
                CREATE => instruction.create = Some(record(site, value)?),
                DISCONNECT => instruction.disconnect = flag(site, key, value)?,
                DELETE => instruction.delete = flag(site, key, value)?,
                other => return Err(site.error(format!("unknown instruction '{}'", other))),
            }
        }
        Ok(Some(instruction))
    }

    pub fn is_empty(&self) -> bool {
        self.connect.is_none() && self.create.is_none() && !self.disconnect && !self.delete
    }
}

// ============================================================================
// To-many
// ============================================================================

/// Instruction for a to-many relation field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToManyInstruction {
    pub connect: Vec<Filter>,
    pub create: Vec<Record>,
    pub disconnect: Vec<Filter>,
    pub delete: Vec<Filter>,
}

impl ToManyInstruction {
    /// Parse the value found under a relation key; `null` means no instruction
    pub fn parse(site: InstructionSite<'_>, value: &Value) -> EngineResult<Option<Self>> {
        let Some(object) = instruction_object(site, value)? else {
            return Ok(None);
        };

        let mut instruction = Self::default();
        for (key, value) in object {
            match key.as_str() {
                CONNECT => instruction.connect = each(value, |v| unique_input(site, v))?,
                CREATE => instruction.create = each(value, |v| record(site, v))?,
                DISCONNECT => instruction.disconnect = each(value, |v| unique_input(site, v))?,
                DELETE => instruction.delete = each(value, |v| unique_input(site, v))?,
                other => return Err(site.error(format!("unknown instruction '{}'", other))),
            }
        }
        Ok(Some(instruction))
    }

    pub fn is_empty(&self) -> bool {
        self.connect.is_empty()
            && self.create.is_empty()
            && self.disconnect.is_empty()
            && self.delete.is_empty()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn instruction_object<'v>(
    site: InstructionSite<'_>,
    value: &'v Value,
) -> EngineResult<Option<&'v Record>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(object) => Ok(Some(object)),
        other => Err(site.error(format!("expected an instruction object, got {}", other))),
    }
}

/// Accept a single element or a list of elements
fn each<T>(value: &Value, parse: impl Fn(&Value) -> EngineResult<T>) -> EngineResult<Vec<T>> {
    match value {
        Value::Array(items) => items.iter().map(parse).collect(),
        single => Ok(vec![parse(single)?]),
    }
}

fn unique_input(site: InstructionSite<'_>, value: &Value) -> EngineResult<Filter> {
    match value {
        Value::Object(object) if !object.is_empty() => Ok(Filter(object.clone())),
        Value::String(_) | Value::Number(_) => id_from_value(value)
            .map(Filter::by_id)
            .ok_or_else(|| site.error("invalid identifier")),
        other => Err(site.error(format!("expected a unique input, got {}", other))),
    }
}

fn record(site: InstructionSite<'_>, value: &Value) -> EngineResult<Record> {
    match value {
        Value::Object(object) => Ok(object.clone()),
        other => Err(site.error(format!("expected a record to create, got {}", other))),
    }
}

fn flag(site: InstructionSite<'_>, key: &str, value: &Value) -> EngineResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| site.error(format!("'{}' on a to-one field takes a boolean", key)))
}

// ============================================================================
// Tests
// ============================================================================
