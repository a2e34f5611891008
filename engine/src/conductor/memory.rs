//! Step result memory
//!
//! Holds the value produced by each task's tool calls, keyed by step id, for
//! the duration of one plan. Later tasks reach these values through `$`
//! references in their tool arguments.

use sdk::errors::EngineError;
use sdk::types::{ToolArg, REFERENCE_MARKER};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    storage: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous value for the key
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.storage.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.storage.get(key)
    }

    /// Resolve one argument to a concrete value.
    ///
    /// Literals pass through unchanged. A reference is looked up without its
    /// marker first, then as written.
    pub fn resolve(&self, arg: &ToolArg) -> Result<Value, EngineError> {
        let raw = match arg {
            ToolArg::Reference(raw) => raw,
            literal => return Ok(literal.to_value()),
        };

        let stripped = raw.strip_prefix(REFERENCE_MARKER).unwrap_or(raw);

        self.storage
            .get(stripped)
            .or_else(|| self.storage.get(raw.as_str()))
            .cloned()
            .ok_or_else(|| EngineError::VariableNotFound(raw.clone()))
    }

    /// Resolve every argument, preserving order and length
    pub fn resolve_args(&self, args: &[ToolArg]) -> Result<Vec<Value>, EngineError> {
        args.iter().map(|arg| self.resolve(arg)).collect()
    }

    /// Snapshot of all stored entries
    pub fn dump(&self) -> HashMap<String, Value> {
        self.storage.clone()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
