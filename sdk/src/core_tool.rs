//! Core tool trait
//!
//! Tools are opaque external callables keyed by name in the engine's
//! registry. Arguments arrive already resolved (no variable references
//! remain) and the result may be any JSON value.

use crate::types::ToolError;
use async_trait::async_trait;
use serde_json::Value;

/// Trait that all core tools must implement
#[async_trait]
pub trait CoreTool: Send + Sync {
    /// Returns the registry name of the tool
    fn name(&self) -> &str;

    /// Returns a one-line description used in the executor prompt
    fn description(&self) -> &str;

    /// Returns the positional parameter list, e.g. `[a, b]`
    fn usage(&self) -> &str;

    /// Handle a tool invocation
    async fn invoke(&self, args: Vec<Value>) -> Result<Value, ToolError>;
}

/// Check that exactly `expected` arguments were passed
pub fn expect_arity(args: &[Value], expected: usize) -> Result<(), ToolError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ToolError::ArityMismatch {
            expected,
            got: args.len(),
        })
    }
}

/// Read an argument as a string; numbers are rendered as text
pub fn arg_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
