//! Tool call and argument types

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Marker that turns an argument string into a variable reference
pub const REFERENCE_MARKER: char = '$';

/// A single tool argument as written by the generation collaborator.
///
/// Strings beginning with [`REFERENCE_MARKER`] name a prior step's stored
/// result; everything else is a literal. `Reference` keeps the raw text,
/// marker included.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArg {
    /// Literal string argument
    Text(String),

    /// Literal numeric argument
    Number(serde_json::Number),

    /// Variable reference such as `$step_1`
    Reference(String),
}

impl ToolArg {
    /// Build an argument from a string, classifying references
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.starts_with(REFERENCE_MARKER) {
            Self::Reference(s)
        } else {
            Self::Text(s)
        }
    }

    /// Returns true if this argument must be resolved through memory
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    /// The literal JSON value of this argument.
    ///
    /// References render as their raw text.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(s) | Self::Reference(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
        }
    }
}

impl From<Value> for ToolArg {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::text(s),
            Value::Number(n) => Self::Number(n),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for ToolArg {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<i64> for ToolArg {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl fmt::Display for ToolArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Reference(s) => write!(f, "{:?}", s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for ToolArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ToolArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// One tool invocation requested at the end of a task's generated text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Registry name of the tool
    #[serde(default)]
    pub function_name: String,

    /// Positional arguments, literals or references
    #[serde(default)]
    pub args: Vec<ToolArg>,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(function_name: impl Into<String>, args: Vec<ToolArg>) -> Self {
        Self {
            function_name: function_name.into(),
            args,
        }
    }
}

/// Render a list of JSON values the way chunks display them: `[7, "x"]`
pub fn render_values(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Tool-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("{0}")]
    Failed(String),
}
