//! Clara SDK
//!
//! Shared library providing the error taxonomy and the tool boundary types.
//! This crate is used by the engine and by anything that registers tools.

/// Core tool trait
pub mod core_tool;

/// Error types and handling
pub mod errors;

/// Tool call and argument types
pub mod types;

// Re-export commonly used types
pub use core_tool::CoreTool;
pub use errors::{ClaraErrorExt, EngineError};
pub use types::{ToolArg, ToolCall, ToolError};
