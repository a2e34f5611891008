//! Error types and handling
//!
//! This module provides the error types used throughout the Clara engine.
//! All errors implement the `ClaraErrorExt` trait which provides user-friendly
//! hints and indicates whether the current request can keep going.
//!
//! # Degrade or abort
//!
//! The orchestration pipeline never retries. Each error either degrades the
//! work in progress (a bad tool call, an unresolvable variable) or aborts the
//! single request that raised it (a failed generation call). The process
//! itself stays healthy in both cases.

use thiserror::Error;

/// Trait for Clara error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ClaraErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never contains
    /// credentials or raw collaborator output.
    fn user_hint(&self) -> &str;

    /// Returns whether the request that produced the error may continue
    ///
    /// Recoverable errors are surfaced inline and execution moves on to the
    /// next unit of work. Non-recoverable errors end the current request.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration, absent credentials
/// - **Parsing**: Malformed plan or tool-call JSON from the generation collaborator
/// - **Memory**: Variable references that resolve to nothing
/// - **Tools**: Unknown tool names and failing tool invocations
/// - **Generation**: Network or collaborator failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{ClaraErrorExt, EngineError};
///
/// let error = EngineError::VariableNotFound("$step_9".to_string());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Generation("connection reset".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Parsing errors
    #[error("Failed to parse plan: {0}")]
    PlanParse(String),

    #[error("Failed to parse tool calls: {0}")]
    ToolParse(String),

    // Memory errors
    #[error("Variable '{0}' not found")]
    VariableNotFound(String),

    // Tool errors
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    // Generation collaborator errors
    #[error("Generation call failed: {0}")]
    Generation(String),

    #[error("Request cancelled")]
    Cancelled,

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClaraErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file and required environment variables",

            Self::PlanParse(_) => "The plan could not be read. Answering without a plan",
            Self::ToolParse(_) => "The tool calls could not be read. No tool was executed",

            Self::VariableNotFound(_) => "A step referenced a result that does not exist",

            Self::UnknownTool(_) => "The requested tool is not available",
            Self::ToolError(_) => "Tool operation failed",

            Self::Generation(_) => "Text generation failed. Check your API key and network",
            Self::Cancelled => "The request was cancelled",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Errors that end the current request
            Self::Config(_) | Self::Generation(_) | Self::Cancelled => false,

            // Everything else degrades and continues
            _ => true,
        }
    }
}
