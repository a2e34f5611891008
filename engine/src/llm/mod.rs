//! LLM Provider Abstraction Layer
//!
//! This module provides the generation collaborator boundary. A provider
//! takes a model name and a conversation and returns a stream of
//! [`GenerationEvent`]s: content fragments as they are produced, and usage
//! records carrying authoritative token totals for the call.

use async_trait::async_trait;
use futures::stream::BoxStream;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod openai;
pub mod scripted;
pub mod sse;

pub use openai::OpenAICompatProvider;
pub use scripted::{ScriptedProvider, ScriptedReply};

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// A lazily produced sequence of generation events
pub type EventStream = BoxStream<'static, Result<GenerationEvent>>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        EngineError::Generation(err.to_string())
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Authoritative token totals for an entire generation call so far
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,

    #[serde(default)]
    pub completion_tokens: u64,
}

/// One event of a streaming generation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationEvent {
    /// Usage record, present on the terminal accounting event
    pub usage: Option<Usage>,

    /// Content fragment
    pub delta: Option<String>,
}

impl GenerationEvent {
    /// A content fragment event
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            usage: None,
            delta: Some(content.into()),
        }
    }

    /// A usage event
    pub fn usage(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
            }),
            delta: None,
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openrouter", "scripted")
    fn name(&self) -> &str;

    /// Start a streaming generation call
    ///
    /// # Arguments
    /// * `model` - Model identifier understood by the provider
    /// * `messages` - Conversation including the system prompt
    ///
    /// # Returns
    /// * `Ok(EventStream)` - Events in production order; the stream ends
    ///   when the collaborator finishes
    /// * `Err(LLMError)` - If the call could not be started
    async fn stream(&self, model: &str, messages: &[Message]) -> Result<EventStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        let system_msg = Message::system("You are a planner");
        assert_eq!(system_msg.role, MessageRole::System);
        assert_eq!(Message::assistant("ok").role.to_string(), "assistant");
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("test");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"test"}"#);

        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, deserialized);
    }

    #[test]
    fn test_event_constructors() {
        let event = GenerationEvent::delta("Hi");
        assert_eq!(event.delta.as_deref(), Some("Hi"));
        assert!(event.usage.is_none());

        let event = GenerationEvent::usage(12, 3);
        assert_eq!(event.usage.map(|u| u.completion_tokens), Some(3));
        assert!(event.delta.is_none());
    }

    #[test]
    fn test_llm_error_becomes_generation_error() {
        let err: EngineError = LLMError::Timeout.into();
        assert!(matches!(err, EngineError::Generation(_)));
        assert_eq!(err.to_string(), "Generation call failed: Timeout");
    }
}
