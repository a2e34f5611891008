//! Scripted provider
//!
//! Replays a fixed queue of responses, one per `stream` call. Used by the
//! integration tests and by `clara ask --offline`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{EventStream, GenerationEvent, LLMError, LLMProvider, Message};

/// One scripted generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Stream this text, word by word, then a usage event
    Text(String),

    /// Fail the call before any event is produced
    Error(String),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// A recorded `stream` call
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    pub model: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// Split text into word fragments, keeping the separating spaces
pub fn fragments(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(String::from).collect()
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, model: &str, messages: &[Message]) -> super::Result<EventStream> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ScriptedCall {
                model: model.to_string(),
                messages: messages.to_vec(),
            });

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| LLMError::InvalidRequest("Script exhausted".to_string()))?;

        let text = match reply {
            ScriptedReply::Text(text) => text,
            ScriptedReply::Error(message) => return Err(LLMError::NetworkError(message)),
        };

        let prompt_tokens = messages
            .iter()
            .map(|m| m.content.chars().count() as u64)
            .sum::<u64>()
            / 4;

        let fragments = fragments(&text);
        let completion_tokens = fragments.len() as u64;

        let mut events: Vec<super::Result<GenerationEvent>> = fragments
            .into_iter()
            .map(|fragment| Ok(GenerationEvent::delta(fragment)))
            .collect();
        events.push(Ok(GenerationEvent::usage(prompt_tokens, completion_tokens)));

        Ok(Box::pin(futures::stream::iter(events)))
    }
}
