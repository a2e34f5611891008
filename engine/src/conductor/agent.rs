//! Streaming agent
//!
//! An [`Agent`] pairs a system prompt and a model with its own
//! [`AgentRecord`]. Each `ask` is one generation call whose fragments are
//! forwarded as [`AgentResponse`]s while the record is kept current in the
//! request's [`SharedMetrics`].

use super::metrics::{CallAccounting, SharedMetrics};
use super::types::{AgentRecord, AgentResponse, AgentType, TaskStatus};
use crate::llm::{LLMProvider, Message};
use futures::{Stream, StreamExt};
use sdk::errors::EngineError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Agent {
    provider: Arc<dyn LLMProvider>,
    model: String,
    system_prompt: String,
    record: AgentRecord,
    last_response: String,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        record: AgentRecord,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: system_prompt.into(),
            record,
            last_response: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &AgentRecord {
        &self.record
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full text of the most recent `ask`
    pub fn last_response(&self) -> &str {
        &self.last_response
    }

    /// Mint a new identity, keeping the accumulated counters
    pub fn reset_id(&mut self) -> &str {
        self.record.id = uuid::Uuid::new_v4().to_string();
        &self.record.id
    }

    pub fn set_dependencies(&mut self, dependencies: Vec<String>) {
        self.record.dependencies = dependencies;
    }

    pub fn update_status(&mut self, status: TaskStatus, metrics: &SharedMetrics) {
        self.record.status = status;
        metrics.upsert(&self.record);
    }

    /// Stream one generation call.
    ///
    /// Yields one response per content fragment and an empty-chunk response
    /// per usage event. A failed call yields a single `Err` and ends the
    /// stream; cancellation yields `Err(EngineError::Cancelled)`.
    pub fn ask<'a>(
        &'a mut self,
        prompt: &'a str,
        metrics: &'a SharedMetrics,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = Result<AgentResponse, EngineError>> + Send + 'a {
        async_stream::stream! {
            self.last_response.clear();

            if cancel.is_cancelled() {
                yield Err(EngineError::Cancelled);
                return;
            }

            let messages = [
                Message::system(self.system_prompt.as_str()),
                Message::user(prompt),
            ];

            let mut accounting = CallAccounting::begin(&self.record);
            metrics.upsert(&self.record);

            let mut events = match self.provider.stream(&self.model, &messages).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!("Generation call for agent {} failed: {}", self.record.id, e);
                    yield Err(e.into());
                    return;
                }
            };

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    event = events.next() => Some(event),
                };

                let event = match next {
                    None => {
                        yield Err(EngineError::Cancelled);
                        return;
                    }
                    Some(None) => break,
                    Some(Some(Ok(event))) => event,
                    Some(Some(Err(e))) => {
                        tracing::error!("Generation stream for agent {} failed: {}", self.record.id, e);
                        yield Err(e.into());
                        return;
                    }
                };

                if event.delta.is_none() && event.usage.is_none() {
                    accounting.tick(&mut self.record);
                    continue;
                }

                let chunk = event.delta.unwrap_or_default();
                if !chunk.is_empty() {
                    accounting.on_fragment(&mut self.record);
                    self.last_response.push_str(&chunk);
                }
                if let Some(usage) = event.usage {
                    accounting.on_usage(&mut self.record, usage);
                }

                metrics.upsert(&self.record);
                tracing::trace!(
                    agent = %self.record.id,
                    input = self.record.input_token_count,
                    output = self.record.output_token_count,
                    "chunk"
                );

                yield Ok(AgentResponse::new(metrics.snapshot(), self.record.id.as_str(), chunk));
            }

            accounting.tick(&mut self.record);
            metrics.upsert(&self.record);

            tracing::debug!(
                "Agent {} answered in {} fragment(s)",
                self.record.id,
                accounting.fragments()
            );
        }
    }
}

/// Direct question answering, without planning
pub struct ReactiveAgent {
    agent: Agent,
}

impl ReactiveAgent {
    pub const SYSTEM_PROMPT: &'static str =
        "You are a responsive medical assistant. Answer directly and precisely.";

    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            agent: Agent::new(
                provider,
                model,
                Self::SYSTEM_PROMPT,
                AgentRecord::new(AgentType::Reactive, Vec::new()),
            ),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Collect a whole answer; failures are rendered into the returned text
    pub async fn handle_request(
        &mut self,
        request: &str,
        metrics: &SharedMetrics,
        cancel: &CancellationToken,
    ) -> String {
        let mut answer = String::new();

        let stream = self.agent.ask(request, metrics, cancel);
        futures::pin_mut!(stream);

        while let Some(item) = stream.next().await {
            match item {
                Ok(response) => answer.push_str(&response.chunk),
                Err(e) => return format!("Error: {}", e),
            }
        }

        if answer.is_empty() {
            "Error: Empty response.".to_string()
        } else {
            answer
        }
    }
}
