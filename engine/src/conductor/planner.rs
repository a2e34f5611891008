//! Conductor Planner
//!
//! Turns one request into one ordered response stream, in three phases:
//!
//! 1. **Planning**: the planner agent writes a JSON task list
//! 2. **Execution**: each scheduled task runs through a [`TaskExecutor`],
//!    strictly one after the other
//! 3. **Synthesis**: the reactive agent answers from the execution log
//!
//! Synthesis always runs, even when the plan is empty or unreadable. A
//! failed generation call anywhere ends the stream after a single
//! `**Erreur:**` chunk.

use super::agent::{Agent, ReactiveAgent};
use super::executor::TaskExecutor;
use super::graph::Tasks;
use super::memory::MemoryStore;
use super::metrics::SharedMetrics;
use super::types::{AgentRecord, AgentResponse, AgentType, TaskStatus};
use crate::config::LLMConfig;
use crate::llm::{LLMProvider, Message, MessageRole};
use crate::tools::ToolRegistry;
use futures::{Stream, StreamExt};
use sdk::errors::EngineError;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const PLANNING_MARKER: &str = "## Planning\n";
pub const EXECUTION_MARKER: &str = "\n\n## Execution\n";
pub const SYNTHESIS_MARKER: &str = "\n\n## Synthesis\n";

pub struct Planner {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    executor_model: String,
    agent: Agent,
    reactive: Agent,
    history: Vec<Message>,
}

impl Planner {
    pub fn new(provider: Arc<dyn LLMProvider>, llm: &LLMConfig, tools: Arc<ToolRegistry>) -> Self {
        let system_prompt = format!(
            "You are the clinical architect of the C.L.A.R.A. system.\n\
            Your job is to PLAN the analysis of a patient case, NOT to carry it out yourself.\n\n\
            Tools available to the executor:\n\n\
            {}\n\
            Rules:\n\
            - Break the problem down into logical steps, one tool call per step.\n\
            - A step may use the result of an earlier step by writing '$<step_id>' in its description.\n\
            - Answer ONLY with a strict JSON list, no introduction or conclusion.\n\n\
            Expected format:\n\
            [{{\"step_id\": \"step_1\", \"title\": \"...\", \"description\": \"...\", \"dependencies\": []}},\n \
            {{\"step_id\": \"step_2\", \"title\": \"...\", \"description\": \"... $step_1 ...\", \"dependencies\": [\"step_1\"]}}]",
            tools.prompt_section()
        );

        Self {
            agent: Agent::new(
                provider.clone(),
                llm.planner_model.as_str(),
                system_prompt,
                AgentRecord::new(AgentType::Planner, Vec::new()),
            ),
            reactive: Agent::new(
                provider.clone(),
                llm.reactive_model.as_str(),
                ReactiveAgent::SYSTEM_PROMPT,
                AgentRecord::new(AgentType::Reactive, Vec::new()),
            ),
            executor_model: llm.executor_model.clone(),
            provider,
            tools,
            history: Vec::new(),
        }
    }

    /// The planner's id, which is also the plan's default root
    pub fn id(&self) -> &str {
        self.agent.id()
    }

    /// Previous exchanges of this session
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Run the three phases for one request.
    ///
    /// The last record carries an empty chunk and the final metrics, with
    /// `total_time` set. Cancelling `cancel` stops the stream before the
    /// next generation call, tool call or chunk.
    pub fn ask<'a>(
        &'a mut self,
        request: &'a str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = AgentResponse> + Send + 'a {
        async_stream::stream! {
            let started = Instant::now();
            let metrics = SharedMetrics::new();

            let root = self.agent.reset_id().to_string();
            self.reactive.reset_id();
            info!("Planning request {}", root);

            self.agent.update_status(TaskStatus::Pending, &metrics);
            yield AgentResponse::new(metrics.snapshot(), root.as_str(), PLANNING_MARKER);

            // Phase 1
            {
                let responses = self.agent.ask(request, &metrics, &cancel);
                futures::pin_mut!(responses);

                while let Some(item) = responses.next().await {
                    match item {
                        Ok(response) => yield response,
                        Err(e) => {
                            if let Some(response) = failure_record(&metrics, &root, e) {
                                yield response;
                            }
                            return;
                        }
                    }
                }
            }
            self.agent.update_status(TaskStatus::Finished, &metrics);

            let mut tasks = Tasks::from_plan(self.agent.last_response(), root.as_str());
            let rendered_plan = tasks.render();
            let mut execution_log: Vec<(String, String)> = Vec::new();

            // Phase 2
            if !tasks.is_empty() {
                info!("Executing {} task(s)", tasks.len());
                yield AgentResponse::new(metrics.snapshot(), root.as_str(), EXECUTION_MARKER);
                yield AgentResponse::new(metrics.snapshot(), root.as_str(), rendered_plan.as_str());

                let mut memory = MemoryStore::new();
                let order: Vec<_> = tasks.iter().cloned().collect();

                for mut task in order {
                    let step_id = task.step_id.clone();
                    let mut executor = TaskExecutor::new(
                        &task,
                        self.provider.clone(),
                        self.executor_model.as_str(),
                        self.tools.clone(),
                    );

                    {
                        let responses =
                            executor.execute(&mut task, &tasks, &metrics, &mut memory, &cancel);
                        futures::pin_mut!(responses);

                        while let Some(item) = responses.next().await {
                            match item {
                                Ok(response) => yield response,
                                Err(e) => {
                                    if let Some(response) = failure_record(&metrics, &step_id, e) {
                                        yield response;
                                    }
                                    return;
                                }
                            }
                        }
                    }

                    if let Some(slot) = tasks.get_mut(&step_id) {
                        slot.status = task.status;
                    }
                    execution_log.push((task.title.clone(), executor.transcript().to_string()));
                }
            }

            // Phase 3
            if cancel.is_cancelled() {
                info!("Request {} cancelled before synthesis", root);
                return;
            }
            yield AgentResponse::new(metrics.snapshot(), root.as_str(), SYNTHESIS_MARKER);

            let lineage: Vec<String> = if tasks.is_empty() {
                vec![root.clone()]
            } else {
                tasks.iter().map(|t| t.step_id.clone()).collect()
            };
            self.reactive.set_dependencies(lineage);

            let reactive_id = self.reactive.id().to_string();
            let prompt = synthesis_prompt(&self.history, request, &execution_log, &rendered_plan);
            {
                let responses = self.reactive.ask(&prompt, &metrics, &cancel);
                futures::pin_mut!(responses);

                while let Some(item) = responses.next().await {
                    match item {
                        Ok(response) => yield response,
                        Err(e) => {
                            if let Some(response) = failure_record(&metrics, &reactive_id, e) {
                                yield response;
                            }
                            return;
                        }
                    }
                }
            }
            self.reactive.update_status(TaskStatus::Finished, &metrics);

            self.history.push(Message::user(request));
            self.history.push(Message::assistant(self.reactive.last_response()));

            metrics.set_total_time(started.elapsed().as_secs_f64());
            info!(
                "Request {} answered in {:.1}s",
                root,
                started.elapsed().as_secs_f64()
            );
            yield AgentResponse::new(metrics.snapshot(), root.as_str(), "");
        }
    }

    /// Run the planning phase only and return the scheduled tasks
    pub async fn plan_only(
        &mut self,
        request: &str,
        cancel: &CancellationToken,
    ) -> Result<Tasks, EngineError> {
        let metrics = SharedMetrics::new();
        let root = self.agent.reset_id().to_string();

        {
            let responses = self.agent.ask(request, &metrics, cancel);
            futures::pin_mut!(responses);
            while let Some(item) = responses.next().await {
                item?;
            }
        }

        Ok(Tasks::from_plan(self.agent.last_response(), root))
    }
}

/// The record reporting a failure, or `None` when the request was cancelled
fn failure_record(metrics: &SharedMetrics, agent_id: &str, error: EngineError) -> Option<AgentResponse> {
    match error {
        EngineError::Cancelled => {
            info!("Request cancelled, stopping stream");
            None
        }
        e => {
            warn!("Request aborted: {}", e);
            Some(AgentResponse::new(
                metrics.snapshot(),
                agent_id,
                format!("**Erreur:** {}", e),
            ))
        }
    }
}

fn synthesis_prompt(
    history: &[Message],
    request: &str,
    execution_log: &[(String, String)],
    rendered_plan: &str,
) -> String {
    let mut prompt = String::new();

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for message in history {
            let speaker = match message.role {
                MessageRole::User => "User",
                MessageRole::Assistant => "Assistant",
                MessageRole::System => "System",
            };
            prompt.push_str(&format!("{}: {}\n", speaker, message.content));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Request: {}\n\n", request));

    if execution_log.is_empty() {
        prompt.push_str("No plan was executed. Answer the request directly.\n");
    } else {
        prompt.push_str("Execution results:\n");
        for (title, output) in execution_log {
            prompt.push_str(&format!("### {}\n{}\n\n", title, output.trim()));
        }
        prompt.push_str(&format!("Plan:{}", rendered_plan));
    }

    prompt.push_str("Write the final answer for the user.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_prompt_without_plan() {
        let prompt = synthesis_prompt(&[], "What is BI-RADS?", &[], "");

        assert!(prompt.starts_with("Request: What is BI-RADS?"));
        assert!(prompt.contains("No plan was executed"));
        assert!(!prompt.contains("Conversation so far"));
    }

    #[test]
    fn test_synthesis_prompt_with_history_and_log() {
        let history = vec![Message::user("hi"), Message::assistant("hello")];
        let log = vec![("Sum".to_string(), "  result 5 ".to_string())];
        let prompt = synthesis_prompt(&history, "again", &log, "\n**Generated plan:**\n- s1: add\n\n");

        assert!(prompt.contains("User: hi\nAssistant: hello\n"));
        assert!(prompt.contains("### Sum\nresult 5\n"));
        assert!(prompt.contains("- s1: add"));
        assert!(prompt.ends_with("Write the final answer for the user."));
    }

    #[test]
    fn test_failure_record() {
        let metrics = SharedMetrics::new();

        let record = failure_record(
            &metrics,
            "p",
            EngineError::Generation("Timeout".to_string()),
        )
        .unwrap();
        assert_eq!(record.chunk, "**Erreur:** Generation call failed: Timeout");
        assert_eq!(record.agent_id, "p");

        assert!(failure_record(&metrics, "p", EngineError::Cancelled).is_none());
    }
}
