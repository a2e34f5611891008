//! Conductor Executor
//!
//! Drives one planned task through its generation call and the tool calls
//! that close its response:
//!
//! 1. Blocks the task when a dependency names no known step
//! 2. Streams the generation call, accumulating the response
//! 3. Parses the trailing tool-call block (unreadable blocks run nothing)
//! 4. For each call in order: resolves `$` references through memory,
//!    invokes the tool, stores the result under the task's step id
//!
//! Memory, unknown-tool and tool failures become inline chunks and the next
//! tool call proceeds. Only generation failures and cancellation end the
//! stream with an error.

use super::agent::Agent;
use super::graph::Tasks;
use super::memory::MemoryStore;
use super::metrics::SharedMetrics;
use super::parse::parse_tool_calls;
use super::types::{AgentRecord, AgentResponse, AgentType, PlannedTask, TaskStatus};
use crate::llm::LLMProvider;
use crate::tools::ToolRegistry;
use futures::{Stream, StreamExt};
use sdk::core_tool::arg_str;
use sdk::errors::EngineError;
use sdk::types::{render_values, ToolArg};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct TaskExecutor {
    agent: Agent,
    tools: Arc<ToolRegistry>,
    transcript: String,
}

impl TaskExecutor {
    /// Create the executor for a task; its agent id is the task's step id
    pub fn new(
        task: &PlannedTask,
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let system_prompt = format!(
            "You are the clinical executor of the C.L.A.R.A. system.\n\
            Your role is STRICTLY to carry out the precise task given to you by the planner.\n\n\
            INSTRUCTIONS:\n\
            1. Analyse the task.\n\
            2. Select the most appropriate TOOL.\n\
            3. If the task mentions a variable (e.g. '$step_1'), use it AS IS in the arguments.\n\
            4. End your answer with the tool calls in JSON.\n\n\
            Available tools:\n\n\
            {}\n\
            Required JSON format:\n\
            [{{\"function_name\": \"tool_name\", \"args\": [\"arg1\", \"arg2\"]}}]",
            tools.prompt_section()
        );

        let record = AgentRecord::with_id(
            task.step_id.as_str(),
            AgentType::Executor,
            task.dependencies.clone(),
        );

        Self {
            agent: Agent::new(provider, model, system_prompt, record),
            tools,
            transcript: String::new(),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Everything this executor emitted, generation and tool chunks alike
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Run the task, updating its status in place
    pub fn execute<'a>(
        &'a mut self,
        task: &'a mut PlannedTask,
        graph: &'a Tasks,
        metrics: &'a SharedMetrics,
        memory: &'a mut MemoryStore,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = Result<AgentResponse, EngineError>> + Send + 'a {
        async_stream::stream! {
            self.transcript.clear();

            if cancel.is_cancelled() {
                yield Err(EngineError::Cancelled);
                return;
            }

            if !graph.dependencies_met(task) {
                task.status = TaskStatus::Blocked;
                self.agent.update_status(TaskStatus::Blocked, metrics);
                info!("Task {} blocked on unknown dependencies {:?}", task.step_id, task.dependencies);

                let chunk = "\n\n**Error: unmet dependencies.**";
                self.transcript.push_str(chunk);
                yield Ok(AgentResponse::new(metrics.snapshot(), self.agent.id(), chunk));
                return;
            }

            task.status = TaskStatus::Pending;
            self.agent.update_status(TaskStatus::Pending, metrics);

            {
                let responses = self.agent.ask(&task.description, metrics, cancel);
                futures::pin_mut!(responses);

                while let Some(item) = responses.next().await {
                    match item {
                        Ok(response) => {
                            self.transcript.push_str(&response.chunk);
                            yield Ok(response);
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            task.status = TaskStatus::Finished;
            self.agent.update_status(TaskStatus::Finished, metrics);

            let calls = parse_tool_calls(self.agent.last_response());
            debug!("Task {} requested {} tool call(s)", task.step_id, calls.len());

            for call in calls {
                if cancel.is_cancelled() {
                    yield Err(EngineError::Cancelled);
                    return;
                }

                let original: Vec<Value> = call.args.iter().map(ToolArg::to_value).collect();

                let args = match memory.resolve_args(&call.args) {
                    Ok(args) => args,
                    Err(e) => {
                        let chunk = format!("\n**Memory error: {}**", e);
                        self.transcript.push_str(&chunk);
                        yield Ok(AgentResponse::new(metrics.snapshot(), self.agent.id(), chunk));
                        continue;
                    }
                };

                if args != original {
                    let chunk = format!(
                        "\n> *Memory: resolved {} -> {}*",
                        render_values(&original),
                        render_values(&args)
                    );
                    self.transcript.push_str(&chunk);
                    yield Ok(AgentResponse::new(metrics.snapshot(), self.agent.id(), chunk));
                }

                let name = call.function_name;
                let chunk = match self.tools.invoke(&name, args).await {
                    Ok(value) => {
                        let shown = arg_str(&value);
                        memory.set(task.step_id.as_str(), value);
                        format!("\n\n**Result of tool '{}':** {}", name, shown)
                    }
                    Err(EngineError::UnknownTool(_)) => {
                        format!("\n\n**Error: unknown tool '{}'**", name)
                    }
                    Err(EngineError::ToolError(message)) => {
                        format!("\n\n**Error executing '{}': {}**", name, message)
                    }
                    Err(e) => format!("\n\n**Error executing '{}': {}**", name, e),
                };

                self.transcript.push_str(&chunk);
                yield Ok(AgentResponse::new(metrics.snapshot(), self.agent.id(), chunk));
            }
        }
    }
}
