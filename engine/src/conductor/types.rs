//! Conductor data types
//!
//! Plan tasks, per-agent accounting records, and the outbound stream record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle of a planned task (and of the agent running it)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Queued,
    Pending,
    Finished,
    Blocked,
}

/// One unit task of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Identifier, unique within a plan
    pub step_id: String,

    pub title: String,

    /// Instruction passed to the executor's generation call
    pub description: String,

    /// Step ids this task needs; never empty once parsed
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub status: TaskStatus,
}

impl PlannedTask {
    pub fn new(
        step_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            title: title.into(),
            description: description.into(),
            dependencies,
            status: TaskStatus::Queued,
        }
    }
}

/// Role of an agent in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Planner,
    Executor,
    Reactive,
}

/// Cumulative accounting for one agent instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub agent_type: AgentType,

    /// Upstream agent ids, for lineage display only
    pub dependencies: Vec<String>,

    pub status: TaskStatus,

    pub input_token_count: u64,

    pub output_token_count: u64,

    /// Seconds spent in generation calls
    pub time_taken: f64,
}

impl AgentRecord {
    /// Create a record with a freshly minted id
    pub fn new(agent_type: AgentType, dependencies: Vec<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), agent_type, dependencies)
    }

    /// Create a record with a caller-chosen id
    pub fn with_id(id: impl Into<String>, agent_type: AgentType, dependencies: Vec<String>) -> Self {
        Self {
            id: id.into(),
            agent_type,
            dependencies,
            status: TaskStatus::Queued,
            input_token_count: 0,
            output_token_count: 0,
            time_taken: 0.0,
        }
    }
}

/// Snapshot of every agent participating in one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentsMetrics {
    pub agents: BTreeMap<String, AgentRecord>,

    /// Seconds for the whole request, set when the stream completes
    pub total_time: f64,
}

/// One outbound stream record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub metrics: AgentsMetrics,
    pub agent_id: String,
    pub chunk: String,
}

impl AgentResponse {
    pub fn new(metrics: AgentsMetrics, agent_id: impl Into<String>, chunk: impl Into<String>) -> Self {
        Self {
            metrics,
            agent_id: agent_id.into(),
            chunk: chunk.into(),
        }
    }

    /// Serialize as a single NDJSON line, newline included
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
