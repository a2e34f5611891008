//! Conductor System
//!
//! Orchestrates planning, dependency scheduling, task execution and
//! synthesis into a single response stream.

pub mod agent;
pub mod executor;
pub mod graph;
pub mod memory;
pub mod metrics;
pub mod parse;
pub mod planner;
pub mod types;

pub use agent::{Agent, ReactiveAgent};
pub use executor::TaskExecutor;
pub use graph::Tasks;
pub use memory::MemoryStore;
pub use metrics::{CallAccounting, SharedMetrics};
pub use planner::Planner;
pub use types::{AgentRecord, AgentResponse, AgentType, AgentsMetrics, PlannedTask, TaskStatus};
