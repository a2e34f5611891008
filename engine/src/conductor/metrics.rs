//! Per-agent token and time accounting
//!
//! Every agent of a request writes its record into one [`SharedMetrics`]
//! map, and every outbound record carries a snapshot of that map.
//!
//! # Accounting policy
//!
//! While a generation call streams fragments, the output count is
//! approximated by one token per fragment. A usage event overwrites both
//! counts with the collaborator's totals for the call, added to the counts
//! the agent had before the call started. Elapsed time is recomputed on
//! every event from the same baseline.

use super::types::{AgentRecord, AgentsMetrics};
use crate::llm::Usage;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// The metrics map of one request, shared by every participating agent
#[derive(Debug, Clone, Default)]
pub struct SharedMetrics {
    inner: Arc<Mutex<AgentsMetrics>>,
}

impl SharedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AgentsMetrics> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the entry for the record's id
    pub fn upsert(&self, record: &AgentRecord) {
        self.lock().agents.insert(record.id.clone(), record.clone());
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentRecord> {
        self.lock().agents.get(agent_id).cloned()
    }

    pub fn set_total_time(&self, seconds: f64) {
        self.lock().total_time = seconds;
    }

    pub fn snapshot(&self) -> AgentsMetrics {
        self.lock().clone()
    }
}

/// Accounting state for one generation call
#[derive(Debug, Clone)]
pub struct CallAccounting {
    base_input: u64,
    base_output: u64,
    base_time: f64,
    started: Instant,
    fragments: u64,
}

impl CallAccounting {
    /// Start a call, taking the record's current counters as the baseline
    pub fn begin(record: &AgentRecord) -> Self {
        Self {
            base_input: record.input_token_count,
            base_output: record.output_token_count,
            base_time: record.time_taken,
            started: Instant::now(),
            fragments: 0,
        }
    }

    /// Count one content fragment as one output token
    pub fn on_fragment(&mut self, record: &mut AgentRecord) {
        self.fragments += 1;
        record.output_token_count = self.base_output + self.fragments;
        self.tick(record);
    }

    /// Overwrite the approximation with authoritative totals
    pub fn on_usage(&mut self, record: &mut AgentRecord, usage: Usage) {
        record.input_token_count = self.base_input + usage.prompt_tokens;
        record.output_token_count = self.base_output + usage.completion_tokens;
        self.tick(record);
    }

    /// Refresh elapsed time
    pub fn tick(&self, record: &mut AgentRecord) {
        record.time_taken = self.base_time + self.started.elapsed().as_secs_f64();
    }

    pub fn fragments(&self) -> u64 {
        self.fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::types::AgentType;

    #[test]
    fn test_usage_overrides_fragment_count() {
        let mut record = AgentRecord::with_id("a", AgentType::Executor, vec![]);
        record.output_token_count = 10;
        record.input_token_count = 5;

        let mut accounting = CallAccounting::begin(&record);
        for _ in 0..3 {
            accounting.on_fragment(&mut record);
        }
        assert_eq!(record.output_token_count, 13);

        accounting.on_usage(
            &mut record,
            Usage {
                prompt_tokens: 40,
                completion_tokens: 7,
            },
        );
        assert_eq!(record.output_token_count, 17);
        assert_eq!(record.input_token_count, 45);
        assert_eq!(accounting.fragments(), 3);
    }

    #[test]
    fn test_matching_usage_keeps_count() {
        let mut record = AgentRecord::with_id("a", AgentType::Executor, vec![]);
        let mut accounting = CallAccounting::begin(&record);

        for _ in 0..3 {
            accounting.on_fragment(&mut record);
        }
        accounting.on_usage(
            &mut record,
            Usage {
                prompt_tokens: 2,
                completion_tokens: 3,
            },
        );

        assert_eq!(record.output_token_count, 3);
    }

    #[test]
    fn test_time_is_baseline_plus_elapsed() {
        let mut record = AgentRecord::with_id("a", AgentType::Planner, vec![]);
        record.time_taken = 2.5;

        let accounting = CallAccounting::begin(&record);
        accounting.tick(&mut record);
        let first = record.time_taken;
        accounting.tick(&mut record);

        assert!(first >= 2.5);
        assert!(record.time_taken >= first);
        assert!(record.time_taken < 3.5);
    }

    #[test]
    fn test_shared_map_is_visible_to_all_clones() {
        let metrics = SharedMetrics::new();
        let other = metrics.clone();

        let mut record = AgentRecord::with_id("a", AgentType::Reactive, vec![]);
        metrics.upsert(&record);
        record.output_token_count = 4;
        other.upsert(&record);
        other.set_total_time(1.5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.agents["a"].output_token_count, 4);
        assert_eq!(snapshot.total_time, 1.5);
        assert!(metrics.get("missing").is_none());
    }
}
