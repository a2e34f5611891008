//! Task graph and dependency scheduling

use super::parse::parse_plan;
use super::types::PlannedTask;
use std::collections::HashSet;

/// A plan's tasks in execution order
#[derive(Debug, Clone, Default)]
pub struct Tasks {
    tasks: Vec<PlannedTask>,
    default_root: String,
}

impl Tasks {
    /// Schedule the given tasks
    pub fn new(tasks: Vec<PlannedTask>, default_root: impl Into<String>) -> Self {
        let default_root = default_root.into();
        Self {
            tasks: Self::topological_sort(tasks, &default_root),
            default_root,
        }
    }

    /// Parse generated plan text and schedule it
    pub fn from_plan(raw: &str, default_root: impl Into<String>) -> Self {
        let default_root = default_root.into();
        let tasks = parse_plan(raw, &default_root);
        Self::new(tasks, default_root)
    }

    /// Order tasks so that every task follows its dependencies.
    ///
    /// Greedy: each pass appends the first remaining task whose dependencies
    /// are all placed (the default root counts as placed). When a pass makes
    /// no progress, because of a cycle or an unknown id, the remaining tasks
    /// are appended in their original order. Never fails.
    pub fn topological_sort(tasks: Vec<PlannedTask>, default_root: &str) -> Vec<PlannedTask> {
        sort_counting_passes(tasks, default_root).0
    }

    /// True iff every dependency names a task of this plan or the default root.
    ///
    /// Only id existence is checked, not execution status.
    pub fn dependencies_met(&self, task: &PlannedTask) -> bool {
        task.dependencies.iter().all(|dep| {
            dep == &self.default_root || self.tasks.iter().any(|t| &t.step_id == dep)
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedTask> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn default_root(&self) -> &str {
        &self.default_root
    }

    pub fn get(&self, step_id: &str) -> Option<&PlannedTask> {
        self.tasks.iter().find(|t| t.step_id == step_id)
    }

    pub fn get_mut(&mut self, step_id: &str) -> Option<&mut PlannedTask> {
        self.tasks.iter_mut().find(|t| t.step_id == step_id)
    }

    /// Human-readable plan listing
    pub fn render(&self) -> String {
        let mut out = String::from("\n**Generated plan:**\n");
        for task in &self.tasks {
            out.push_str(&format!("- {}: {}\n", task.step_id, task.description));
        }
        out.push('\n');
        out
    }
}

impl<'a> IntoIterator for &'a Tasks {
    type Item = &'a PlannedTask;
    type IntoIter = std::slice::Iter<'a, PlannedTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

fn sort_counting_passes(tasks: Vec<PlannedTask>, default_root: &str) -> (Vec<PlannedTask>, usize) {
    let max_passes = tasks.len() * 2;
    let mut placed: HashSet<String> = HashSet::from([default_root.to_string()]);
    let mut ordered = Vec::with_capacity(tasks.len());
    let mut remaining = tasks;
    let mut passes = 0;

    while !remaining.is_empty() && passes < max_passes {
        passes += 1;

        let ready = remaining
            .iter()
            .position(|t| t.dependencies.iter().all(|dep| placed.contains(dep)));

        match ready {
            Some(index) => {
                let task = remaining.remove(index);
                placed.insert(task.step_id.clone());
                ordered.push(task);
            }
            None => {
                tracing::warn!(
                    "Unschedulable dependencies for {} task(s), keeping plan order",
                    remaining.len()
                );
                break;
            }
        }
    }

    ordered.append(&mut remaining);
    (ordered, passes)
}
