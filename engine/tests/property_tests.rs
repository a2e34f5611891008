use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;

use clara_engine::conductor::{MemoryStore, PlannedTask, Tasks};
use sdk::ToolArg;

const ROOT: &str = "root";

/// A random acyclic plan: task `i` may depend on any task `j < i`, and the
/// tasks are handed to the scheduler in shuffled order.
fn acyclic_plan() -> impl Strategy<Value = Vec<PlannedTask>> {
    (1..10usize)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n),
                Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
            )
        })
        .prop_map(|(edges, order)| {
            order
                .into_iter()
                .map(|i| {
                    let mut deps: Vec<String> = (0..i)
                        .filter(|&j| edges[i][j])
                        .map(|j| format!("s{}", j))
                        .collect();
                    if deps.is_empty() {
                        deps.push(ROOT.to_string());
                    }
                    PlannedTask::new(format!("s{}", i), "t", "d", deps)
                })
                .collect()
        })
}

/// Arbitrary plans, cycles and unknown dependencies included
fn any_plan() -> impl Strategy<Value = Vec<PlannedTask>> {
    proptest::collection::vec(proptest::collection::vec(0..8usize, 0..3), 0..8).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, deps)| {
                let deps = deps.into_iter().map(|d| format!("s{}", d)).collect();
                PlannedTask::new(format!("s{}", i), "t", "d", deps)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn test_sort_is_a_permutation(plan in any_plan()) {
        let mut before: Vec<String> = plan.iter().map(|t| t.step_id.clone()).collect();
        let sorted = Tasks::topological_sort(plan, ROOT);
        let mut after: Vec<String> = sorted.iter().map(|t| t.step_id.clone()).collect();

        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn test_acyclic_plans_respect_dependencies(plan in acyclic_plan()) {
        let sorted = Tasks::topological_sort(plan, ROOT);
        let position: HashMap<&str, usize> = sorted
            .iter()
            .enumerate()
            .map(|(i, t)| (t.step_id.as_str(), i))
            .collect();

        for (i, task) in sorted.iter().enumerate() {
            for dep in task.dependencies.iter().filter(|d| d.as_str() != ROOT) {
                prop_assert!(position[dep.as_str()] < i, "{} scheduled before {}", task.step_id, dep);
            }
        }
    }

    #[test]
    fn test_dependencies_met_iff_known(plan in any_plan(), extra in proptest::collection::vec(0..12usize, 0..4)) {
        let tasks = Tasks::new(plan, ROOT);
        let deps: Vec<String> = extra.iter().map(|d| format!("s{}", d)).collect();
        let candidate = PlannedTask::new("candidate", "t", "d", deps.clone());

        let known = deps.iter().all(|d| tasks.get(d).is_some());
        prop_assert_eq!(tasks.dependencies_met(&candidate), known);
    }

    #[test]
    fn test_resolve_args_preserves_order(values in proptest::collection::vec(-1000i64..1000, 0..8)) {
        let mut memory = MemoryStore::new();
        let mut args = Vec::new();
        for (i, value) in values.iter().enumerate() {
            if i % 2 == 0 {
                memory.set(format!("step_{}", i), json!(value));
                args.push(ToolArg::text(format!("$step_{}", i)));
            } else {
                args.push(ToolArg::from(*value));
            }
        }

        let resolved = memory.resolve_args(&args).unwrap();
        let expected: Vec<Value> = values.iter().map(|v| json!(v)).collect();
        prop_assert_eq!(resolved, expected);
    }

    #[test]
    fn test_unresolved_reference_fails(key in "[a-z]{1,8}") {
        let memory = MemoryStore::new();
        let arg = ToolArg::text(format!("${}", key));

        prop_assert!(memory.resolve_args(&[ToolArg::from(1i64), arg]).is_err());
    }
}
