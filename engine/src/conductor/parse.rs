//! Plan and tool-call extraction
//!
//! Generated text is not guaranteed to be pure JSON: it may be wrapped in
//! markdown fences or surrounded by prose. Both parsers strip fences and
//! slice from the first `[` to the last `]` before decoding.
//!
//! Failures are fail-open: the lenient entry points log the error and
//! return an empty list, so a bad plan goes straight to synthesis and a bad
//! tool-call block runs no tools.

use super::types::PlannedTask;
use sdk::errors::EngineError;
use sdk::types::ToolCall;
use serde::Deserialize;
use serde_json::Value;

/// Strip code fences and slice the outermost JSON array
pub fn extract_json_array(raw: &str) -> String {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(start), Some(end)) if start < end => cleaned[start..=end].to_string(),
        _ => cleaned.to_string(),
    }
}

/// Intermediate deserialization type for generated plan steps.
///
/// Every field is read loosely so one oddly typed field never costs the
/// whole plan.
#[derive(Debug, Deserialize)]
struct RawPlanStep {
    #[serde(default, alias = "id")]
    step_id: Option<Value>,

    #[serde(default)]
    title: Option<Value>,

    #[serde(default)]
    description: Option<Value>,

    #[serde(default)]
    dependencies: Option<Value>,
}

/// Step ids may come back as numbers
fn id_string(value: Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Free text: strings as written, other scalars rendered, null as ""
fn text_field(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

/// A list of ids, or a single id standing for a one-element list
fn id_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.into_iter().filter_map(id_string).collect(),
        Some(single) => id_string(single).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Parse a plan, propagating decoding errors
///
/// Tasks without a `step_id` get the positional id `step_{n}` (1-based).
/// Tasks without dependencies depend on `default_root`.
pub fn try_parse_plan(raw: &str, default_root: &str) -> Result<Vec<PlannedTask>, EngineError> {
    let json = extract_json_array(raw);
    let steps: Vec<RawPlanStep> =
        serde_json::from_str(&json).map_err(|e| EngineError::PlanParse(e.to_string()))?;

    let tasks = steps
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let step_id = raw
                .step_id
                .and_then(id_string)
                .unwrap_or_else(|| format!("step_{}", i + 1));

            let mut dependencies = id_list(raw.dependencies);
            if dependencies.is_empty() {
                dependencies.push(default_root.to_string());
            }

            PlannedTask::new(
                step_id,
                text_field(raw.title),
                text_field(raw.description),
                dependencies,
            )
        })
        .collect();

    Ok(tasks)
}

/// Parse a plan, returning no tasks when the text is not a valid plan
pub fn parse_plan(raw: &str, default_root: &str) -> Vec<PlannedTask> {
    try_parse_plan(raw, default_root).unwrap_or_else(|e| {
        tracing::warn!("Discarding unreadable plan: {}", e);
        Vec::new()
    })
}

/// Parse the trailing tool-call block of a task response
pub fn try_parse_tool_calls(raw: &str) -> Result<Vec<ToolCall>, EngineError> {
    let json = extract_json_array(raw);
    serde_json::from_str(&json).map_err(|e| EngineError::ToolParse(e.to_string()))
}

/// Parse tool calls, returning none when the block is unreadable
pub fn parse_tool_calls(raw: &str) -> Vec<ToolCall> {
    try_parse_tool_calls(raw).unwrap_or_else(|e| {
        tracing::warn!("No tool executed, unreadable tool calls: {}", e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::types::TaskStatus;
    use sdk::types::ToolArg;

    #[test]
    fn test_extract_strips_fences_and_prose() {
        let raw = "Here is the plan:\n```json\n[{\"a\": [1]}]\n```\nDone.";
        assert_eq!(extract_json_array(raw), "[{\"a\": [1]}]");
    }

    #[test]
    fn test_extract_without_brackets_returns_cleaned_text() {
        assert_eq!(extract_json_array("  ```no array```  "), "no array");
    }

    #[test]
    fn test_fenced_plan_defaults_dependencies() {
        let raw = r#"```json [{"step_id":"s1","title":"t","description":"d","dependencies":[]}] ```"#;
        let tasks = try_parse_plan(raw, "root").unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].step_id, "s1");
        assert_eq!(tasks[0].status, TaskStatus::Queued);
        assert_eq!(tasks[0].dependencies, vec!["root"]);
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let raw = r#"[{"description": "first"}, {"title": "second", "dependencies": ["step_1"]}]"#;
        let tasks = try_parse_plan(raw, "root").unwrap();

        assert_eq!(tasks[0].step_id, "step_1");
        assert_eq!(tasks[0].title, "");
        assert_eq!(tasks[0].dependencies, vec!["root"]);
        assert_eq!(tasks[1].step_id, "step_2");
        assert_eq!(tasks[1].description, "");
        assert_eq!(tasks[1].dependencies, vec!["step_1"]);
    }

    #[test]
    fn test_numeric_ids_accepted() {
        let raw = r#"[{"id": 1, "description": "a"}, {"step_id": 2, "dependencies": [1]}]"#;
        let tasks = try_parse_plan(raw, "root").unwrap();

        assert_eq!(tasks[0].step_id, "1");
        assert_eq!(tasks[1].step_id, "2");
        assert_eq!(tasks[1].dependencies, vec!["1"]);
    }

    #[test]
    fn test_scalar_title_and_description_are_rendered() {
        let raw = r#"[{"step_id": "s1", "title": 1, "description": true}, {"step_id": "s2", "title": null}]"#;
        let tasks = try_parse_plan(raw, "root").unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "1");
        assert_eq!(tasks[0].description, "true");
        assert_eq!(tasks[1].title, "");
    }

    #[test]
    fn test_single_dependency_string_is_a_list() {
        let raw = r#"[{"step_id": "s0"}, {"step_id": "s1", "dependencies": "s0"}, {"step_id": "s2", "dependencies": 7}]"#;
        let tasks = try_parse_plan(raw, "root").unwrap();

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[1].dependencies, vec!["s0"]);
        assert_eq!(tasks[2].dependencies, vec!["7"]);
    }

    #[test]
    fn test_unusable_dependencies_fall_back_to_root() {
        let raw = r#"[{"step_id": "s1", "dependencies": {"on": "s0"}}, {"step_id": "s2", "dependencies": "  "}]"#;
        let tasks = try_parse_plan(raw, "root").unwrap();

        assert_eq!(tasks[0].dependencies, vec!["root"]);
        assert_eq!(tasks[1].dependencies, vec!["root"]);
    }

    #[test]
    fn test_malformed_plan_fails_open() {
        let raw = "[{\"step_id\": \"s1\",";
        assert!(matches!(
            try_parse_plan(raw, "root"),
            Err(EngineError::PlanParse(_))
        ));
        assert!(parse_plan(raw, "root").is_empty());
        assert!(parse_plan("I cannot plan this.", "root").is_empty());
    }

    #[test]
    fn test_empty_plan() {
        assert!(try_parse_plan("[]", "root").unwrap().is_empty());
    }

    #[test]
    fn test_tool_calls_after_prose() {
        let raw = "I will add the numbers.\n```json\n[{\"function_name\": \"add\", \"args\": [\"$s1\", 3]}]\n```";
        let calls = try_parse_tool_calls(raw).unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function_name, "add");
        assert_eq!(
            calls[0].args,
            vec![ToolArg::Reference("$s1".to_string()), ToolArg::from(3i64)]
        );
    }

    #[test]
    fn test_malformed_tool_calls_fail_open() {
        assert!(matches!(
            try_parse_tool_calls("[{oops}]"),
            Err(EngineError::ToolParse(_))
        ));
        assert!(parse_tool_calls("The answer is 42.").is_empty());
    }
}
