//! External collaborator tools
//!
//! The image classifier and the SQL engine live outside this crate. These
//! tools keep their names and signatures in the registry and report that
//! the collaborator is not connected.

use async_trait::async_trait;
use sdk::core_tool::{arg_str, expect_arity, CoreTool};
use sdk::types::ToolError;
use serde_json::Value;

fn not_connected(collaborator: &str, input: &str) -> ToolError {
    ToolError::Failed(format!(
        "{} collaborator is not connected (input: '{}')",
        collaborator, input
    ))
}

/// Mammogram classification (`vision_tool`)
pub struct VisionTool;

#[async_trait]
impl CoreTool for VisionTool {
    fn name(&self) -> &str {
        "vision_tool"
    }

    fn description(&self) -> &str {
        "Detects a suspicious mass on a mammogram image."
    }

    fn usage(&self) -> &str {
        "[image_path]"
    }

    async fn invoke(&self, args: Vec<Value>) -> Result<Value, ToolError> {
        expect_arity(&args, 1)?;
        Err(not_connected("Image classification", &arg_str(&args[0])))
    }
}

/// Statistics over the case database (`duckdb_tool`)
pub struct SqlTool;

#[async_trait]
impl CoreTool for SqlTool {
    fn name(&self) -> &str {
        "duckdb_tool"
    }

    fn description(&self) -> &str {
        "Compares the case against database statistics with a SQL query."
    }

    fn usage(&self) -> &str {
        "[sql_query]"
    }

    async fn invoke(&self, args: Vec<Value>) -> Result<Value, ToolError> {
        expect_arity(&args, 1)?;
        Err(not_connected("SQL", &arg_str(&args[0])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_collaborators_report_not_connected() {
        let err = VisionTool.invoke(vec![json!("scan.png")]).await.unwrap_err();
        assert!(err.to_string().contains("not connected"));
        assert!(err.to_string().contains("scan.png"));

        let err = SqlTool.invoke(vec![json!("SELECT 1")]).await.unwrap_err();
        assert!(matches!(err, ToolError::Failed(_)));
    }

    #[tokio::test]
    async fn test_collaborators_check_arity() {
        assert!(matches!(
            SqlTool.invoke(vec![]).await,
            Err(ToolError::ArityMismatch { expected: 1, got: 0 })
        ));
    }
}
