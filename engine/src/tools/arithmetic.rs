//! Arithmetic tool

use async_trait::async_trait;
use sdk::core_tool::{expect_arity, CoreTool};
use sdk::types::ToolError;
use serde_json::{json, Value};

/// Adds two numbers.
///
/// Numeric strings such as `"12"` are accepted, since generated tool calls
/// often quote numbers. Integer inputs give an integer result.
pub struct AddTool;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operand {
    Int(i64),
    Float(f64),
}

impl Operand {
    fn parse(value: &Value) -> Result<Self, ToolError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Operand::Int)
                .or_else(|| n.as_f64().map(Operand::Float))
                .ok_or_else(|| ToolError::InvalidArgument(format!("{} is not a number", n))),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Operand::Int)
                    .or_else(|_| s.parse::<f64>().map(Operand::Float))
                    .map_err(|_| ToolError::InvalidArgument(format!("'{}' is not a number", s)))
            }
            other => Err(ToolError::InvalidArgument(format!(
                "{} is not a number",
                other
            ))),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Operand::Int(i) => i as f64,
            Operand::Float(f) => f,
        }
    }
}

#[async_trait]
impl CoreTool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Adds two numbers."
    }

    fn usage(&self) -> &str {
        "[a, b]"
    }

    async fn invoke(&self, args: Vec<Value>) -> Result<Value, ToolError> {
        expect_arity(&args, 2)?;

        let a = Operand::parse(&args[0])?;
        let b = Operand::parse(&args[1])?;

        let sum = match (a, b) {
            (Operand::Int(x), Operand::Int(y)) => match x.checked_add(y) {
                Some(sum) => json!(sum),
                None => json!(x as f64 + y as f64),
            },
            _ => json!(a.as_f64() + b.as_f64()),
        };

        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_integers() {
        assert_eq!(AddTool.invoke(vec![json!(2), json!(3)]).await.unwrap(), json!(5));
    }

    #[tokio::test]
    async fn test_add_coerces_numeric_strings() {
        assert_eq!(
            AddTool.invoke(vec![json!("1"), json!(" 41 ")]).await.unwrap(),
            json!(42)
        );
        assert_eq!(
            AddTool.invoke(vec![json!("0.5"), json!(1)]).await.unwrap(),
            json!(1.5)
        );
    }

    #[tokio::test]
    async fn test_add_rejects_text() {
        let err = AddTool.invoke(vec![json!("abc"), json!(1)]).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));

        let err = AddTool.invoke(vec![json!(null), json!(1)]).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_add_arity() {
        let err = AddTool.invoke(vec![json!(1), json!(2), json!(3)]).await.unwrap_err();
        assert!(matches!(err, ToolError::ArityMismatch { expected: 2, got: 3 }));
    }
}
