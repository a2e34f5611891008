pub mod arithmetic;
pub mod collaborators;
pub mod guidelines;

pub use arithmetic::AddTool;
pub use collaborators::{SqlTool, VisionTool};
pub use guidelines::GuidelineTool;

use crate::config::ToolsConfig;
use sdk::core_tool::CoreTool;
use sdk::errors::EngineError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of tools the executor may call, keyed by name.
///
/// Only registered tools are advertised in prompts and available for
/// dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn CoreTool>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the registry from the `[tools]` configuration section
    pub fn from_config(config: &ToolsConfig) -> Self {
        let mut registry = Self::empty();

        if config.add {
            registry.register(AddTool);
        }
        if config.guidelines {
            registry.register(GuidelineTool);
        }
        if config.vision {
            registry.register(VisionTool);
        }
        if config.sql {
            registry.register(SqlTool);
        }

        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: impl CoreTool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CoreTool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke a tool with already-resolved arguments
    ///
    /// # Errors
    ///
    /// `EngineError::UnknownTool` when no tool has this name,
    /// `EngineError::ToolError` when the tool itself fails.
    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, EngineError> {
        let Some(tool) = self.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(EngineError::UnknownTool(name.to_string()));
        };

        match tool.invoke(args).await {
            Ok(value) => {
                info!("Tool '{}' executed. Result: {}", name, value);
                Ok(value)
            }
            Err(e) => {
                warn!("Tool '{}' failed: {}", name, e);
                Err(EngineError::ToolError(e.to_string()))
            }
        }
    }

    /// Describe the registered tools for a system prompt.
    pub fn prompt_section(&self) -> String {
        if self.tools.is_empty() {
            return "No tools are available.".to_string();
        }

        let mut parts = Vec::new();
        for name in self.names() {
            let Some(tool) = self.tools.get(name) else {
                continue;
            };
            parts.push(format!("## {}", name));
            parts.push(tool.description().to_string());
            parts.push(format!("Parameters: {}", tool.usage()));
            parts.push(String::new());
        }

        parts.join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
