//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - ask: Stream a planned (or direct) answer
//! - plan: Show the scheduled plan without executing it
//! - tools: List the enabled tools
//! - config: Show the effective configuration

use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::conductor::{Planner, ReactiveAgent, SharedMetrics};
use crate::config::Config;
use crate::llm::{LLMProvider, OpenAICompatProvider, ScriptedProvider, ScriptedReply};
use crate::tools::ToolRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn online_provider(config: &Config) -> Arc<dyn LLMProvider> {
    Arc::new(OpenAICompatProvider::new(&config.llm))
}

/// Cancel the token on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling request");
            token.cancel();
        }
    });

    cancel
}

/// The scripted conversation `--offline` replays for a planned request
pub fn offline_script(request: &str) -> Vec<ScriptedReply> {
    let plan = json!([
        {
            "step_id": "step_1",
            "title": "Guideline lookup",
            "description": format!("Search the clinical guidelines for: {}", request),
            "dependencies": []
        },
        {
            "step_id": "step_2",
            "title": "Sample computation",
            "description": "Add 2 and 3.",
            "dependencies": []
        },
        {
            "step_id": "step_3",
            "title": "Follow-up computation",
            "description": "Add 10 to $step_2.",
            "dependencies": ["step_2"]
        }
    ]);

    let call = |name: &str, args: serde_json::Value| {
        format!(
            "Calling {}.\n```json\n{}\n```",
            name,
            json!([{ "function_name": name, "args": args }])
        )
    };

    vec![
        ScriptedReply::Text(format!("```json\n{}\n```", plan)),
        ScriptedReply::Text(call("rag_tool", json!([request]))),
        ScriptedReply::Text(call("add", json!([2, 3]))),
        ScriptedReply::Text(call("add", json!(["$step_2", 10]))),
        ScriptedReply::text(
            "Offline answer: the guideline lookup ran and the sample computation gave 15.",
        ),
    ]
}

/// Stream an answer to a request
///
/// Prints NDJSON records with `--json`, otherwise the chunk text as it
/// arrives. Ctrl-C cancels the request.
pub async fn handle_ask(
    request: String,
    offline: bool,
    direct: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let tools = Arc::new(ToolRegistry::from_config(&config.tools));
    let cancel = cancel_on_ctrl_c();

    if direct {
        let provider: Arc<dyn LLMProvider> = if offline {
            Arc::new(ScriptedProvider::new([ScriptedReply::text(
                "Offline answer: no collaborator is connected.",
            )]))
        } else {
            online_provider(config)
        };
        return handle_direct(&request, provider, config, &cancel, format).await;
    }

    let provider: Arc<dyn LLMProvider> = if offline {
        Arc::new(ScriptedProvider::new(offline_script(&request)))
    } else {
        online_provider(config)
    };

    let mut planner = Planner::new(provider, &config.llm, tools);
    let responses = planner.ask(&request, cancel.clone());
    futures::pin_mut!(responses);

    let mut stdout = std::io::stdout();
    while let Some(response) = responses.next().await {
        match format {
            OutputFormat::Json => {
                let line = response.to_ndjson().context("Failed to encode record")?;
                stdout.write_all(line.as_bytes())?;
            }
            OutputFormat::Text => {
                stdout.write_all(response.chunk.as_bytes())?;
            }
        }
        stdout.flush()?;
    }

    if let OutputFormat::Text = format {
        writeln!(stdout)?;
    }

    if cancel.is_cancelled() {
        anyhow::bail!("Request cancelled");
    }

    Ok(())
}

async fn handle_direct(
    request: &str,
    provider: Arc<dyn LLMProvider>,
    config: &Config,
    cancel: &CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    let metrics = SharedMetrics::new();
    let mut agent = ReactiveAgent::new(provider, config.llm.reactive_model.as_str());

    let answer = agent.handle_request(request, &metrics, cancel).await;

    match format {
        OutputFormat::Text => println!("{}", answer),
        OutputFormat::Json => {
            let output = json!({
                "answer": answer,
                "metrics": metrics.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Show the scheduled plan for a request
pub async fn handle_plan(
    request: String,
    offline: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let tools = Arc::new(ToolRegistry::from_config(&config.tools));
    let provider: Arc<dyn LLMProvider> = if offline {
        Arc::new(ScriptedProvider::new(offline_script(&request)))
    } else {
        online_provider(config)
    };

    let cancel = cancel_on_ctrl_c();
    let mut planner = Planner::new(provider, &config.llm, tools);
    let tasks = planner
        .plan_only(&request, &cancel)
        .await
        .context("Planning failed")?;

    match format {
        OutputFormat::Text => {
            if tasks.is_empty() {
                println!("The plan is empty.");
            } else {
                print!("{}", tasks.render());
                for task in &tasks {
                    println!("  {} depends on {}", task.step_id, task.dependencies.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let steps: Vec<_> = tasks.iter().collect();
            let output = json!({
                "default_root": tasks.default_root(),
                "tasks": steps,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// List the enabled tools
pub fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::from_config(&config.tools);

    match format {
        OutputFormat::Text => {
            if registry.is_empty() {
                println!("No tools enabled");
                return Ok(());
            }

            println!("Enabled tools:");
            for name in registry.names() {
                if let Some(tool) = registry.get(name) {
                    println!("  {:<12} {} {}", name, tool.usage(), tool.description());
                }
            }
        }
        OutputFormat::Json => {
            let tools: Vec<_> = registry
                .names()
                .into_iter()
                .filter_map(|name| registry.get(name))
                .map(|tool| {
                    json!({
                        "name": tool.name(),
                        "usage": tool.usage(),
                        "description": tool.description(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
    }

    Ok(())
}

/// Show the effective configuration; the API key is never printed
pub fn handle_config(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", text);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::Tasks;

    #[test]
    fn test_offline_script_plans_three_tasks() {
        let script = offline_script("mass after \"mastectomy\"");
        assert_eq!(script.len(), 5);

        let ScriptedReply::Text(plan) = &script[0] else {
            panic!("expected a plan");
        };
        let tasks = Tasks::from_plan(plan, "root");
        assert_eq!(tasks.len(), 3);
        assert!(tasks.get("step_1").unwrap().description.contains("\"mastectomy\""));
        assert_eq!(tasks.get("step_3").unwrap().dependencies, vec!["step_2"]);
    }
}
