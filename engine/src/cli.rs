//! CLI interface for Clara
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Clara task-graph orchestrator
///
/// Plans a request as dependent tasks, executes them against a
/// chat-completion API and its tools, and streams the results.
#[derive(Parser, Debug)]
#[command(name = "clara")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output NDJSON records instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan, execute and answer a request
    Ask {
        /// The request to answer
        request: String,

        /// Use the built-in scripted collaborator instead of the network
        #[arg(long)]
        offline: bool,

        /// Answer directly with the reactive agent, without planning
        #[arg(long)]
        direct: bool,
    },

    /// Show the scheduled plan for a request without executing it
    Plan {
        /// The request to plan
        request: String,

        /// Use the built-in scripted collaborator instead of the network
        #[arg(long)]
        offline: bool,
    },

    /// List the enabled tools
    Tools,

    /// Show the effective configuration
    Config,
}

impl Command {
    /// Whether the command calls the generation collaborator over the network
    pub fn needs_credentials(&self) -> bool {
        match self {
            Command::Ask { offline, .. } | Command::Plan { offline, .. } => !offline,
            Command::Tools | Command::Config => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::try_parse_from(["clara", "ask", "add 2 and 3", "--json", "--offline"]).unwrap();

        assert!(cli.json);
        match cli.command {
            Command::Ask {
                ref request,
                offline,
                direct,
            } => {
                assert_eq!(request, "add 2 and 3");
                assert!(offline);
                assert!(!direct);
            }
            _ => panic!("expected ask"),
        }
        assert!(!cli.command.needs_credentials());
    }

    #[test]
    fn test_plan_needs_credentials_online() {
        let cli = Cli::try_parse_from(["clara", "--log", "debug", "plan", "triage"]).unwrap();

        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert!(cli.command.needs_credentials());
    }

    #[test]
    fn test_request_is_required() {
        assert!(Cli::try_parse_from(["clara", "ask"]).is_err());
    }
}
