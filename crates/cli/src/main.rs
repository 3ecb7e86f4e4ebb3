//! Codewright command-line interface.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use codewright_config::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "codewright",
    version,
    about = "Autonomous coding agent for OpenAI-compatible endpoints"
)]
struct Cli {
    /// Verbose logging (tool dispatch, loop phases)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace root the agent operates in (defaults to the config
    /// value, then the current directory)
    #[arg(short = 'C', long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent on a task
    Run {
        /// The task, in plain language
        task: Vec<String>,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// Iteration cap override
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// List the available tools
    Tools,

    /// List the registered subagents
    Subagents,

    /// Print the default configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "codewright=debug,info"
    } else {
        "codewright=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_target(false)
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Run {
            task,
            model,
            max_iterations,
        } => {
            let task = task.join(" ");
            if task.trim().is_empty() {
                anyhow::bail!("No task given. Usage: codewright run <task>");
            }
            commands::run(config, cli.workspace, task, model, max_iterations, cli.verbose).await
        }
        Command::Tools => commands::tools(config, cli.workspace),
        Command::Subagents => {
            commands::subagents();
            Ok(())
        }
        Command::Config => {
            print!("{}", AppConfig::default_toml());
            Ok(())
        }
    }
}
