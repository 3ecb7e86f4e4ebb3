//! Subcommand implementations.

use anyhow::Result;
use codewright_agent::controller::AgentLoopController;
use codewright_agent::subagent::{DelegateTool, SubagentRegistry, SubagentRunner};
use codewright_config::AppConfig;
use codewright_core::{AgentEvent, EventBus, ModelClient, ToolExecutor};
use codewright_providers::{ManualToolCallClient, OpenAiCompatClient};
use codewright_tools::{Workspace, WorkspaceExecutor, default_catalog};
use std::path::PathBuf;
use std::sync::Arc;

/// Run the agent on a task and print the final answer.
pub async fn run(
    config: AppConfig,
    workspace_override: Option<PathBuf>,
    task: String,
    model_override: Option<String>,
    max_iterations: Option<u32>,
    verbose: bool,
) -> Result<()> {
    let root = workspace_override.unwrap_or_else(|| config.workspace_root());
    let workspace = Workspace::new(&root)?;
    let model = model_override.unwrap_or_else(|| config.default_model.clone());
    tracing::info!(model = %model, workspace = %root.display(), "starting run");

    let mut policy = config.policy.clone();
    if let Some(cap) = max_iterations {
        policy.max_iterations = cap;
    }

    let client = build_client(&config)?;
    let events = Arc::new(EventBus::default());

    // Subagents share the model and the plain catalog; the parent's
    // catalog additionally carries the delegate tool.
    let base_executor: Arc<dyn ToolExecutor> =
        Arc::new(WorkspaceExecutor::with_defaults(workspace.clone()));
    let runner = Arc::new(
        SubagentRunner::new(Arc::clone(&client), base_executor, model.clone())
            .with_policy(policy.clone())
            .with_events(Arc::clone(&events)),
    );
    let mut catalog = default_catalog(workspace);
    catalog.register(Box::new(DelegateTool::new(runner)));
    let executor: Arc<dyn ToolExecutor> = Arc::new(WorkspaceExecutor::new(catalog));

    let controller = AgentLoopController::new(client, executor, model)
        .with_policy(policy)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens)
        .with_events(Arc::clone(&events));

    let mut rx = events.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            print_event(&event, verbose);
        }
    });

    let outcome = controller.run(&task).await?;
    printer.abort();

    println!("{}", outcome.answer);
    eprintln!(
        "\n[{} after {} iteration{}]",
        outcome.stop_reason.as_str(),
        outcome.iterations,
        if outcome.iterations == 1 { "" } else { "s" }
    );
    if !outcome.state.files_modified.is_empty() {
        let mut modified: Vec<&str> = outcome
            .state
            .files_modified
            .iter()
            .map(|s| s.as_str())
            .collect();
        modified.sort_unstable();
        eprintln!("[modified: {}]", modified.join(", "));
    }
    Ok(())
}

/// Print the tool catalog for the given workspace.
pub fn tools(config: AppConfig, workspace_override: Option<PathBuf>) -> Result<()> {
    let root = workspace_override.unwrap_or_else(|| config.workspace_root());
    let workspace = Workspace::new(&root)?;
    let catalog = default_catalog(workspace);

    for spec in catalog.specs() {
        let marker = if spec.mutating { "*" } else { " " };
        println!("{marker} {:<16} {}", spec.name, spec.description);
    }
    println!("\n(* = mutates the workspace)");
    Ok(())
}

/// Print the registered subagents.
pub fn subagents() {
    let registry = SubagentRegistry::new();
    for name in registry.names() {
        if let Ok(spec) = registry.get(name) {
            println!("{:<18} {}", spec.name, spec.description);
        }
    }
}

fn build_client(config: &AppConfig) -> Result<Arc<dyn ModelClient>> {
    let base = OpenAiCompatClient::with_timeout(
        config.api_url.clone(),
        config.api_key.clone(),
        config.request_timeout_secs,
    )?
    .with_native_tool_calls(config.native_tool_calls);

    Ok(if config.native_tool_calls {
        Arc::new(base)
    } else {
        // catalog-injection wrapper; calls come back through the
        // free-text recovery parser
        Arc::new(ManualToolCallClient::new(base))
    })
}

fn print_event(event: &AgentEvent, verbose: bool) {
    match event {
        AgentEvent::ToolExecuted {
            tool_name,
            success,
            duration_ms,
            ..
        } => {
            let status = if *success { "ok" } else { "failed" };
            eprintln!("  -> {tool_name} {status} ({duration_ms}ms)");
        }
        AgentEvent::LoopDetected { pattern, .. } => {
            eprintln!("  !! loop detected: {pattern}");
        }
        AgentEvent::GuidanceInjected { reason, .. } if verbose => {
            eprintln!("  .. guidance injected: {reason}");
        }
        AgentEvent::PhaseChanged {
            iteration, phase, ..
        } if verbose => {
            eprintln!("[{iteration}] {phase}");
        }
        AgentEvent::HistoryCompacted {
            messages_before,
            messages_after,
            ..
        } if verbose => {
            eprintln!("  .. history compacted: {messages_before} -> {messages_after} messages");
        }
        AgentEvent::ResultEvicted {
            scratch_key,
            original_chars,
            ..
        } if verbose => {
            eprintln!("  .. large result ({original_chars} chars) parked as {scratch_key}");
        }
        AgentEvent::SubagentFinished {
            name, reply_chars, ..
        } => {
            eprintln!("  <- subagent {name} replied ({reply_chars} chars)");
        }
        _ => {}
    }
}
