use agent_core::{ExecutionContext, Message, SafetyMode};
use agent_orchestrator::{Orchestrator, StopReason};
use agent_tools::{ToolExecutor, ToolRegistry};
use anyhow::Context;
use clap::Parser;
use std::io::Write;
use tokio_util::sync::CancellationToken;

mod cli;
mod interactive_approval;
mod repl_sink;
mod transport;

use cli::Cli;
use interactive_approval::InteractiveApproval;
use repl_sink::StderrSink;

const APP_NAME: &str = "agent";

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run() -> anyhow::Result<i32> {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            return Ok(if e.use_stderr() { 2 } else { 0 });
        }
    };

    let workspace_root = match &cli.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("resolving current directory")?,
    };

    let workspace_config = agent_config::WorkspaceConfig::load(&workspace_root, APP_NAME)
        .context("loading workspace configuration")?;

    let mode = agent_config::resolve_safety_mode(
        cli.mode.map(SafetyMode::from),
        workspace_config.safety_mode,
    );
    let ctx = ExecutionContext::new(workspace_root.clone(), mode);

    let mut registry = ToolRegistry::new();
    for tool in agent_tools::builtins::all_builtin_tools(Default::default()) {
        registry
            .register(tool)
            .context("registering a built-in tool")?;
    }

    let mcp_manager = agent_mcp::McpManager::start(
        &workspace_config.mcp_servers,
        &workspace_root,
        &mut registry,
        |server, command| interactive_approval::confirm_launcher(server, command),
    )
    .await;

    tracing::info!(tools = registry.len(), mcp_servers = mcp_manager.server_count(), "ready");

    let transport = transport::EchoTransport::default();
    let executor = ToolExecutor::new(InteractiveApproval);
    let orchestrator_max_iterations = cli.max_iterations;

    let mut transcript = vec![Message::system(system_prompt(&workspace_config))];
    let cancel = CancellationToken::new();
    let mut sink = StderrSink;

    let result = if let Some(prompt) = cli.prompt {
        transcript.push(Message::user(prompt));
        run_one_turn(
            &transport,
            &registry,
            &executor,
            &ctx,
            &workspace_config,
            orchestrator_max_iterations,
            &mut transcript,
            &mut sink,
            &cancel,
        )
        .await
    } else {
        run_repl(
            &transport,
            &registry,
            &executor,
            &ctx,
            &workspace_config,
            orchestrator_max_iterations,
            &mut transcript,
            &mut sink,
            &cancel,
        )
        .await
    };

    mcp_manager.shutdown().await;
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_one_turn(
    transport: &transport::EchoTransport,
    registry: &ToolRegistry,
    executor: &ToolExecutor,
    ctx: &ExecutionContext,
    workspace_config: &agent_config::WorkspaceConfig,
    max_iterations: Option<u32>,
    transcript: &mut Vec<Message>,
    sink: &mut dyn agent_orchestrator::DisplaySink,
    cancel: &CancellationToken,
) -> anyhow::Result<i32> {
    let mut orchestrator = Orchestrator::new(transport, registry, executor, ctx, workspace_config);
    if let Some(n) = max_iterations {
        orchestrator = orchestrator.with_max_iterations(n);
    }
    orchestrator.inject_tool_definitions(transcript);

    match orchestrator.run_turn(transcript, sink, cancel).await {
        Ok(StopReason::Done(text)) => {
            println!("{text}");
            Ok(0)
        }
        Ok(StopReason::DryRunComplete) => {
            println!("(dry run; no changes applied)");
            Ok(0)
        }
        Ok(StopReason::MaxIterations(n)) => {
            eprintln!("stopped after reaching the iteration limit ({n})");
            Ok(1)
        }
        Ok(StopReason::ConsecutiveFailures { tool, count }) => {
            eprintln!("stopped after '{tool}' failed {count} times in a row");
            Ok(1)
        }
        Err(e) if e.is_terminal() => {
            eprintln!("error: {e}");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_repl(
    transport: &transport::EchoTransport,
    registry: &ToolRegistry,
    executor: &ToolExecutor,
    ctx: &ExecutionContext,
    workspace_config: &agent_config::WorkspaceConfig,
    max_iterations: Option<u32>,
    transcript: &mut Vec<Message>,
    sink: &mut dyn agent_orchestrator::DisplaySink,
    cancel: &CancellationToken,
) -> anyhow::Result<i32> {
    let mut orchestrator = Orchestrator::new(transport, registry, executor, ctx, workspace_config);
    if let Some(n) = max_iterations {
        orchestrator = orchestrator.with_max_iterations(n);
    }
    orchestrator.inject_tool_definitions(transcript);

    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        line.clear();
        if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            return Ok(0);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "/exit" || trimmed == "/quit" {
            return Ok(0);
        }

        transcript.push(Message::user(trimmed.to_string()));
        match orchestrator.run_turn(transcript, sink, cancel).await {
            Ok(StopReason::Done(text)) => println!("{text}"),
            Ok(StopReason::DryRunComplete) => println!("(dry run; no changes applied)"),
            Ok(StopReason::MaxIterations(n)) => {
                eprintln!("stopped after reaching the iteration limit ({n})")
            }
            Ok(StopReason::ConsecutiveFailures { tool, count }) => {
                eprintln!("stopped after '{tool}' failed {count} times in a row")
            }
            Err(e) if e.is_terminal() => {
                eprintln!("error: {e}");
                return Ok(1);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn system_prompt(workspace_config: &agent_config::WorkspaceConfig) -> String {
    let mut prompt = "You are a coding agent working inside a sandboxed workspace.".to_string();
    if let Some(notes) = &workspace_config.notes {
        prompt.push_str("\n\n");
        prompt.push_str(notes);
    }
    prompt
}

fn init_tracing() {
    let debug_enabled = agent_config::StateDirs::debug_enabled(APP_NAME);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    if debug_enabled {
        if let Ok(dirs) = agent_config::StateDirs::resolve(APP_NAME) {
            if let Some(parent) = dirs.debug_log.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            if let Some(file_name) = dirs.debug_log.file_name() {
                let appender = tracing_appender::rolling::never(
                    dirs.debug_log.parent().unwrap_or(&dirs.debug_log),
                    file_name,
                );
                tracing_subscriber::fmt()
                    .with_writer(appender)
                    .with_env_filter(filter)
                    .try_init()
                    .ok();
                return;
            }
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .ok();
}
