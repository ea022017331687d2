//! Drives one model/tool iteration loop over a transcript: stream a
//! response, filter `<action>` blocks from the live display, parse tool
//! calls out of the captured text, execute them, and feed results back.

use crate::action_filter::ActionFilter;
use crate::tokens::{compress_transcript, should_compress};
use crate::transport::LlmTransport;
use agent_config::WorkspaceConfig;
use agent_core::{AgentError, ExecutionContext, Message, ToolCall, ToolDefinition, ToolResult};
use agent_tools::{parser, ToolExecutor, ToolRegistry};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_ITERATIONS: u32 = 100;
const WARN_ITERATIONS: u32 = 1000;
const CONSECUTIVE_FAILURE_LIMIT: u32 = 3;
const TEST_COMMAND_TIMEOUT_MS: u64 = 60_000;

/// Tools whose success implies the workspace's file tree changed, and so a
/// configured `test_command` should be re-run.
const FILE_WRITING_TOOLS: &[&str] = &["write_file", "apply_diff"];

/// Emitted to the caller after every streamed chunk so a CLI can print as
/// the model talks, without ever seeing suppressed `<action>` text.
pub trait DisplaySink {
    fn on_chunk(&mut self, text: &str);
}

/// Discards everything; useful in tests that only care about the final state.
pub struct NullSink;
impl DisplaySink for NullSink {
    fn on_chunk(&mut self, _text: &str) {}
}

/// Why a turn stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The model produced a final answer with no pending tool calls.
    Done(String),
    /// `max_iterations` was reached without the model finishing.
    MaxIterations(u32),
    /// The same tool failed `CONSECUTIVE_FAILURE_LIMIT` times in a row.
    ConsecutiveFailures { tool: String, count: u32 },
    /// A single iteration ran in dry-run mode, which always stops after one pass.
    DryRunComplete,
}

pub struct Orchestrator<'a> {
    transport: &'a dyn LlmTransport,
    registry: &'a ToolRegistry,
    executor: &'a ToolExecutor,
    ctx: &'a ExecutionContext,
    workspace_config: &'a WorkspaceConfig,
    max_iterations: u32,
    auto_compress: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        transport: &'a dyn LlmTransport,
        registry: &'a ToolRegistry,
        executor: &'a ToolExecutor,
        ctx: &'a ExecutionContext,
        workspace_config: &'a WorkspaceConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            executor,
            ctx,
            workspace_config,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            auto_compress: true,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        if max_iterations > WARN_ITERATIONS {
            tracing::warn!(max_iterations, "max_iterations is unusually high");
        }
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_auto_compress(mut self, enabled: bool) -> Self {
        self.auto_compress = enabled;
        self
    }

    /// Inject a human-readable tool listing and tag-format usage
    /// instructions into the system message, once, before the first
    /// iteration.
    pub fn inject_tool_definitions(&self, transcript: &mut [Message]) {
        let Some(first) = transcript.first_mut() else {
            return;
        };
        if first.role != agent_core::Role::System {
            return;
        }
        first.content.push_str("\n\n");
        first.content.push_str(&render_tool_listing(self.registry.definitions()));
    }

    /// Drive iterations until a stop condition is reached, appending to
    /// `transcript` in place.
    pub async fn run_turn(
        &self,
        transcript: &mut Vec<Message>,
        sink: &mut dyn DisplaySink,
        cancel: &CancellationToken,
    ) -> Result<StopReason, AgentError> {
        let mut consecutive_failures: HashMap<String, u32> = HashMap::new();

        for iteration in 0..self.max_iterations {
            if cancel.is_cancelled() {
                return Err(AgentError::ModelStreamInterrupt("cancelled".to_string()));
            }

            if self.auto_compress && should_compress(transcript, self.transport.context_window()) {
                let compressed = compress_transcript(transcript);
                tracing::debug!(
                    before = transcript.len(),
                    after = compressed.len(),
                    "auto-compressed transcript"
                );
                *transcript = compressed;
            }

            let definitions: Vec<ToolDefinition> =
                self.registry.definitions().into_iter().cloned().collect();
            let chunks = self
                .transport
                .chat_stream(transcript, &definitions)
                .await
                .map_err(|e| AgentError::ModelStreamInterrupt(e.to_string()))?;

            let mut filter = ActionFilter::new();
            for chunk in &chunks {
                let shown = filter.push(chunk);
                if !shown.is_empty() {
                    sink.on_chunk(&shown);
                }
            }

            let captured = filter.captured().to_string();
            transcript.push(Message::assistant(captured.clone()));

            let parsed = parser::parse_tool_calls(&captured);
            for warning in &parsed.warnings {
                tracing::warn!(iteration, warning, "tool-call parse warning");
            }

            if parsed.calls.is_empty() {
                return Ok(StopReason::Done(parsed.text));
            }

            if self.ctx.mode == agent_core::SafetyMode::DryRun {
                let summary = self.execute_calls(&parsed.calls, &mut consecutive_failures).await;
                if let Some(stop) = summary {
                    return Err(stop);
                }
                transcript.push(Message::user(format!(
                    "{}\n\nContinue.",
                    render_results(&parsed.calls, &[])
                )));
                return Ok(StopReason::DryRunComplete);
            }

            let mut results = Vec::with_capacity(parsed.calls.len());
            let mut wrote_files = false;
            for call in &parsed.calls {
                let result = self.executor.execute(self.registry, self.ctx, call).await;

                match &result {
                    ToolResult::Success { .. } => {
                        consecutive_failures.clear();
                        if FILE_WRITING_TOOLS.contains(&call.tool.as_str()) {
                            wrote_files = true;
                        }
                    }
                    ToolResult::Failure { .. } => {
                        let count = consecutive_failures.entry(call.tool.clone()).or_insert(0);
                        *count += 1;
                        if *count >= CONSECUTIVE_FAILURE_LIMIT {
                            return Err(AgentError::ConsecutiveFailures {
                                tool: call.tool.clone(),
                                count: *count,
                            });
                        }
                    }
                }
                results.push(result);
            }

            let mut report = render_results(&parsed.calls, &results);

            if wrote_files {
                if let Some(test_command) = &self.workspace_config.test_command {
                    report.push_str("\n\n");
                    report.push_str(&self.run_test_command(test_command).await);
                }
            }

            report.push_str("\n\nContinue.");
            transcript.push(Message::user(report));
        }

        Err(AgentError::MaxIterations(self.max_iterations))
    }

    async fn execute_calls(
        &self,
        calls: &[ToolCall],
        consecutive_failures: &mut HashMap<String, u32>,
    ) -> Option<AgentError> {
        for call in calls {
            let result = self.executor.execute(self.registry, self.ctx, call).await;
            if let ToolResult::Failure { .. } = result {
                let count = consecutive_failures.entry(call.tool.clone()).or_insert(0);
                *count += 1;
                if *count >= CONSECUTIVE_FAILURE_LIMIT {
                    return Some(AgentError::ConsecutiveFailures {
                        tool: call.tool.clone(),
                        count: *count,
                    });
                }
            } else {
                consecutive_failures.clear();
            }
        }
        None
    }

    async fn run_test_command(&self, test_command: &str) -> String {
        let mut parts = test_command.split_whitespace();
        let Some(program) = parts.next() else {
            return "test command is empty; skipped".to_string();
        };
        let args: Vec<String> = parts.map(String::from).collect();
        let config = agent_process::RunnerConfig::new(
            self.ctx.workspace_root.clone(),
            self.ctx.mode.to_string(),
        )
        .with_timeout_ms(TEST_COMMAND_TIMEOUT_MS);
        match agent_process::run_command(&config, program, &args).await {
            Ok(output) if output.success() => format!("test command '{test_command}' passed"),
            Ok(output) => format!(
                "test command '{test_command}' failed (exit {:?}):\n{}",
                output.exit_code,
                agent_process::tail(&output.stdout, 2000)
            ),
            Err(e) => format!("test command '{test_command}' errored: {e}"),
        }
    }
}

fn render_tool_listing(definitions: Vec<&ToolDefinition>) -> String {
    let mut out = String::from(
        "Available tools. Invoke them with:\n\
         <action>\n<invoke tool=\"name\"><param name=\"p\">value</param></invoke>\n</action>\n\n",
    );
    for def in definitions {
        out.push_str(&format!("- {} ({})\n", def.name, def.description));
        for param in &def.parameters {
            let req = if param.required { "required" } else { "optional" };
            out.push_str(&format!("    {} [{req}]: {}\n", param.name, param.description));
        }
    }
    out
}

fn render_results(calls: &[ToolCall], results: &[ToolResult]) -> String {
    let mut out = String::new();
    for (i, call) in calls.iter().enumerate() {
        match results.get(i) {
            None => out.push_str(&format!("[{}] (dry-run, not executed)\n", call.tool)),
            Some(ToolResult::Success { output, .. }) => {
                out.push_str(&format!("[{}] succeeded:\n{output}\n", call.tool))
            }
            Some(ToolResult::Failure { error }) => {
                out.push_str(&format!("[{}] failed: {error}\n", call.tool))
            }
        }
    }
    out
}
