//! The CLI ships without a concrete HTTP-backed transport; wiring one in is
//! left to the embedding application per the trait boundary this crate
//! models. `EchoTransport` keeps the binary runnable end-to-end (REPL loop,
//! tool execution, transcript handling) without a network dependency.

use agent_core::{Message, ToolDefinition};
use agent_orchestrator::LlmTransport;
use async_trait::async_trait;

#[derive(Default)]
pub struct EchoTransport;

#[async_trait]
impl LlmTransport for EchoTransport {
    async fn chat(&self, messages: &[Message], _tools: &[ToolDefinition]) -> anyhow::Result<String> {
        Ok(last_user_echo(messages))
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> anyhow::Result<Vec<String>> {
        Ok(vec![last_user_echo(messages)])
    }

    fn model_name(&self) -> &str {
        "none (no transport configured)"
    }

    fn list_models(&self) -> Vec<String> {
        Vec::new()
    }
}

fn last_user_echo(messages: &[Message]) -> String {
    let last_user = messages
        .iter()
        .rev()
        .find(|m| m.role == agent_core::Role::User)
        .map(|m| m.content.clone())
        .unwrap_or_default();
    format!(
        "No LLM transport is configured; echoing the last message instead.\n\n{last_user}"
    )
}
