//! The LLM transport boundary: a chat-completions-style interface the
//! orchestrator drives. No HTTP client lives here — only the trait and a
//! scripted fixture implementation for tests, matching how the teacher's
//! memory subsystem abstracts its own chat dependency behind a narrow trait.

use agent_core::{Message, ToolDefinition};
use async_trait::async_trait;
use std::sync::Mutex;

#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Request a complete (non-streamed) response.
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> anyhow::Result<String>;

    /// Request a streamed response as a sequence of text chunks. The
    /// fixture transport returns all chunks eagerly; a real transport would
    /// yield them as they arrive over the wire.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> anyhow::Result<Vec<String>>;

    fn model_name(&self) -> &str;

    fn list_models(&self) -> Vec<String>;

    /// Advertised context window in tokens, used for auto-compression.
    fn context_window(&self) -> u64 {
        128_000
    }
}

/// Returns a fixed, pre-scripted sequence of full responses, one per call to
/// `chat`/`chat_stream`. `chat_stream` splits each scripted response into
/// fixed-size chunks so tests can exercise the `<action>`-boundary-spanning
/// streaming filter.
pub struct FixtureTransport {
    responses: Mutex<std::collections::VecDeque<String>>,
    model: String,
    chunk_size: usize,
}

impl FixtureTransport {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            model: "fixture-model".to_string(),
            chunk_size: 8,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    fn next_response(&self) -> anyhow::Result<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("fixture transport has no scripted responses left"))
    }
}

#[async_trait]
impl LlmTransport for FixtureTransport {
    async fn chat(&self, _messages: &[Message], _tools: &[ToolDefinition]) -> anyhow::Result<String> {
        self.next_response()
    }

    async fn chat_stream(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> anyhow::Result<Vec<String>> {
        let response = self.next_response()?;
        let chars: Vec<char> = response.chars().collect();
        Ok(chars
            .chunks(self.chunk_size.max(1))
            .map(|c| c.iter().collect())
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn list_models(&self) -> Vec<String> {
        vec![self.model.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_transport_returns_scripted_response() {
        let transport = FixtureTransport::new(["hello"]);
        let response = transport.chat(&[], &[]).await.unwrap();
        assert_eq!(response, "hello");
    }

    #[tokio::test]
    async fn test_fixture_transport_exhausts_and_errors() {
        let transport = FixtureTransport::new(["only one"]);
        transport.chat(&[], &[]).await.unwrap();
        assert!(transport.chat(&[], &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_fixture_transport_chunks_stream() {
        let transport = FixtureTransport::new(["abcdefgh"]).with_chunk_size(2);
        let chunks = transport.chat_stream(&[], &[]).await.unwrap();
        assert_eq!(chunks, vec!["ab", "cd", "ef", "gh"]);
    }
}
