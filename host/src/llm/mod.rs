//! LLM abstraction. A single `Llm` trait fronts whichever provider backs an
//! `LLMConfig`; the execution facade caches one instance per `llm_id`.

mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use ollama_rs::generation::{chat::ChatMessage, tools::ToolInfo};
use tokio::sync::mpsc;

/// Per-call parameter overrides, already resolved by the caller according
/// to the precedence order: per-call override, referenced LLMConfig,
/// client default.
#[derive(Debug, Clone, Default)]
pub struct ChatParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait Llm: Send + Sync {
    /// Send a full message history (already including any system prompt)
    /// plus the tool schemas permitted for this call, and get back the
    /// model's next message — which may itself carry tool calls.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolInfo],
        params: &ChatParams,
    ) -> anyhow::Result<ChatMessage>;

    /// Same contract as `chat`, but text content is forwarded to `tokens`
    /// incrementally as it streams in, rather than only being available in
    /// the returned message. Tool calls, if any, still only become known
    /// once the provider has finished emitting them — most providers
    /// (including Ollama) deliver them whole rather than incrementally.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolInfo],
        params: &ChatParams,
        tokens: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<ChatMessage>;

    fn model(&self) -> &str;
}
