//! Ollama-backed `Llm` implementation. `chat` goes through `ollama-rs`'s
//! single-shot request; `stream_chat` talks to Ollama's `/api/chat`
//! streaming endpoint directly over `reqwest`, parsing its newline-delimited
//! JSON response body chunk by chunk. Grounded on the teacher's hand-rolled
//! `OllamaStreamer` (`agent/src/streaming/mod.rs`) — `ollama-rs` itself
//! exposes no streaming call, only the single-shot one already used by
//! `chat`, so the streaming path has to be built the same way the teacher
//! built it rather than adapted from an existing crate call.

use async_trait::async_trait;
use futures_util::StreamExt;
use ollama_rs::{
    generation::{
        chat::{request::ChatMessageRequest, ChatMessage},
        options::GenerationOptions,
        tools::{ToolCall, ToolInfo},
    },
    Ollama,
};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::{ChatParams, Llm};

pub struct OllamaClient {
    client: Ollama,
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(url: &str, model: &str) -> Self {
        let parsed = url::Url::parse(url)
            .unwrap_or_else(|_| url::Url::parse("http://localhost:11434").unwrap());
        let host = parsed.host_str().unwrap_or("localhost").to_string();
        let port = parsed.port().unwrap_or(11434);
        let base_url = format!("http://{host}:{port}");

        Self {
            client: Ollama::new(format!("http://{host}"), port),
            http: reqwest::Client::new(),
            base_url,
            model: model.to_string(),
        }
    }

    fn options(params: &ChatParams) -> Option<GenerationOptions> {
        if params.temperature.is_none() && params.max_tokens.is_none() {
            return None;
        }
        let mut options = GenerationOptions::default();
        if let Some(t) = params.temperature {
            options = options.temperature(t);
        }
        if let Some(m) = params.max_tokens {
            options = options.num_predict(m as i32);
        }
        Some(options)
    }
}

/// Shape of one line of Ollama's NDJSON `/api/chat` stream, grounded on the
/// teacher's `OllamaStreamChunk`/`StreamMessage`. Tool calls are decoded
/// straight into `ollama-rs`'s own `ToolCall` rather than a hand-rolled
/// struct, since the rest of this crate already depends on it for the same
/// wire shape.
#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    #[serde(default)]
    message: Option<OllamaStreamMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaStreamMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[async_trait]
impl Llm for OllamaClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolInfo],
        params: &ChatParams,
    ) -> anyhow::Result<ChatMessage> {
        let mut request = ChatMessageRequest::new(self.model.clone(), messages.to_vec());
        if !tools.is_empty() {
            request = request.tools(tools.to_vec());
        }
        if let Some(options) = Self::options(params) {
            request = request.options(options);
        }

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| anyhow::anyhow!("ollama chat failed: {e}"))?;

        Ok(response.message)
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolInfo],
        params: &ChatParams,
        tokens: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<ChatMessage> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools)?;
        }
        if let Some(options) = Self::options(params) {
            body["options"] = serde_json::to_value(options)?;
        }

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("ollama stream request failed: {e}"))?;

        if !response.status().is_success() {
            anyhow::bail!("ollama stream request returned HTTP {}", response.status());
        }

        let mut content = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut bytes_stream = response.bytes_stream();
        let mut line_buffer = String::new();

        while let Some(chunk) = bytes_stream.next().await {
            let chunk = chunk.map_err(|e| anyhow::anyhow!("ollama stream read failed: {e}"))?;
            line_buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline_pos) = line_buffer.find('\n') {
                let line = line_buffer[..newline_pos].to_string();
                line_buffer.drain(..=newline_pos);
                if line.trim().is_empty() {
                    continue;
                }

                let parsed: OllamaStreamChunk = serde_json::from_str(&line)
                    .map_err(|e| anyhow::anyhow!("malformed ollama stream chunk: {e}"))?;

                if let Some(msg) = &parsed.message {
                    if let Some(text) = &msg.content {
                        if !text.is_empty() {
                            content.push_str(text);
                            let _ = tokens.send(text.clone());
                        }
                    }
                    if let Some(calls) = &msg.tool_calls {
                        tool_calls = calls.clone();
                    }
                }

                if parsed.done {
                    line_buffer.clear();
                    break;
                }
            }
        }

        let mut response = ChatMessage::assistant(content);
        response.tool_calls = tool_calls;
        Ok(response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_text_chunk() {
        let line = r#"{"message":{"role":"assistant","content":"hel"},"done":false}"#;
        let parsed: OllamaStreamChunk = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.message.unwrap().content.as_deref(), Some("hel"));
        assert!(!parsed.done);
    }

    #[test]
    fn parses_a_done_chunk_without_message_text() {
        let line = r#"{"done":true,"done_reason":"stop"}"#;
        let parsed: OllamaStreamChunk = serde_json::from_str(line).unwrap();
        assert!(parsed.message.is_none());
        assert!(parsed.done);
    }
}
