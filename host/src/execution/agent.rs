//! Agent turn loop (§4.10). Runs one conversation to completion: load
//! history, append the user message, then alternate LLM calls and tool
//! execution until the model stops asking for tools or `max_iterations` is
//! hit. Tool resolution failures are handed back to the LLM as structured
//! tool-result content rather than raised, so the model can react.
//!
//! `run` uses the LLM's single-shot `chat`; `run_streaming` is the same
//! algorithm driven through `Llm::stream_chat` instead, emitting the §6.1
//! event taxonomy as the model's response arrives rather than decomposing it
//! after the fact. Both share the same setup/teardown via `prepare`/`finish`.

use crate::config::AgentConfig;
use crate::execution::events::{AgentEvent, EventSender, FrontendIndexAllocator};
use crate::host::MCPHost;
use crate::llm::{ChatParams, Llm};
use crate::storage::{Database, StoredMessage};
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::tools::{ToolFunctionInfo, ToolInfo as OllamaToolInfo, ToolType};
use schemars::Schema;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How often a `ping` keepalive is sent while waiting on a single LLM call.
/// Grounded on the teacher's periodic health-check tick
/// (`agent/src/mcps/daemon.rs`'s `interval.tick()` loop).
const PING_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    TurnLimitReached,
}

#[derive(Debug, Clone)]
pub struct AgentResult {
    pub final_response: String,
    pub history: Vec<StoredMessage>,
    pub stop_reason: StopReason,
}

fn to_ollama_tools(tools: &[crate::managers::ToolInfo]) -> Vec<OllamaToolInfo> {
    let empty_object_schema = || {
        serde_json::from_value::<Schema>(serde_json::json!({"type": "object", "properties": {}})).unwrap()
    };

    tools
        .iter()
        .map(|tool| {
            let parameters = tool
                .input_schema
                .clone()
                .and_then(|schema| serde_json::from_value::<Schema>(schema).ok())
                .unwrap_or_else(empty_object_schema);

            OllamaToolInfo {
                tool_type: ToolType::Function,
                function: ToolFunctionInfo {
                    name: tool.name.clone(),
                    description: tool.description.clone().unwrap_or_default(),
                    parameters,
                },
            }
        })
        .collect()
}

/// Shared turn state threaded through the loop body, common to both the
/// blocking and streaming variants.
struct TurnState {
    history: Vec<StoredMessage>,
    messages: Vec<ChatMessage>,
    turn_start: usize,
    ollama_tools: Vec<OllamaToolInfo>,
}

pub struct AgentTurnProcessor {
    host: Arc<MCPHost>,
    llm: Arc<dyn Llm>,
    storage: Option<Arc<Database>>,
}

impl AgentTurnProcessor {
    pub fn new(host: Arc<MCPHost>, llm: Arc<dyn Llm>, storage: Option<Arc<Database>>) -> Self {
        Self { host, llm, storage }
    }

    fn prepare(&self, agent: &AgentConfig, user_message: &str, system_prompt: Option<&str>, session_id: Option<&str>) -> anyhow::Result<TurnState> {
        let mut history: Vec<StoredMessage> = if agent.include_history {
            match (&self.storage, session_id) {
                (Some(storage), Some(session_id)) => storage.load_history(&agent.name, session_id)?,
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let mut messages: Vec<ChatMessage> = Vec::new();
        if let Some(system_prompt) = system_prompt {
            messages.push(ChatMessage::system(system_prompt.to_string()));
        }
        for stored in &history {
            messages.push(stored.clone().into_chat_message());
        }

        let turn_start = history.len();
        history.push(StoredMessage::user(user_message));
        messages.push(ChatMessage::user(user_message.to_string()));

        let tools = self.host.list_tools(agent);
        let ollama_tools = to_ollama_tools(&tools);

        Ok(TurnState { history, messages, turn_start, ollama_tools })
    }

    fn finish(&self, agent: &AgentConfig, session_id: Option<&str>, state: TurnState, final_response: String, stop_reason: StopReason) -> anyhow::Result<AgentResult> {
        let mut final_response = final_response;
        if matches!(stop_reason, StopReason::TurnLimitReached) && final_response.is_empty() {
            final_response = "agent reached maximum iterations without completing.".to_string();
        }

        if agent.include_history {
            if let (Some(storage), Some(session_id)) = (&self.storage, session_id) {
                storage.append_messages(&agent.name, session_id, &state.history[state.turn_start..])?;
            }
        }

        Ok(AgentResult { final_response, history: state.history, stop_reason })
    }

    async fn run_one_tool_call(&self, agent: &AgentConfig, name: &str, arguments: serde_json::Value) -> (String, bool) {
        match self.host.execute_tool(name, Some(arguments), agent, None).await {
            Ok(result) => (crate::client::flatten_content(&result), false),
            Err(err) => (format!("error calling tool `{name}`: {err}"), true),
        }
    }

    pub async fn run(
        &self,
        agent: &AgentConfig,
        user_message: &str,
        system_prompt: Option<&str>,
        params: &ChatParams,
        session_id: Option<&str>,
    ) -> anyhow::Result<AgentResult> {
        let mut state = self.prepare(agent, user_message, system_prompt, session_id)?;

        let mut final_response = String::new();
        let mut stop_reason = StopReason::TurnLimitReached;

        for _ in 0..agent.max_iterations {
            let response = self.llm.chat(&state.messages, &state.ollama_tools, params).await?;

            if response.tool_calls.is_empty() {
                final_response = response.content.clone();
                state.history.push(StoredMessage::assistant(response.content.clone()));
                state.messages.push(response);
                stop_reason = StopReason::Completed;
                break;
            }

            state.history.push(StoredMessage::assistant(response.content.clone()));
            let tool_calls = response.tool_calls.clone();
            state.messages.push(response);

            for tool_call in &tool_calls {
                let name = tool_call.function.name.clone();
                let arguments = tool_call.function.arguments.clone();
                let (content, _) = self.run_one_tool_call(agent, &name, arguments).await;

                let tool_msg = StoredMessage::tool(content, name.clone(), name.clone());
                state.messages.push(tool_msg.clone().into_chat_message());
                state.history.push(tool_msg);
            }
        }

        self.finish(agent, session_id, state, final_response, stop_reason)
    }

    /// Streaming variant of `run` (§4.10 "Streaming variant"), driven
    /// through `Llm::stream_chat`. Text tokens are forwarded to `tx` as they
    /// arrive; a `ping` keepalive fills the gaps between tokens so a slow
    /// model doesn't leave the consumer without any events. Ollama's
    /// streaming wire protocol (grounded on the teacher's
    /// `agent/src/streaming/mod.rs`) only ever delivers `tool_calls` whole,
    /// on the final chunk of a call — there is no incremental tool-argument
    /// delta in the underlying protocol, so `tool_use_input_delta` is
    /// emitted once, carrying the complete argument JSON, immediately
    /// before `tool_use_input_complete`.
    pub async fn run_streaming(
        &self,
        agent: &AgentConfig,
        user_message: &str,
        system_prompt: Option<&str>,
        params: &ChatParams,
        session_id: Option<&str>,
        tx: &EventSender,
        alloc: &mut FrontendIndexAllocator,
    ) -> anyhow::Result<AgentResult> {
        let mut state = self.prepare(agent, user_message, system_prompt, session_id)?;

        let mut final_response = String::new();
        let mut stop_reason = StopReason::TurnLimitReached;

        for iteration in 0..agent.max_iterations {
            let llm_idx = iteration * 2;
            let text_idx = alloc.start_block(llm_idx);
            let _ = tx.send(AgentEvent::TextBlockStart { index: text_idx });

            let (token_tx, mut token_rx) = mpsc::unbounded_channel::<String>();
            let forward_tx = tx.clone();
            let forward = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(PING_INTERVAL);
                ticker.tick().await; // first tick fires immediately
                loop {
                    tokio::select! {
                        token = token_rx.recv() => match token {
                            Some(text) => { let _ = forward_tx.send(AgentEvent::TextDelta { index: text_idx, text }); }
                            None => break,
                        },
                        _ = ticker.tick() => {
                            let _ = forward_tx.send(AgentEvent::Ping { index: text_idx });
                        }
                    }
                }
            });

            let response = self.llm.stream_chat(&state.messages, &state.ollama_tools, params, token_tx).await?;
            let _ = forward.await;
            let _ = tx.send(AgentEvent::ContentBlockStop { index: text_idx });

            if response.tool_calls.is_empty() {
                final_response = response.content.clone();
                state.history.push(StoredMessage::assistant(response.content.clone()));
                state.messages.push(response);
                stop_reason = StopReason::Completed;
                let _ = tx.send(AgentEvent::LlmCallCompleted { index: text_idx, stop_reason: "completed".to_string(), usage: None });
                break;
            }

            let _ = tx.send(AgentEvent::LlmCallCompleted { index: text_idx, stop_reason: "tool_use".to_string(), usage: None });

            state.history.push(StoredMessage::assistant(response.content.clone()));
            let tool_calls = response.tool_calls.clone();
            state.messages.push(response);

            for (call_offset, tool_call) in tool_calls.iter().enumerate() {
                let name = tool_call.function.name.clone();
                let arguments = tool_call.function.arguments.clone();
                let tool_id = format!("{name}#{iteration}.{call_offset}");
                let tool_idx = alloc.start_tool_use(llm_idx + 1, &tool_id);

                let _ = tx.send(AgentEvent::ToolUseStart { index: tool_idx, tool_id: tool_id.clone(), tool_name: name.clone() });
                let json_fragment = serde_json::to_string(&arguments).unwrap_or_default();
                let _ = tx.send(AgentEvent::ToolUseInputDelta { index: tool_idx, json_fragment });
                let _ = tx.send(AgentEvent::ToolUseInputComplete { index: tool_idx, args: arguments.clone() });

                let (content, is_error) = self.run_one_tool_call(agent, &name, arguments).await;
                let _ = tx.send(AgentEvent::ToolResult { index: tool_idx, tool_use_id: tool_id, content: content.clone(), is_error });

                let tool_msg = StoredMessage::tool(content, name.clone(), name.clone());
                state.messages.push(tool_msg.clone().into_chat_message());
                state.history.push(tool_msg);
            }
        }

        self.finish(agent, session_id, state, final_response, stop_reason)
    }
}
