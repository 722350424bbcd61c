//! Agent streaming event taxonomy (§6.1), grounded on the teacher's
//! `agent/src/agent/events.rs` channel-and-enum shape. `data.index` is the
//! frontend SSE index minted by `FrontendIndexAllocator`, independent of
//! whatever block/tool indices the LLM provider itself uses.

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum AgentEvent {
    MessageStart { index: u32, message_id: String },
    TextBlockStart { index: u32 },
    TextDelta { index: u32, text: String },
    ContentBlockStop { index: u32 },
    ToolUseStart { index: u32, tool_id: String, tool_name: String },
    ToolUseInputDelta { index: u32, json_fragment: String },
    ToolUseInputComplete { index: u32, args: serde_json::Value },
    ToolResult { index: u32, tool_use_id: String, content: String, is_error: bool },
    ToolExecutionError { index: u32, tool_use_id: String, error_kind: String, message: String },
    LlmCallCompleted { index: u32, stop_reason: String, usage: Option<serde_json::Value> },
    StreamEnd { index: u32, stop_reason: String },
    Ping { index: u32 },
}

pub type EventSender = mpsc::UnboundedSender<AgentEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AgentEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Mints monotonic frontend indices per conceptual content block within one
/// turn. A block is "reopened" (gets a fresh index) if a start event for its
/// `llm_idx` arrives after that `llm_idx` was previously closed — this is
/// what keeps the frontend index correct even when the provider's own index
/// numbering resets or is reused across block types.
#[derive(Default)]
pub struct FrontendIndexAllocator {
    next: u32,
    open: std::collections::HashMap<u32, u32>,
    closed: std::collections::HashSet<u32>,
    by_tool_id: std::collections::HashMap<String, u32>,
}

impl FrontendIndexAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_block(&mut self, llm_idx: u32) -> u32 {
        if self.closed.remove(&llm_idx) {
            self.open.remove(&llm_idx);
        }
        if let Some(existing) = self.open.get(&llm_idx) {
            return *existing;
        }
        let idx = self.next;
        self.next += 1;
        self.open.insert(llm_idx, idx);
        idx
    }

    pub fn close_block(&mut self, llm_idx: u32) {
        self.closed.insert(llm_idx);
    }

    pub fn start_tool_use(&mut self, llm_idx: u32, tool_id: &str) -> u32 {
        let idx = self.start_block(llm_idx);
        self.by_tool_id.insert(tool_id.to_string(), idx);
        idx
    }

    pub fn index_for_tool(&self, tool_id: &str) -> Option<u32> {
        self.by_tool_id.get(tool_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_blocks_get_increasing_indices() {
        let mut alloc = FrontendIndexAllocator::new();
        assert_eq!(alloc.start_block(0), 0);
        alloc.close_block(0);
        assert_eq!(alloc.start_block(1), 1);
    }

    #[test]
    fn reopening_a_closed_llm_idx_gets_a_fresh_index() {
        let mut alloc = FrontendIndexAllocator::new();
        assert_eq!(alloc.start_block(0), 0);
        alloc.close_block(0);
        assert_eq!(alloc.start_block(0), 1);
    }

    #[test]
    fn tool_use_index_is_reachable_by_tool_id() {
        let mut alloc = FrontendIndexAllocator::new();
        let idx = alloc.start_tool_use(2, "call_1");
        assert_eq!(alloc.index_for_tool("call_1"), Some(idx));
    }
}
