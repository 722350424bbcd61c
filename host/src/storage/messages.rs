//! The persisted message shape and its conversion to/from the LLM
//! client's own `ChatMessage`, so the agent loop can round-trip a turn
//! through storage without the rest of the crate caring about the wire
//! format.

use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::tools::ToolCall;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MessageRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            "tool" => Ok(MessageRole::Tool),
            other => anyhow::bail!("unknown message role `{other}`"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// One persisted turn of a conversation. Round-trips through
/// `ollama_rs::generation::chat::ChatMessage` for the agent loop, and
/// through SQLite for storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into(), tool_calls: vec![] }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into(), tool_calls: vec![] }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: vec![ToolCallRecord { id: tool_call_id.into(), name: tool_name.into(), arguments: serde_json::Value::Null }],
        }
    }

    pub fn into_chat_message(self) -> ChatMessage {
        match self.role {
            MessageRole::User => ChatMessage::user(self.content),
            MessageRole::Assistant => ChatMessage::assistant(self.content),
            MessageRole::System => ChatMessage::system(self.content),
            MessageRole::Tool => {
                let mut msg = ChatMessage::tool(self.content);
                msg.tool_calls = self
                    .tool_calls
                    .into_iter()
                    .map(|t| ToolCall {
                        function: ollama_rs::generation::tools::ToolCallFunction {
                            name: t.name,
                            arguments: t.arguments,
                        },
                    })
                    .collect();
                msg
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System, MessageRole::Tool] {
            let parsed: MessageRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn user_message_converts_to_chat_message() {
        let stored = StoredMessage::user("hi");
        let chat = stored.into_chat_message();
        assert_eq!(chat.content, "hi");
    }
}
