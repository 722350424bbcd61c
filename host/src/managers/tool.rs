//! Per-client tool catalog plus execution (§4.2). Grounded on the
//! teacher's `agent/src/mcp/pool.rs` cache-and-dispatch shape, generalized
//! from "one pool, all servers" to "one registry, many clients."

use crate::client::ClientHandle;
use crate::error::{ComponentKind, HostError};
use rmcp::model::CallToolResult;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub client_id: String,
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

#[derive(Default)]
pub struct ToolManager {
    clients: Mutex<HashMap<String, ClientHandle>>,
    tools: Mutex<HashMap<String, Vec<ToolInfo>>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `handle` and the subset of `declared` not present in
    /// `exclude`. Returns the names actually registered.
    pub fn register_client_tools(
        &self,
        client_id: &str,
        handle: ClientHandle,
        declared: Vec<rmcp::model::Tool>,
        exclude: &[String],
    ) -> Vec<String> {
        let infos: Vec<ToolInfo> = declared
            .into_iter()
            .filter(|t| !exclude.iter().any(|e| e == t.name.as_ref()))
            .map(|t| ToolInfo {
                client_id: client_id.to_string(),
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: Some(serde_json::to_value(&t.input_schema).unwrap_or_default()),
            })
            .collect();

        let names = infos.iter().map(|t| t.name.clone()).collect();

        self.clients.lock().unwrap().insert(client_id.to_string(), handle);
        self.tools.lock().unwrap().insert(client_id.to_string(), infos);
        names
    }

    pub fn list_tools_for_client(&self, client_id: &str) -> Vec<ToolInfo> {
        self.tools.lock().unwrap().get(client_id).cloned().unwrap_or_default()
    }

    pub fn all_tools(&self) -> Vec<ToolInfo> {
        self.tools.lock().unwrap().values().flatten().cloned().collect()
    }

    pub async fn execute_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
        client_id: &str,
    ) -> Result<CallToolResult, HostError> {
        let handle = {
            let clients = self.clients.lock().unwrap();
            clients
                .get(client_id)
                .cloned()
                .ok_or_else(|| HostError::ClientUnavailable { client_id: client_id.to_string() })?
        };

        let is_registered = {
            let tools = self.tools.lock().unwrap();
            tools
                .get(client_id)
                .map(|ts| ts.iter().any(|t| t.name == name))
                .unwrap_or(false)
        };
        if !is_registered {
            return Err(HostError::ComponentNotFound {
                kind: ComponentKind::Tool,
                name: name.to_string(),
                reason: crate::error::NotFoundReason::Unknown,
            });
        }

        handle
            .call_tool(name, arguments)
            .await
            .map_err(|e| HostError::ToolExecutionError {
                tool_name: name.to_string(),
                cause: e.to_string(),
            })
    }

    pub fn unregister_client(&self, client_id: &str) {
        self.clients.lock().unwrap().remove(client_id);
        self.tools.lock().unwrap().remove(client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_list_drops_named_tool() {
        let manager = ToolManager::new();
        let declared = vec![
            make_tool("get_weather"),
            make_tool("save_plan"),
        ];
        // register_client_tools needs a ClientHandle which requires a live
        // actor; exercised end-to-end in host.rs tests instead. Here we only
        // check the pure filtering logic via a throwaway client id with no
        // handle dependency by asserting on `declared` directly.
        let exclude = vec!["save_plan".to_string()];
        let kept: Vec<_> = declared
            .into_iter()
            .filter(|t| !exclude.iter().any(|e| e == t.name.as_ref()))
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name.as_ref(), "get_weather");
        let _ = manager; // manager constructed to ensure Default/new compile
    }

    fn make_tool(name: &str) -> rmcp::model::Tool {
        rmcp::model::Tool {
            name: name.to_string().into(),
            description: None,
            input_schema: std::sync::Arc::new(serde_json::Map::new()),
            annotations: None,
        }
    }
}
