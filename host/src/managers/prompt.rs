//! Per-client prompt catalog plus `get_prompt` dispatch (§4.2).

use crate::client::ClientHandle;
use crate::error::{ComponentKind, HostError, NotFoundReason};
use rmcp::model::GetPromptResult;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub client_id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct PromptManager {
    clients: Mutex<HashMap<String, ClientHandle>>,
    prompts: Mutex<HashMap<String, Vec<PromptInfo>>>,
}

impl PromptManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client_prompts(
        &self,
        client_id: &str,
        handle: ClientHandle,
        declared: Vec<rmcp::model::Prompt>,
        exclude: &[String],
    ) -> Vec<String> {
        let infos: Vec<PromptInfo> = declared
            .into_iter()
            .filter(|p| !exclude.iter().any(|e| e == &p.name))
            .map(|p| PromptInfo {
                client_id: client_id.to_string(),
                name: p.name,
                description: p.description,
            })
            .collect();

        let names = infos.iter().map(|p| p.name.clone()).collect();

        self.clients.lock().unwrap().insert(client_id.to_string(), handle);
        self.prompts.lock().unwrap().insert(client_id.to_string(), infos);
        names
    }

    pub fn list_prompts_for_client(&self, client_id: &str) -> Vec<PromptInfo> {
        self.prompts.lock().unwrap().get(client_id).cloned().unwrap_or_default()
    }

    pub fn all_prompts(&self) -> Vec<PromptInfo> {
        self.prompts.lock().unwrap().values().flatten().cloned().collect()
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Value>,
        client_id: &str,
    ) -> Result<GetPromptResult, HostError> {
        let handle = {
            let clients = self.clients.lock().unwrap();
            clients
                .get(client_id)
                .cloned()
                .ok_or_else(|| HostError::ClientUnavailable { client_id: client_id.to_string() })?
        };

        let is_registered = {
            let prompts = self.prompts.lock().unwrap();
            prompts
                .get(client_id)
                .map(|ps| ps.iter().any(|p| p.name == name))
                .unwrap_or(false)
        };
        if !is_registered {
            return Err(HostError::ComponentNotFound {
                kind: ComponentKind::Prompt,
                name: name.to_string(),
                reason: NotFoundReason::Unknown,
            });
        }

        handle
            .get_prompt(name, arguments)
            .await
            .map_err(|e| HostError::Other(e))
    }

    pub fn unregister_client(&self, client_id: &str) {
        self.clients.lock().unwrap().remove(client_id);
        self.prompts.lock().unwrap().remove(client_id);
    }
}
