//! MCPHost (§4.6): top-level coordinator. Connects every configured
//! client, discovers its components, and exposes the four dispatch verbs
//! agents call through. A client failing to connect is logged and
//! skipped — the host still becomes ready with whatever connected.

use crate::client::{ClientHandle, ClientManager};
use crate::config::{AgentConfig, ClientConfig};
use crate::error::{ComponentKind, HostError, NotFoundReason};
use crate::managers::{
    FilteringManager, PromptInfo, PromptManager, ResourceInfo, ResourceManager, RootManager,
    SecurityManager, ToolInfo, ToolManager,
};
use crate::router::{ClientCapabilities, MessageRouter};
use rmcp::model::{CallToolResult, GetPromptResult, ReadResourceResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;

pub struct MCPHost {
    router: Arc<MessageRouter>,
    tools: Arc<ToolManager>,
    prompts: Arc<PromptManager>,
    resources: Arc<ResourceManager>,
    roots: Arc<RootManager>,
    security: Arc<SecurityManager>,
    tasks: AsyncMutex<JoinSet<()>>,
    handles: AsyncMutex<HashMap<String, ClientHandle>>,
}

impl MCPHost {
    pub fn new(security: Arc<SecurityManager>) -> Self {
        Self {
            router: Arc::new(MessageRouter::new()),
            tools: Arc::new(ToolManager::new()),
            prompts: Arc::new(PromptManager::new()),
            resources: Arc::new(ResourceManager::new()),
            roots: Arc::new(RootManager::new()),
            security,
            tasks: AsyncMutex::new(JoinSet::new()),
            handles: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Connects every client in `clients`, in order. Resilient: a failed
    /// client is logged and does not stop the rest from initializing.
    pub async fn init(&self, clients: &[ClientConfig]) {
        for config in clients {
            if let Err(err) = self.register_client(config).await {
                tracing::warn!(
                    client_id = %config.client_id,
                    error = %err,
                    "client failed to initialize, continuing without it"
                );
            }
        }
    }

    /// Connects one client and registers its discovered capabilities.
    /// Used both by `init` and by dynamic registration (§4.13).
    pub async fn register_client(&self, config: &ClientConfig) -> anyhow::Result<()> {
        let handle = {
            let mut tasks = self.tasks.lock().await;
            ClientManager::connect(config, &self.security, &mut tasks).await?
        };

        let tools = handle.list_tools().await.unwrap_or_default();
        let prompts = handle.list_prompts().await.unwrap_or_default();
        let resources = handle.list_resources().await.unwrap_or_default();

        let capabilities = ClientCapabilities {
            tools: !tools.is_empty(),
            prompts: !prompts.is_empty(),
            resources: !resources.is_empty(),
        };
        self.router.register_server(&config.client_id, capabilities);

        for name in self.tools.register_client_tools(&config.client_id, handle.clone(), tools, &config.exclude) {
            self.router.register_component(&name, &config.client_id);
        }
        for name in self.prompts.register_client_prompts(&config.client_id, handle.clone(), prompts, &config.exclude) {
            self.router.register_component(&name, &config.client_id);
        }
        for uri in self.resources.register_client_resources(&config.client_id, handle.clone(), resources, &config.exclude) {
            self.router.register_component(&uri, &config.client_id);
        }

        self.roots.register_client_roots(&config.client_id, config.roots.clone());

        self.handles.lock().await.insert(config.client_id.clone(), handle);
        tracing::info!(client_id = %config.client_id, "client initialized");
        Ok(())
    }

    pub async fn shutdown(&self) {
        let handles = self.handles.lock().await;
        for (client_id, handle) in handles.iter() {
            self.router.unregister_server(client_id);
            self.tools.unregister_client(client_id);
            self.prompts.unregister_client(client_id);
            self.resources.unregister_client(client_id);
            self.roots.unregister_client(client_id);
            handle.shutdown();
        }
        drop(handles);
        self.handles.lock().await.clear();

        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }

    /// Every tool currently reachable across connected clients, unfiltered
    /// by any agent's permissions. Used by the CLI's `tools` listing.
    pub fn all_tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.all_tools().into_iter().map(|t| t.name).collect();
        names.sort();
        names
    }

    /// Roots declared by `client_id`, as registered during `register_client`.
    pub fn roots_for_client(&self, client_id: &str) -> Vec<crate::config::RootConfig> {
        self.roots.roots_for_client(client_id)
    }

    pub fn list_tools(&self, agent: &AgentConfig) -> Vec<ToolInfo> {
        self.tools
            .all_tools()
            .into_iter()
            .filter(|t| self.component_permitted(agent, ComponentKind::Tool, &t.client_id, &t.name))
            .collect()
    }

    pub fn list_prompts(&self, agent: &AgentConfig) -> Vec<PromptInfo> {
        self.prompts
            .all_prompts()
            .into_iter()
            .filter(|p| self.component_permitted(agent, ComponentKind::Prompt, &p.client_id, &p.name))
            .collect()
    }

    pub fn list_resources(&self, agent: &AgentConfig) -> Vec<ResourceInfo> {
        self.resources
            .all_resources()
            .into_iter()
            .filter(|r| self.component_permitted(agent, ComponentKind::Resource, &r.client_id, &r.uri))
            .collect()
    }

    pub async fn execute_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
        agent: &AgentConfig,
        preferred_client: Option<&str>,
    ) -> Result<CallToolResult, HostError> {
        let client_id = self.resolve_target_client(ComponentKind::Tool, name, agent, preferred_client)?;
        self.tools.execute_tool(name, arguments, &client_id).await
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Value>,
        agent: &AgentConfig,
        preferred_client: Option<&str>,
    ) -> Result<GetPromptResult, HostError> {
        let client_id = self.resolve_target_client(ComponentKind::Prompt, name, agent, preferred_client)?;
        self.prompts.get_prompt(name, arguments, &client_id).await
    }

    pub async fn read_resource(
        &self,
        uri: &str,
        agent: &AgentConfig,
        preferred_client: Option<&str>,
    ) -> Result<ReadResourceResult, HostError> {
        let client_id = self.resolve_target_client(ComponentKind::Resource, uri, agent, preferred_client)?;
        self.resources.read_resource(uri, &client_id).await
    }

    /// Shared resolution algorithm behind every dispatch verb (§4.6).
    fn resolve_target_client(
        &self,
        kind: ComponentKind,
        name: &str,
        agent: &AgentConfig,
        preferred_client: Option<&str>,
    ) -> Result<String, HostError> {
        let mut candidates: Vec<String> = self
            .router
            .get_clients_for_component(name)
            .into_iter()
            .filter(|c| FilteringManager::is_client_permitted(agent, c))
            .filter(|_| FilteringManager::is_component_permitted(agent, kind, name))
            .collect();
        candidates.sort();

        if let Some(preferred) = preferred_client {
            return if candidates.iter().any(|c| c == preferred) {
                Ok(preferred.to_string())
            } else {
                Err(HostError::ComponentNotFound {
                    kind,
                    name: name.to_string(),
                    reason: NotFoundReason::DisallowedClient,
                })
            };
        }

        match candidates.len() {
            0 => {
                let reason = if self.router.get_clients_for_component(name).is_empty() {
                    NotFoundReason::Unknown
                } else {
                    NotFoundReason::Filtered
                };
                Err(HostError::ComponentNotFound { kind, name: name.to_string(), reason })
            }
            1 => Ok(candidates.remove(0)),
            _ => Err(HostError::AmbiguousComponent { kind, name: name.to_string(), candidates }),
        }
    }

    fn component_permitted(&self, agent: &AgentConfig, kind: ComponentKind, client_id: &str, name: &str) -> bool {
        FilteringManager::is_client_permitted(agent, client_id)
            && FilteringManager::is_component_permitted(agent, kind, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(client_ids: Option<Vec<String>>) -> AgentConfig {
        AgentConfig {
            name: "a".into(),
            llm_config_id: None,
            model: None,
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            client_ids,
            exclude_components: vec![],
            include_components: None,
            max_iterations: 10,
            include_history: false,
        }
    }

    #[test]
    fn resolve_reports_unknown_vs_filtered() {
        let host = MCPHost::new(Arc::new(SecurityManager::with_env_backend()));
        // no client ever registered "ghost_tool" -> Unknown
        let err = host
            .resolve_target_client(ComponentKind::Tool, "ghost_tool", &agent(None), None)
            .unwrap_err();
        assert!(matches!(
            err,
            HostError::ComponentNotFound { reason: NotFoundReason::Unknown, .. }
        ));
    }

    #[test]
    fn resolve_ambiguous_when_two_candidates_and_no_preference() {
        let host = MCPHost::new(Arc::new(SecurityManager::with_env_backend()));
        host.router.register_server("a", ClientCapabilities { tools: true, ..Default::default() });
        host.router.register_server("b", ClientCapabilities { tools: true, ..Default::default() });
        host.router.register_component("search", "a");
        host.router.register_component("search", "b");

        let err = host
            .resolve_target_client(ComponentKind::Tool, "search", &agent(None), None)
            .unwrap_err();
        assert!(matches!(err, HostError::AmbiguousComponent { .. }));
    }

    #[test]
    fn resolve_honors_client_ids_restriction() {
        let host = MCPHost::new(Arc::new(SecurityManager::with_env_backend()));
        host.router.register_server("a", ClientCapabilities { tools: true, ..Default::default() });
        host.router.register_server("b", ClientCapabilities { tools: true, ..Default::default() });
        host.router.register_component("search", "a");
        host.router.register_component("search", "b");

        let restricted = agent(Some(vec!["a".to_string()]));
        let client_id = host
            .resolve_target_client(ComponentKind::Tool, "search", &restricted, None)
            .unwrap();
        assert_eq!(client_id, "a");
    }
}
