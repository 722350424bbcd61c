//! ExecutionFacade (§4.9): the one-stop execution surface. Takes explicit
//! dependencies — a host, a resolved project snapshot, optional storage —
//! rather than reaching through a god object. Rebuilt by the kernel
//! whenever the active project changes (§4.13).

use crate::config::{AgentConfig, HostSettings, LLMConfig, ProjectConfig};
use crate::error::HostError;
use crate::execution::agent::{AgentResult, AgentTurnProcessor, StopReason};
use crate::execution::events::{event_channel, AgentEvent, EventReceiver, FrontendIndexAllocator};
use crate::execution::simple_workflow::{self, SimpleWorkflowResult};
use crate::host::MCPHost;
use crate::llm::{ChatParams, Llm, OllamaClient};
use crate::project_manager::ProjectManager;
use crate::storage::Database;
use async_trait::async_trait;
use mcp_host_common::{CustomWorkflowRegistry, ExecutionHandle};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Takes a live reference to the project manager rather than an owned
/// project snapshot so that dynamic registration (§4.13) is visible to
/// execution without rebuilding this facade on every `register_*` call —
/// only a full `change_project` needs a new one.
pub struct ExecutionFacade {
    host: Arc<MCPHost>,
    projects: Arc<ProjectManager>,
    storage: Option<Arc<Database>>,
    custom_workflows: Arc<CustomWorkflowRegistry>,
    default_llm: crate::config::LlmSettings,
    llm_cache: Mutex<HashMap<String, Arc<dyn Llm>>>,
}

struct ResolvedLlm {
    client: Arc<dyn Llm>,
    params: ChatParams,
    system_prompt: Option<String>,
}

impl ExecutionFacade {
    pub fn new(
        host: Arc<MCPHost>,
        projects: Arc<ProjectManager>,
        storage: Option<Arc<Database>>,
        custom_workflows: Arc<CustomWorkflowRegistry>,
        settings: &HostSettings,
    ) -> Self {
        Self {
            host,
            projects,
            storage,
            custom_workflows,
            default_llm: settings.llm.clone(),
            llm_cache: Mutex::new(HashMap::new()),
        }
    }

    fn active_project(&self) -> Result<ProjectConfig, HostError> {
        self.projects
            .active_project()
            .ok_or_else(|| HostError::Other(anyhow::anyhow!("no active project loaded")))
    }

    fn agent_config(&self, project: &ProjectConfig, agent_name: &str) -> Result<AgentConfig, HostError> {
        project
            .agents
            .get(agent_name)
            .cloned()
            .ok_or_else(|| HostError::Other(anyhow::anyhow!("no agent named `{agent_name}` in the active project")))
    }

    /// Resolution order per parameter: agent inline override, referenced
    /// `LLMConfig`, client default (`HostSettings.llm`).
    fn resolve_llm(&self, project: &ProjectConfig, agent: &AgentConfig) -> anyhow::Result<ResolvedLlm> {
        let llm_config: Option<&LLMConfig> = agent.llm_config_id.as_deref().and_then(|id| project.llms.get(id));

        if agent.llm_config_id.is_some() && llm_config.is_none() {
            tracing::warn!(
                agent = %agent.name,
                llm_config_id = ?agent.llm_config_id,
                "agent references an unknown llm_config_id, falling back to host defaults"
            );
        }

        let model = agent
            .model
            .clone()
            .or_else(|| llm_config.map(|c| c.model_name.clone()))
            .unwrap_or_else(|| self.default_llm.model.clone());

        let params = ChatParams {
            temperature: agent.temperature.or_else(|| llm_config.and_then(|c| c.temperature)),
            max_tokens: agent.max_tokens.or_else(|| llm_config.and_then(|c| c.max_tokens)),
        };

        let system_prompt = agent
            .system_prompt
            .clone()
            .or_else(|| llm_config.and_then(|c| c.default_system_prompt.clone()));

        let cache_key = match &agent.llm_config_id {
            Some(id) if llm_config.is_some() => format!("{id}#{model}"),
            _ => format!("__adhoc__#{model}"),
        };

        let cached = self.llm_cache.lock().unwrap().get(&cache_key).cloned();
        let client = match cached {
            Some(client) => client,
            None => {
                let client: Arc<dyn Llm> = Arc::new(OllamaClient::new(&self.default_llm.url, &model));
                self.llm_cache.lock().unwrap().insert(cache_key, client.clone());
                client
            }
        };

        Ok(ResolvedLlm { client, params, system_prompt })
    }

    pub async fn run_agent(
        &self,
        agent_name: &str,
        user_message: &str,
        system_prompt_override: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<AgentResult, HostError> {
        let project = self.active_project()?;
        let agent = self.agent_config(&project, agent_name)?;
        let resolved = self.resolve_llm(&project, &agent).map_err(HostError::Other)?;
        let system_prompt = system_prompt_override.map(str::to_string).or(resolved.system_prompt);

        let processor = AgentTurnProcessor::new(self.host.clone(), resolved.client, self.storage.clone());
        processor
            .run(&agent, user_message, system_prompt.as_deref(), &resolved.params, session_id)
            .await
            .map_err(HostError::Other)
    }

    /// Streaming variant (§4.10 "Streaming variant"). The turn loop runs on
    /// a spawned task so the receiver is usable as soon as this returns;
    /// `AgentTurnProcessor::run_streaming` emits the §6.1 event taxonomy as
    /// the model's response actually arrives, through `Llm::stream_chat`.
    pub async fn stream_agent(
        &self,
        agent_name: &str,
        user_message: &str,
        system_prompt_override: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<EventReceiver, HostError> {
        let project = self.active_project()?;
        let agent = self.agent_config(&project, agent_name)?;
        let resolved = self.resolve_llm(&project, &agent).map_err(HostError::Other)?;
        let system_prompt = system_prompt_override.map(str::to_string).or(resolved.system_prompt);

        let (tx, rx) = event_channel();
        let message_id = Uuid::new_v4().to_string();
        let _ = tx.send(AgentEvent::MessageStart { index: 0, message_id });

        let host = self.host.clone();
        let storage = self.storage.clone();
        let llm = resolved.client;
        let params = resolved.params;
        let user_message = user_message.to_string();
        let session_id = session_id.map(str::to_string);

        tokio::spawn(async move {
            let processor = AgentTurnProcessor::new(host, llm, storage);
            let mut alloc = FrontendIndexAllocator::new();
            let result = processor
                .run_streaming(&agent, &user_message, system_prompt.as_deref(), &params, session_id.as_deref(), &tx, &mut alloc)
                .await;

            let idx = alloc.start_block(u32::MAX);
            match result {
                Ok(result) => {
                    let stop_reason = match result.stop_reason {
                        StopReason::Completed => "completed",
                        StopReason::TurnLimitReached => "turn_limit_reached",
                    };
                    let _ = tx.send(AgentEvent::StreamEnd { index: idx, stop_reason: stop_reason.to_string() });
                }
                Err(err) => {
                    let _ = tx.send(AgentEvent::ToolExecutionError {
                        index: idx,
                        tool_use_id: String::new(),
                        error_kind: "facade_error".to_string(),
                        message: err.to_string(),
                    });
                    let _ = tx.send(AgentEvent::StreamEnd { index: idx, stop_reason: "error".to_string() });
                }
            }
        });

        Ok(rx)
    }

    pub async fn run_simple_workflow(&self, workflow_name: &str, initial_message: &str) -> Result<SimpleWorkflowResult, HostError> {
        let project = self.active_project()?;
        let workflow = project
            .simple_workflows
            .get(workflow_name)
            .ok_or_else(|| HostError::Other(anyhow::anyhow!("no simple workflow named `{workflow_name}`")))?
            .clone();

        let result = simple_workflow::run(&workflow.steps, initial_message, |step_agent, message| async move {
            let result = self.run_agent(&step_agent, &message, None, None).await?;
            Ok(result.final_response)
        })
        .await;

        if let SimpleWorkflowResult::Failed { failed_step, error } = &result {
            return Err(HostError::WorkflowStepFailed {
                workflow: workflow_name.to_string(),
                step_index: *failed_step,
                cause: error.clone(),
            });
        }

        Ok(result)
    }

    pub async fn run_custom_workflow(&self, workflow_name: &str, initial_input: Value, session_id: Option<&str>) -> Result<Value, HostError> {
        let project = self.active_project()?;
        let config = project
            .custom_workflows
            .get(workflow_name)
            .ok_or_else(|| HostError::Other(anyhow::anyhow!("no custom workflow named `{workflow_name}`")))?
            .clone();

        crate::execution::custom_workflow::run(&self.custom_workflows, &config, initial_input, self, session_id).await
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.host.all_tool_names()
    }

    /// Closes all cached LLM clients. `Llm` clients here hold no
    /// connection of their own (ollama talks plain HTTP per request), so
    /// this just drops the cache.
    pub fn aclose(&self) {
        self.llm_cache.lock().unwrap().clear();
    }
}

#[async_trait]
impl ExecutionHandle for ExecutionFacade {
    async fn run_agent(&self, agent_name: &str, user_message: &str, session_id: Option<&str>) -> anyhow::Result<Value> {
        let result = ExecutionFacade::run_agent(self, agent_name, user_message, None, session_id).await?;
        Ok(serde_json::json!({
            "final_response": result.final_response,
            "stop_reason": matches!(result.stop_reason, StopReason::Completed),
        }))
    }

    async fn run_simple_workflow(&self, workflow_name: &str, initial_message: &str) -> anyhow::Result<Value> {
        let result = ExecutionFacade::run_simple_workflow(self, workflow_name, initial_message).await?;
        Ok(serde_json::to_value(result)?)
    }
}
