//! HostManager (§4.13): the process-level kernel. Owns the pieces that
//! outlive any one project — `ComponentManager`, `ProjectManager`, the
//! optional `StorageManager` — and lazily builds the project-scoped
//! `MCPHost` + `ExecutionFacade` pair on first execution call.

use crate::component_manager::ComponentManager;
use crate::config::{AgentConfig, ClientConfig, CustomWorkflowConfig, HostSettings, LLMConfig, WorkflowConfig};
use crate::execution::ExecutionFacade;
use crate::host::MCPHost;
use crate::managers::SecurityManager;
use crate::project_manager::ProjectManager;
use crate::storage::Database;
use mcp_host_common::CustomWorkflowRegistry;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

struct Runtime {
    host: Arc<MCPHost>,
    facade: Arc<ExecutionFacade>,
}

pub struct HostManager {
    components: Arc<ComponentManager>,
    projects: Arc<ProjectManager>,
    storage: Option<Arc<Database>>,
    settings: HostSettings,
    custom_workflows: Arc<CustomWorkflowRegistry>,
    runtime: AsyncMutex<Option<Runtime>>,
}

impl HostManager {
    pub fn new(components_root: impl AsRef<Path>, settings: HostSettings) -> anyhow::Result<Self> {
        let components = Arc::new(ComponentManager::load(components_root.as_ref()));
        let projects = Arc::new(ProjectManager::new(components.clone()));

        let storage = if settings.storage.enabled {
            let path = settings
                .storage
                .sqlite_path
                .clone()
                .map(Ok)
                .unwrap_or_else(Database::default_path)?;
            Some(Arc::new(Database::open_at(path)?))
        } else {
            None
        };

        Ok(Self {
            components,
            projects,
            storage,
            settings,
            custom_workflows: Arc::new(CustomWorkflowRegistry::new()),
            runtime: AsyncMutex::new(None),
        })
    }

    pub fn custom_workflows(&self) -> &CustomWorkflowRegistry {
        // Only useful for registering workflows before the runtime starts;
        // the registry itself is immutable once shared into the facade.
        &self.custom_workflows
    }

    pub async fn change_project(&self, path: &Path) -> anyhow::Result<()> {
        self.projects.unload_active_project();
        self.projects.load_project(path)?;

        let mut runtime = self.runtime.lock().await;
        if let Some(old) = runtime.take() {
            old.facade.aclose();
            old.host.shutdown().await;
        }
        drop(runtime);
        self.ensure_runtime().await?;
        Ok(())
    }

    async fn ensure_runtime(&self) -> anyhow::Result<(Arc<MCPHost>, Arc<ExecutionFacade>)> {
        let mut runtime = self.runtime.lock().await;
        if let Some(existing) = runtime.as_ref() {
            return Ok((existing.host.clone(), existing.facade.clone()));
        }

        if self.projects.active_project().is_none() {
            if let Some(path) = &self.settings.project_path {
                self.projects.load_project(path)?;
            } else {
                anyhow::bail!("no project loaded and no default project_path configured");
            }
        }

        let security = Arc::new(SecurityManager::with_env_backend());
        let host = Arc::new(MCPHost::new(security));
        host.init(&self.projects.get_host_config_for_active_project()).await;

        let facade = Arc::new(ExecutionFacade::new(
            host.clone(),
            self.projects.clone(),
            self.storage.clone(),
            self.custom_workflows.clone(),
            &self.settings,
        ));

        *runtime = Some(Runtime { host: host.clone(), facade: facade.clone() });
        Ok((host, facade))
    }

    pub async fn facade(&self) -> anyhow::Result<Arc<ExecutionFacade>> {
        let (_, facade) = self.ensure_runtime().await?;
        Ok(facade)
    }

    /// Registering a client connects-and-discovers just that one, on
    /// whatever `MCPHost` is already running; if nothing is running yet
    /// this only updates the project, and the first execution call
    /// connects it along with everything else.
    pub async fn register_client(&self, config: ClientConfig) -> anyhow::Result<()> {
        self.projects.add_client_to_active_project(config.clone())?;

        let runtime = self.runtime.lock().await;
        if let Some(runtime) = runtime.as_ref() {
            runtime.host.register_client(&config).await?;
        }
        Ok(())
    }

    /// Registering an agent re-registers its referenced LLM first, if one
    /// is named and known to the component store (idempotent).
    pub async fn register_agent(&self, config: AgentConfig) -> anyhow::Result<()> {
        if let Some(llm_id) = &config.llm_config_id {
            if let Some(llm) = self.components.get_llm(llm_id) {
                self.register_llm(llm)?;
            }
        }
        self.projects.add_agent_to_active_project(config)?;
        Ok(())
    }

    pub fn register_llm(&self, config: LLMConfig) -> anyhow::Result<()> {
        self.projects.add_llm_to_active_project(config)
    }

    /// Registering a simple workflow re-registers each step's agent first
    /// (which in turn re-registers its LLM), so the whole chain is runnable
    /// as soon as the workflow is.
    pub async fn register_simple_workflow(&self, config: WorkflowConfig) -> anyhow::Result<()> {
        for step_agent in &config.steps {
            if let Some(agent) = self.components.get_agent(step_agent) {
                self.register_agent(agent).await?;
            }
        }
        self.projects.add_simple_workflow_to_active_project(config)
    }

    pub fn register_custom_workflow(&self, config: CustomWorkflowConfig) -> anyhow::Result<()> {
        self.projects
            .active_project()
            .ok_or_else(|| anyhow::anyhow!("no active project"))?;
        // The custom workflow's implementation must already be compiled in
        // and registered under `config.class_name`; this only makes the
        // project aware of the declared metadata.
        self.projects
            .add_custom_workflow_to_active_project(config)
    }

    pub async fn shutdown(&self) {
        let mut runtime = self.runtime.lock().await;
        if let Some(runtime) = runtime.take() {
            runtime.facade.aclose();
            runtime.host.shutdown().await;
        }
    }
}
