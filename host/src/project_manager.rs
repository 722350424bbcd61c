//! ProjectManager (§4.8): holds exactly one active `ProjectConfig`,
//! assembled from a project file whose component lists may cite either a
//! component-id (resolved through `ComponentManager`) or an inline
//! definition.

use crate::component_manager::ComponentManager;
use crate::config::{AgentConfig, ClientConfig, CustomWorkflowConfig, LLMConfig, ProjectConfig, WorkflowConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ComponentRef<T> {
    Id(String),
    Inline(T),
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    clients: Vec<ComponentRef<ClientConfig>>,
    #[serde(default)]
    llms: Vec<ComponentRef<LLMConfig>>,
    #[serde(default)]
    agents: Vec<ComponentRef<AgentConfig>>,
    #[serde(default)]
    simple_workflows: Vec<ComponentRef<WorkflowConfig>>,
    #[serde(default)]
    custom_workflows: Vec<ComponentRef<CustomWorkflowConfig>>,
}

fn resolve_relative(base_dir: &Path, path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        path.to_string()
    } else {
        base_dir.join(p).to_string_lossy().into_owned()
    }
}

fn resolve_client(base_dir: &Path, mut client: ClientConfig) -> ClientConfig {
    if let Some(server_path) = client.server_path.take() {
        client.server_path = Some(resolve_relative(base_dir, &server_path));
    }
    client
}

fn resolve_custom_workflow(base_dir: &Path, mut workflow: CustomWorkflowConfig) -> CustomWorkflowConfig {
    workflow.module_path = resolve_relative(base_dir, &workflow.module_path);
    workflow
}

fn resolve_refs<T, F>(
    refs: Vec<ComponentRef<T>>,
    lookup: impl Fn(&str) -> Option<T>,
    id_of: impl Fn(&T) -> String,
    inline_fixup: F,
) -> anyhow::Result<HashMap<String, T>>
where
    F: Fn(T) -> T,
{
    let mut out = HashMap::new();
    for r in refs {
        let resolved = match r {
            ComponentRef::Id(id) => lookup(&id)
                .ok_or_else(|| anyhow::anyhow!("unresolved component reference `{id}`"))?,
            ComponentRef::Inline(def) => inline_fixup(def),
        };
        out.insert(id_of(&resolved), resolved);
    }
    Ok(out)
}

pub struct ProjectManager {
    components: Arc<ComponentManager>,
    active: Mutex<Option<ProjectConfig>>,
}

impl ProjectManager {
    pub fn new(components: Arc<ComponentManager>) -> Self {
        Self {
            components,
            active: Mutex::new(None),
        }
    }

    pub fn load_project(&self, path: &Path) -> anyhow::Result<ProjectConfig> {
        let content = std::fs::read_to_string(path)?;
        let file: ProjectFile = serde_json::from_str(&content)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let clients = resolve_refs(
            file.clients,
            |id| self.components.get_client(id),
            |c| c.client_id.clone(),
            |c| resolve_client(base_dir, c),
        )?;
        let llms = resolve_refs(
            file.llms,
            |id| self.components.get_llm(id),
            |l| l.llm_id.clone(),
            |l| l,
        )?;
        let agents = resolve_refs(
            file.agents,
            |id| self.components.get_agent(id),
            |a| a.name.clone(),
            |a| a,
        )?;
        let simple_workflows = resolve_refs(
            file.simple_workflows,
            |id| self.components.get_simple_workflow(id),
            |w| w.name.clone(),
            |w| w,
        )?;
        let custom_workflows = resolve_refs(
            file.custom_workflows,
            |id| self.components.get_custom_workflow(id),
            |w| w.name.clone(),
            |w| resolve_custom_workflow(base_dir, w),
        )?;

        let project = ProjectConfig {
            name: file.name,
            description: file.description,
            clients,
            llms,
            agents,
            simple_workflows,
            custom_workflows,
        };

        *self.active.lock().unwrap() = Some(project.clone());
        Ok(project)
    }

    pub fn unload_active_project(&self) {
        *self.active.lock().unwrap() = None;
    }

    pub fn active_project(&self) -> Option<ProjectConfig> {
        self.active.lock().unwrap().clone()
    }

    pub fn add_client_to_active_project(&self, client: ClientConfig) -> anyhow::Result<()> {
        let mut active = self.active.lock().unwrap();
        let project = active.as_mut().ok_or_else(|| anyhow::anyhow!("no active project"))?;
        project.clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    pub fn add_agent_to_active_project(&self, agent: AgentConfig) -> anyhow::Result<()> {
        let mut active = self.active.lock().unwrap();
        let project = active.as_mut().ok_or_else(|| anyhow::anyhow!("no active project"))?;
        project.agents.insert(agent.name.clone(), agent);
        Ok(())
    }

    pub fn add_llm_to_active_project(&self, llm: LLMConfig) -> anyhow::Result<()> {
        let mut active = self.active.lock().unwrap();
        let project = active.as_mut().ok_or_else(|| anyhow::anyhow!("no active project"))?;
        project.llms.insert(llm.llm_id.clone(), llm);
        Ok(())
    }

    pub fn add_simple_workflow_to_active_project(&self, workflow: WorkflowConfig) -> anyhow::Result<()> {
        let mut active = self.active.lock().unwrap();
        let project = active.as_mut().ok_or_else(|| anyhow::anyhow!("no active project"))?;
        project.simple_workflows.insert(workflow.name.clone(), workflow);
        Ok(())
    }

    pub fn add_custom_workflow_to_active_project(&self, workflow: CustomWorkflowConfig) -> anyhow::Result<()> {
        let mut active = self.active.lock().unwrap();
        let project = active.as_mut().ok_or_else(|| anyhow::anyhow!("no active project"))?;
        project.custom_workflows.insert(workflow.name.clone(), workflow);
        Ok(())
    }

    pub fn get_host_config_for_active_project(&self) -> Vec<ClientConfig> {
        self.active
            .lock()
            .unwrap()
            .as_ref()
            .map(|p| p.ordered_clients())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Transport;

    fn write_client_component(dir: &Path, id: &str) {
        std::fs::create_dir_all(dir.join("clients")).unwrap();
        std::fs::write(
            dir.join("clients").join(format!("{id}.json")),
            format!(r#"{{"client_id":"{id}","transport":"stdio","server_path":"./server.py"}}"#),
        )
        .unwrap();
    }

    #[test]
    fn resolves_string_reference_against_component_manager() {
        let dir = tempfile::tempdir().unwrap();
        write_client_component(dir.path(), "fs");
        let components = Arc::new(ComponentManager::load(dir.path()));
        let manager = ProjectManager::new(components);

        let project_path = dir.path().join("project.json");
        std::fs::write(&project_path, r#"{"name":"p","clients":["fs"]}"#).unwrap();

        let project = manager.load_project(&project_path).unwrap();
        assert_eq!(project.clients.len(), 1);
        assert!(project.clients.contains_key("fs"));
    }

    #[test]
    fn unresolved_string_reference_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let components = Arc::new(ComponentManager::load(dir.path()));
        let manager = ProjectManager::new(components);

        let project_path = dir.path().join("project.json");
        std::fs::write(&project_path, r#"{"name":"p","clients":["ghost"]}"#).unwrap();

        assert!(manager.load_project(&project_path).is_err());
    }

    #[test]
    fn inline_client_server_path_resolves_against_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let components = Arc::new(ComponentManager::load(dir.path()));
        let manager = ProjectManager::new(components);

        let project_path = dir.path().join("project.json");
        std::fs::write(
            &project_path,
            r#"{"name":"p","clients":[{"client_id":"fs","transport":"stdio","server_path":"./server.py"}]}"#,
        )
        .unwrap();

        let project = manager.load_project(&project_path).unwrap();
        let client = &project.clients["fs"];
        assert_eq!(client.transport, Transport::Stdio);
        assert!(PathBuf::from(client.server_path.as_ref().unwrap()).is_absolute());
    }

    #[test]
    fn unload_clears_active_project() {
        let dir = tempfile::tempdir().unwrap();
        let components = Arc::new(ComponentManager::load(dir.path()));
        let manager = ProjectManager::new(components);

        let project_path = dir.path().join("project.json");
        std::fs::write(&project_path, r#"{"name":"p"}"#).unwrap();
        manager.load_project(&project_path).unwrap();
        assert!(manager.active_project().is_some());

        manager.unload_active_project();
        assert!(manager.active_project().is_none());
    }
}
