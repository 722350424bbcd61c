//! ComponentManager (§4.7): the canonical on-disk store of reusable
//! component definitions, one typed directory per kind. A file may hold a
//! single definition object or a JSON array of them.

use crate::config::{AgentConfig, ClientConfig, CustomWorkflowConfig, LLMConfig, WorkflowConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn scan_dir<T, F>(dir: &Path, id_of: F) -> HashMap<String, T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> String,
{
    let mut out = HashMap::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read component file");
                continue;
            }
        };

        let parsed: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "invalid JSON in component file");
                continue;
            }
        };

        let defs: Vec<T> = if parsed.is_array() {
            match serde_json::from_value(parsed) {
                Ok(defs) => defs,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "invalid component list");
                    continue;
                }
            }
        } else {
            match serde_json::from_value(parsed) {
                Ok(def) => vec![def],
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "invalid component definition");
                    continue;
                }
            }
        };

        for def in defs {
            let id = id_of(&def);
            if out.contains_key(&id) {
                tracing::warn!(id = %id, path = %path.display(), "duplicate component id, keeping first seen");
                continue;
            }
            out.insert(id, def);
        }
    }

    out
}

fn write_single<T: Serialize>(dir: &Path, id: &str, def: &T) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{id}.json"));
    let json = serde_json::to_string_pretty(def)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn delete_single(root: &Path, dir_name: &str, id: &str) -> anyhow::Result<()> {
    let path = root.join(dir_name).join(format!("{id}.json"));
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Writes a multi-component file (`save_list`): each definition in `defs` is
/// validated independently against `T`; invalid entries are logged and
/// skipped rather than failing the whole batch. Returns the ids actually
/// written.
fn write_list<T, F>(root: &Path, dir_name: &str, filename: &str, defs: Vec<serde_json::Value>, map: &Mutex<HashMap<String, T>>, id_of: F) -> anyhow::Result<Vec<String>>
where
    T: DeserializeOwned + Serialize + Clone,
    F: Fn(&T) -> String,
{
    let mut valid = Vec::new();
    for def in defs {
        match serde_json::from_value::<T>(def) {
            Ok(parsed) => valid.push(parsed),
            Err(err) => tracing::warn!(filename, error = %err, "skipping invalid definition in save_list batch"),
        }
    }

    let dir = root.join(dir_name);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(filename), serde_json::to_string_pretty(&valid)?)?;

    let mut guard = map.lock().unwrap();
    let ids: Vec<String> = valid
        .into_iter()
        .map(|def| {
            let id = id_of(&def);
            guard.insert(id.clone(), def);
            id
        })
        .collect();
    Ok(ids)
}

fn list_values<T: Serialize>(map: &Mutex<HashMap<String, T>>) -> Vec<serde_json::Value> {
    map.lock().unwrap().values().filter_map(|v| serde_json::to_value(v).ok()).collect()
}

/// The five typed directories a `ComponentManager` scans (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStoreKind {
    Client,
    Llm,
    Agent,
    SimpleWorkflow,
    CustomWorkflow,
}

impl ComponentStoreKind {
    fn dir_name(self) -> &'static str {
        match self {
            ComponentStoreKind::Client => "clients",
            ComponentStoreKind::Llm => "llms",
            ComponentStoreKind::Agent => "agents",
            ComponentStoreKind::SimpleWorkflow => "simple_workflows",
            ComponentStoreKind::CustomWorkflow => "custom_workflows",
        }
    }
}

pub struct ComponentManager {
    root: PathBuf,
    clients: Mutex<HashMap<String, ClientConfig>>,
    llms: Mutex<HashMap<String, LLMConfig>>,
    agents: Mutex<HashMap<String, AgentConfig>>,
    simple_workflows: Mutex<HashMap<String, WorkflowConfig>>,
    custom_workflows: Mutex<HashMap<String, CustomWorkflowConfig>>,
}

impl ComponentManager {
    pub fn load(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            clients: Mutex::new(scan_dir(&root.join("clients"), |c: &ClientConfig| c.client_id.clone())),
            llms: Mutex::new(scan_dir(&root.join("llms"), |l: &LLMConfig| l.llm_id.clone())),
            agents: Mutex::new(scan_dir(&root.join("agents"), |a: &AgentConfig| a.name.clone())),
            simple_workflows: Mutex::new(scan_dir(&root.join("simple_workflows"), |w: &WorkflowConfig| w.name.clone())),
            custom_workflows: Mutex::new(scan_dir(&root.join("custom_workflows"), |w: &CustomWorkflowConfig| w.name.clone())),
            root,
        }
    }

    pub fn get_client(&self, id: &str) -> Option<ClientConfig> {
        self.clients.lock().unwrap().get(id).cloned()
    }
    pub fn get_llm(&self, id: &str) -> Option<LLMConfig> {
        self.llms.lock().unwrap().get(id).cloned()
    }
    pub fn get_agent(&self, id: &str) -> Option<AgentConfig> {
        self.agents.lock().unwrap().get(id).cloned()
    }
    pub fn get_simple_workflow(&self, id: &str) -> Option<WorkflowConfig> {
        self.simple_workflows.lock().unwrap().get(id).cloned()
    }
    pub fn get_custom_workflow(&self, id: &str) -> Option<CustomWorkflowConfig> {
        self.custom_workflows.lock().unwrap().get(id).cloned()
    }

    pub fn save_client(&self, def: ClientConfig) -> anyhow::Result<()> {
        write_single(&self.root.join("clients"), &def.client_id, &def)?;
        self.clients.lock().unwrap().insert(def.client_id.clone(), def);
        Ok(())
    }
    pub fn save_llm(&self, def: LLMConfig) -> anyhow::Result<()> {
        write_single(&self.root.join("llms"), &def.llm_id, &def)?;
        self.llms.lock().unwrap().insert(def.llm_id.clone(), def);
        Ok(())
    }
    pub fn save_agent(&self, def: AgentConfig) -> anyhow::Result<()> {
        write_single(&self.root.join("agents"), &def.name, &def)?;
        self.agents.lock().unwrap().insert(def.name.clone(), def);
        Ok(())
    }

    pub fn save_simple_workflow(&self, def: WorkflowConfig) -> anyhow::Result<()> {
        write_single(&self.root.join("simple_workflows"), &def.name, &def)?;
        self.simple_workflows.lock().unwrap().insert(def.name.clone(), def);
        Ok(())
    }
    pub fn save_custom_workflow(&self, def: CustomWorkflowConfig) -> anyhow::Result<()> {
        write_single(&self.root.join("custom_workflows"), &def.name, &def)?;
        self.custom_workflows.lock().unwrap().insert(def.name.clone(), def);
        Ok(())
    }

    pub fn delete_client(&self, id: &str) -> anyhow::Result<()> {
        self.clients.lock().unwrap().remove(id);
        delete_single(&self.root, "clients", id)
    }
    pub fn delete_llm(&self, id: &str) -> anyhow::Result<()> {
        self.llms.lock().unwrap().remove(id);
        delete_single(&self.root, "llms", id)
    }
    pub fn delete_agent(&self, id: &str) -> anyhow::Result<()> {
        self.agents.lock().unwrap().remove(id);
        delete_single(&self.root, "agents", id)
    }
    pub fn delete_simple_workflow(&self, id: &str) -> anyhow::Result<()> {
        self.simple_workflows.lock().unwrap().remove(id);
        delete_single(&self.root, "simple_workflows", id)
    }
    pub fn delete_custom_workflow(&self, id: &str) -> anyhow::Result<()> {
        self.custom_workflows.lock().unwrap().remove(id);
        delete_single(&self.root, "custom_workflows", id)
    }

    /// `delete(kind, id)` (§4.7), dispatching on the component kind.
    pub fn delete(&self, kind: ComponentStoreKind, id: &str) -> anyhow::Result<()> {
        match kind {
            ComponentStoreKind::Client => self.delete_client(id),
            ComponentStoreKind::Llm => self.delete_llm(id),
            ComponentStoreKind::Agent => self.delete_agent(id),
            ComponentStoreKind::SimpleWorkflow => self.delete_simple_workflow(id),
            ComponentStoreKind::CustomWorkflow => self.delete_custom_workflow(id),
        }
    }

    /// `list(kind)` (§4.7): every definition currently held for that kind, as
    /// JSON values so the CLI/API layer can render any of the five shapes
    /// uniformly.
    pub fn list(&self, kind: ComponentStoreKind) -> Vec<serde_json::Value> {
        match kind {
            ComponentStoreKind::Client => list_values(&self.clients),
            ComponentStoreKind::Llm => list_values(&self.llms),
            ComponentStoreKind::Agent => list_values(&self.agents),
            ComponentStoreKind::SimpleWorkflow => list_values(&self.simple_workflows),
            ComponentStoreKind::CustomWorkflow => list_values(&self.custom_workflows),
        }
    }

    /// `save_list(kind, filename, defs[])` (§4.7): writes a multi-component
    /// file, validating each definition independently and skipping invalid
    /// ones rather than failing the whole batch. Returns the ids written.
    pub fn save_list(&self, kind: ComponentStoreKind, filename: &str, defs: Vec<serde_json::Value>) -> anyhow::Result<Vec<String>> {
        match kind {
            ComponentStoreKind::Client => write_list(&self.root, kind.dir_name(), filename, defs, &self.clients, |c: &ClientConfig| c.client_id.clone()),
            ComponentStoreKind::Llm => write_list(&self.root, kind.dir_name(), filename, defs, &self.llms, |l: &LLMConfig| l.llm_id.clone()),
            ComponentStoreKind::Agent => write_list(&self.root, kind.dir_name(), filename, defs, &self.agents, |a: &AgentConfig| a.name.clone()),
            ComponentStoreKind::SimpleWorkflow => {
                write_list(&self.root, kind.dir_name(), filename, defs, &self.simple_workflows, |w: &WorkflowConfig| w.name.clone())
            }
            ComponentStoreKind::CustomWorkflow => {
                write_list(&self.root, kind.dir_name(), filename, defs, &self.custom_workflows, |w: &CustomWorkflowConfig| w.name.clone())
            }
        }
    }

    pub fn counts(&self) -> HashMap<&'static str, usize> {
        HashMap::from([
            ("clients", self.clients.lock().unwrap().len()),
            ("llms", self.llms.lock().unwrap().len()),
            ("agents", self.agents.lock().unwrap().len()),
            ("simple_workflows", self.simple_workflows.lock().unwrap().len()),
            ("custom_workflows", self.custom_workflows.lock().unwrap().len()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Transport;

    #[test]
    fn save_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ComponentManager::load(dir.path());

        let client = ClientConfig {
            client_id: "fs".into(),
            transport: Transport::Stdio,
            server_path: Some("/bin/true".into()),
            server_args: vec![],
            sse_url: None,
            capabilities: vec!["tools".into()],
            roots: vec![],
            exclude: vec![],
            gcp_secrets: vec![],
            timeout_secs: 30,
            routing_weight: 1,
        };
        manager.save_client(client.clone()).unwrap();

        let reloaded = ComponentManager::load(dir.path());
        let fetched = reloaded.get_client("fs").unwrap();
        assert_eq!(fetched.client_id, client.client_id);
    }

    #[test]
    fn duplicate_id_keeps_first_seen() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("llms")).unwrap();
        std::fs::write(
            dir.path().join("llms").join("a.json"),
            r#"{"llm_id":"x","provider":"ollama","model_name":"m1"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("llms").join("b.json"),
            r#"{"llm_id":"x","provider":"ollama","model_name":"m2"}"#,
        )
        .unwrap();

        let manager = ComponentManager::load(dir.path());
        // whichever file the filesystem returns first wins; both are valid
        // so we only assert the registry ends up with exactly one "x".
        assert_eq!(manager.counts()["llms"], 1);
        assert!(manager.get_llm("x").is_some());
    }

    #[test]
    fn save_list_writes_valid_entries_and_skips_invalid_ones() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ComponentManager::load(dir.path());

        let defs = vec![
            serde_json::json!({"llm_id": "fast", "provider": "ollama", "model_name": "m1"}),
            serde_json::json!({"llm_id": "slow", "provider": "ollama", "model_name": "m2"}),
            serde_json::json!({"not_an_llm": true}),
        ];
        let written = manager.save_list(ComponentStoreKind::Llm, "batch.json", defs).unwrap();
        assert_eq!(written.len(), 2);
        assert!(manager.get_llm("fast").is_some());
        assert!(manager.get_llm("slow").is_some());
        assert!(dir.path().join("llms/batch.json").exists());

        let reloaded = ComponentManager::load(dir.path());
        assert_eq!(reloaded.counts()["llms"], 2);
    }

    #[test]
    fn list_returns_every_registered_definition() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ComponentManager::load(dir.path());
        manager
            .save_llm(crate::config::LLMConfig {
                llm_id: "fast".into(),
                provider: "ollama".into(),
                model_name: "m1".into(),
                temperature: None,
                max_tokens: None,
                default_system_prompt: None,
                params: std::collections::HashMap::new(),
            })
            .unwrap();

        let values = manager.list(ComponentStoreKind::Llm);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["llm_id"], "fast");
    }

    #[test]
    fn delete_removes_from_registry_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ComponentManager::load(dir.path());
        manager
            .save_llm(crate::config::LLMConfig {
                llm_id: "fast".into(),
                provider: "ollama".into(),
                model_name: "m1".into(),
                temperature: None,
                max_tokens: None,
                default_system_prompt: None,
                params: std::collections::HashMap::new(),
            })
            .unwrap();

        manager.delete(ComponentStoreKind::Llm, "fast").unwrap();
        assert!(manager.get_llm("fast").is_none());
        assert!(!dir.path().join("llms/fast.json").exists());
    }
}
