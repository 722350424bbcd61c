//! Static configuration types: the building blocks of a project (§3) and
//! the process-level settings file that configures a `HostManager`
//! independent of any one project (§3.1).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Sse,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RootConfig {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretRef {
    pub secret_id: String,
    pub env_var_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub transport: Transport,

    /// Required for `Transport::Stdio`.
    #[serde(default)]
    pub server_path: Option<String>,
    #[serde(default)]
    pub server_args: Vec<String>,

    /// Required for `Transport::Sse`.
    #[serde(default)]
    pub sse_url: Option<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub roots: Vec<RootConfig>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub gcp_secrets: Vec<SecretRef>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_routing_weight")]
    pub routing_weight: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_routing_weight() -> u32 {
    1
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self.transport {
            Transport::Stdio if self.server_path.is_none() => {
                Err("stdio transport requires server_path".to_string())
            }
            Transport::Sse if self.sse_url.is_none() => {
                Err("sse transport requires sse_url".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub llm_id: String,
    pub provider: String,
    pub model_name: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub default_system_prompt: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub llm_config_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub client_ids: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_components: Vec<String>,
    #[serde(default)]
    pub include_components: Option<Vec<String>>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub include_history: bool,
}

fn default_max_iterations() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub name: String,
    pub steps: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomWorkflowConfig {
    pub name: String,
    pub module_path: String,
    pub class_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A fully-resolved project: every reference in the source file has
/// already been swapped for the referenced object.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub clients: HashMap<String, ClientConfig>,
    #[serde(default)]
    pub llms: HashMap<String, LLMConfig>,
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,
    #[serde(default)]
    pub simple_workflows: HashMap<String, WorkflowConfig>,
    #[serde(default)]
    pub custom_workflows: HashMap<String, CustomWorkflowConfig>,
}

impl ProjectConfig {
    pub fn ordered_clients(&self) -> Vec<ClientConfig> {
        let mut clients: Vec<_> = self.clients.values().cloned().collect();
        clients.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        clients
    }
}

/// Process-level settings, loaded from `.mcp-host.toml`. Configures the
/// runtime itself, not any one project.
#[derive(Debug, Clone, Deserialize)]
pub struct HostSettings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub project_path: Option<PathBuf>,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_url")]
    pub url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_llm_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

fn default_llm_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "qwen2.5-coder:32b".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            project_path: None,
            storage: StorageSettings::default(),
            log_format: default_log_format(),
        }
    }
}

impl HostSettings {
    /// Search order: `./.mcp-host.toml`, then `dirs::config_dir()/mcp-host/config.toml`,
    /// else defaults. Mirrors the teacher's `.agent.toml` lookup.
    pub fn load() -> anyhow::Result<Self> {
        let cwd_path = std::env::current_dir()?.join(".mcp-host.toml");
        if cwd_path.exists() {
            return Self::load_from_path(&cwd_path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let global_path = config_dir.join("mcp-host").join("config.toml");
            if global_path.exists() {
                return Self::load_from_path(&global_path);
            }
        }

        tracing::debug!("no .mcp-host.toml found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_requires_path_for_stdio() {
        let cfg = ClientConfig {
            client_id: "fs".into(),
            transport: Transport::Stdio,
            server_path: None,
            server_args: vec![],
            sse_url: None,
            capabilities: vec![],
            roots: vec![],
            exclude: vec![],
            gcp_secrets: vec![],
            timeout_secs: 30,
            routing_weight: 1,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn ordered_clients_is_deterministic() {
        let mut project = ProjectConfig {
            name: "p".into(),
            ..Default::default()
        };
        for id in ["z", "a", "m"] {
            project.clients.insert(
                id.into(),
                ClientConfig {
                    client_id: id.into(),
                    transport: Transport::Sse,
                    server_path: None,
                    server_args: vec![],
                    sse_url: Some("http://x".into()),
                    capabilities: vec![],
                    roots: vec![],
                    exclude: vec![],
                    gcp_secrets: vec![],
                    timeout_secs: 30,
                    routing_weight: 1,
                },
            );
        }
        let ordered: Vec<_> = project.ordered_clients().into_iter().map(|c| c.client_id).collect();
        assert_eq!(ordered, vec!["a", "m", "z"]);
    }
}
