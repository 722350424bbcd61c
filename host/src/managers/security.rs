//! Resolves `ClientConfig.gcp_secrets` into an env-var map for subprocess
//! injection. The actual secret backend is an external collaborator; here
//! we define the trait the host programs against plus a local-dev
//! implementation that reads from the process environment (handy for
//! tests and for deployments that just want `${VAR}` passthrough).

use crate::config::SecretRef;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait SecretBackend: Send + Sync {
    async fn fetch(&self, secret_id: &str) -> anyhow::Result<String>;
}

/// Resolves a secret id by reading the identically-named environment
/// variable. Used when no external secret manager is configured.
pub struct EnvSecretBackend;

#[async_trait]
impl SecretBackend for EnvSecretBackend {
    async fn fetch(&self, secret_id: &str) -> anyhow::Result<String> {
        std::env::var(secret_id).map_err(|_| anyhow::anyhow!("secret `{secret_id}` not set"))
    }
}

pub struct SecurityManager {
    backend: Box<dyn SecretBackend>,
}

impl SecurityManager {
    pub fn new(backend: Box<dyn SecretBackend>) -> Self {
        Self { backend }
    }

    pub fn with_env_backend() -> Self {
        Self::new(Box::new(EnvSecretBackend))
    }

    /// Resolve every secret in the batch concurrently, so one slow fetch
    /// doesn't serialize host initialization behind the rest of the batch. A
    /// missing or forbidden secret is logged and skipped; the rest still
    /// resolve.
    pub async fn resolve_secrets(&self, refs: &[SecretRef]) -> HashMap<String, String> {
        let fetches = refs.iter().map(|secret| async move {
            match self.backend.fetch(&secret.secret_id).await {
                Ok(value) => Some((secret.env_var_name.clone(), value)),
                Err(err) => {
                    tracing::warn!(
                        secret_id = %secret.secret_id,
                        error = %err,
                        "failed to resolve secret, skipping"
                    );
                    None
                }
            }
        });

        futures_util::future::join_all(fetches).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_secret_is_skipped_not_fatal() {
        let manager = SecurityManager::with_env_backend();
        let refs = vec![SecretRef {
            secret_id: "MCP_HOST_TEST_DOES_NOT_EXIST".into(),
            env_var_name: "OUT".into(),
        }];
        let resolved = manager.resolve_secrets(&refs).await;
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn present_secret_resolves() {
        std::env::set_var("MCP_HOST_TEST_SECRET", "s3cr3t");
        let manager = SecurityManager::with_env_backend();
        let refs = vec![SecretRef {
            secret_id: "MCP_HOST_TEST_SECRET".into(),
            env_var_name: "API_KEY".into(),
        }];
        let resolved = manager.resolve_secrets(&refs).await;
        assert_eq!(resolved.get("API_KEY"), Some(&"s3cr3t".to_string()));
    }
}
