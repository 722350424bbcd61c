//! Per-client resource catalog plus `read_resource` dispatch (§4.2).

use crate::client::ClientHandle;
use crate::error::{ComponentKind, HostError, NotFoundReason};
use rmcp::model::ReadResourceResult;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub client_id: String,
    pub uri: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Default)]
pub struct ResourceManager {
    clients: Mutex<HashMap<String, ClientHandle>>,
    resources: Mutex<HashMap<String, Vec<ResourceInfo>>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client_resources(
        &self,
        client_id: &str,
        handle: ClientHandle,
        declared: Vec<rmcp::model::Resource>,
        exclude: &[String],
    ) -> Vec<String> {
        let infos: Vec<ResourceInfo> = declared
            .into_iter()
            .filter(|r| !exclude.iter().any(|e| e == &r.raw.uri))
            .map(|r| ResourceInfo {
                client_id: client_id.to_string(),
                uri: r.raw.uri,
                name: Some(r.raw.name),
                mime_type: r.raw.mime_type,
            })
            .collect();

        let uris = infos.iter().map(|r| r.uri.clone()).collect();

        self.clients.lock().unwrap().insert(client_id.to_string(), handle);
        self.resources.lock().unwrap().insert(client_id.to_string(), infos);
        uris
    }

    pub fn list_resources_for_client(&self, client_id: &str) -> Vec<ResourceInfo> {
        self.resources.lock().unwrap().get(client_id).cloned().unwrap_or_default()
    }

    pub fn all_resources(&self) -> Vec<ResourceInfo> {
        self.resources.lock().unwrap().values().flatten().cloned().collect()
    }

    pub async fn read_resource(&self, uri: &str, client_id: &str) -> Result<ReadResourceResult, HostError> {
        let handle = {
            let clients = self.clients.lock().unwrap();
            clients
                .get(client_id)
                .cloned()
                .ok_or_else(|| HostError::ClientUnavailable { client_id: client_id.to_string() })?
        };

        let is_registered = {
            let resources = self.resources.lock().unwrap();
            resources
                .get(client_id)
                .map(|rs| rs.iter().any(|r| r.uri == uri))
                .unwrap_or(false)
        };
        if !is_registered {
            return Err(HostError::ComponentNotFound {
                kind: ComponentKind::Resource,
                name: uri.to_string(),
                reason: NotFoundReason::Unknown,
            });
        }

        handle.read_resource(uri).await.map_err(HostError::Other)
    }

    pub fn unregister_client(&self, client_id: &str) {
        self.clients.lock().unwrap().remove(client_id);
        self.resources.lock().unwrap().remove(client_id);
    }
}
