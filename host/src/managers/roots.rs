//! Tracks each client's declared MCP roots (`ClientConfig.roots`), so other
//! parts of the host can look up what filesystem/resource roots a client
//! advertised at registration time. Grounded on the per-client registry
//! shape shared by `ToolManager`/`PromptManager`/`ResourceManager` — a
//! client id keying a `Mutex<HashMap<..>>`, populated at `register_client`
//! and cleared at `unregister_client`.

use crate::config::RootConfig;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct RootManager {
    roots: Mutex<HashMap<String, Vec<RootConfig>>>,
}

impl RootManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `client_id`'s declared roots. A client with no roots is not
    /// inserted at all, so `roots_for_client` distinguishes "registered with
    /// zero roots" from "never registered" only by always returning an
    /// empty vec either way — callers that care use `has_roots`.
    pub fn register_client_roots(&self, client_id: &str, roots: Vec<RootConfig>) {
        if roots.is_empty() {
            return;
        }
        self.roots.lock().unwrap().insert(client_id.to_string(), roots);
    }

    pub fn roots_for_client(&self, client_id: &str) -> Vec<RootConfig> {
        self.roots.lock().unwrap().get(client_id).cloned().unwrap_or_default()
    }

    pub fn has_roots(&self, client_id: &str) -> bool {
        self.roots.lock().unwrap().contains_key(client_id)
    }

    pub fn unregister_client(&self, client_id: &str) {
        self.roots.lock().unwrap().remove(client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(uri: &str) -> RootConfig {
        RootConfig { uri: uri.to_string(), name: uri.to_string(), capabilities: vec![] }
    }

    #[test]
    fn registers_and_looks_up_roots() {
        let manager = RootManager::new();
        manager.register_client_roots("fs", vec![root("file:///tmp")]);
        assert_eq!(manager.roots_for_client("fs").len(), 1);
        assert!(manager.roots_for_client("other").is_empty());
    }

    #[test]
    fn empty_roots_registers_nothing() {
        let manager = RootManager::new();
        manager.register_client_roots("fs", vec![]);
        assert!(!manager.has_roots("fs"));
    }

    #[test]
    fn unregister_drops_the_entry() {
        let manager = RootManager::new();
        manager.register_client_roots("fs", vec![root("file:///tmp")]);
        manager.unregister_client("fs");
        assert!(!manager.has_roots("fs"));
    }
}
