//! In-memory name -> providers index. No I/O; every operation is a plain
//! map mutation behind a mutex so concurrent readers never see a torn
//! update between an unregister and the register that follows it.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCapabilities {
    pub tools: bool,
    pub prompts: bool,
    pub resources: bool,
}

#[derive(Default)]
struct RouterState {
    /// component name -> providing client ids
    providers: HashMap<String, HashSet<String>>,
    /// client id -> declared capabilities
    clients: HashMap<String, ClientCapabilities>,
}

/// Bidirectional index between component names and the clients that serve
/// them. Safe to share behind an `Arc`.
#[derive(Default)]
pub struct MessageRouter {
    state: Mutex<RouterState>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_server(&self, client_id: &str, capabilities: ClientCapabilities) {
        let mut state = self.state.lock().unwrap();
        state.clients.insert(client_id.to_string(), capabilities);
    }

    pub fn register_component(&self, name: &str, client_id: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .providers
            .entry(name.to_string())
            .or_default()
            .insert(client_id.to_string());
    }

    pub fn get_clients_for_component(&self, name: &str) -> HashSet<String> {
        let state = self.state.lock().unwrap();
        state.providers.get(name).cloned().unwrap_or_default()
    }

    pub fn client_capabilities(&self, client_id: &str) -> Option<ClientCapabilities> {
        let state = self.state.lock().unwrap();
        state.clients.get(client_id).cloned()
    }

    pub fn is_known_client(&self, client_id: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.clients.contains_key(client_id)
    }

    /// Remove a client entirely: from the capability map and from every
    /// provider set it was a member of. Empty provider sets are dropped.
    pub fn unregister_server(&self, client_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.clients.remove(client_id);
        state.providers.retain(|_, providers| {
            providers.remove(client_id);
            !providers.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let router = MessageRouter::new();
        router.register_server("fs", ClientCapabilities { tools: true, ..Default::default() });
        router.register_component("read_file", "fs");

        let providers = router.get_clients_for_component("read_file");
        assert_eq!(providers.len(), 1);
        assert!(providers.contains("fs"));
    }

    #[test]
    fn unknown_component_has_no_providers() {
        let router = MessageRouter::new();
        assert!(router.get_clients_for_component("nope").is_empty());
    }

    #[test]
    fn unregister_removes_from_every_set() {
        let router = MessageRouter::new();
        router.register_server("fs", ClientCapabilities::default());
        router.register_component("read_file", "fs");
        router.register_component("write_file", "fs");

        router.unregister_server("fs");

        assert!(router.get_clients_for_component("read_file").is_empty());
        assert!(router.get_clients_for_component("write_file").is_empty());
        assert!(!router.is_known_client("fs"));
    }

    #[test]
    fn multiple_providers_for_same_name() {
        let router = MessageRouter::new();
        router.register_server("a", ClientCapabilities::default());
        router.register_server("b", ClientCapabilities::default());
        router.register_component("search", "a");
        router.register_component("search", "b");

        let providers = router.get_clients_for_component("search");
        assert_eq!(providers.len(), 2);
    }
}
