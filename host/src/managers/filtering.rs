//! Pure policy decisions over an agent's access configuration. No I/O, no
//! shared state — every call is a function of its arguments.

use crate::config::AgentConfig;
use crate::error::ComponentKind;

pub struct FilteringManager;

impl FilteringManager {
    pub fn is_client_permitted(agent: &AgentConfig, client_id: &str) -> bool {
        match &agent.client_ids {
            Some(allowed) => allowed.iter().any(|c| c == client_id),
            None => true,
        }
    }

    /// `id` is the component name for tools/prompts, the resource URI for
    /// resources. Exclusion strictly dominates inclusion.
    pub fn is_component_permitted(agent: &AgentConfig, kind: ComponentKind, id: &str) -> bool {
        let key = format!("{kind}:{id}");

        if agent.exclude_components.iter().any(|e| e == &key) {
            return false;
        }

        if let Some(include) = &agent.include_components {
            return include.iter().any(|i| i == &key);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentConfig {
        AgentConfig {
            name: "a".into(),
            llm_config_id: None,
            model: None,
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            client_ids: None,
            exclude_components: vec![],
            include_components: None,
            max_iterations: 10,
            include_history: false,
        }
    }

    #[test]
    fn no_client_ids_permits_everything() {
        assert!(FilteringManager::is_client_permitted(&agent(), "any-client"));
    }

    #[test]
    fn client_ids_restricts() {
        let mut a = agent();
        a.client_ids = Some(vec!["fs".into()]);
        assert!(FilteringManager::is_client_permitted(&a, "fs"));
        assert!(!FilteringManager::is_client_permitted(&a, "other"));
    }

    #[test]
    fn exclude_dominates_include() {
        let mut a = agent();
        a.include_components = Some(vec!["tool:save_plan".into()]);
        a.exclude_components = vec!["tool:save_plan".into()];
        assert!(!FilteringManager::is_component_permitted(&a, ComponentKind::Tool, "save_plan"));
    }

    #[test]
    fn include_list_restricts_when_present() {
        let mut a = agent();
        a.include_components = Some(vec!["tool:get_weather".into()]);
        assert!(FilteringManager::is_component_permitted(&a, ComponentKind::Tool, "get_weather"));
        assert!(!FilteringManager::is_component_permitted(&a, ComponentKind::Tool, "save_plan"));
    }

    #[test]
    fn no_lists_permits_everything() {
        let a = agent();
        assert!(FilteringManager::is_component_permitted(&a, ComponentKind::Tool, "anything"));
    }
}
