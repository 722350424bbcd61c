//! Trait-object registry for custom workflows.
//!
//! A custom workflow is user code that receives a handle back into the
//! execution layer so it can call agents or simple workflows as part of
//! its own logic. Rather than looking up a class by name at runtime, custom
//! workflows are compiled in and registered here under the name their
//! project configuration references.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Error type for custom workflow registration and execution.
#[derive(Debug, thiserror::Error)]
pub enum CustomWorkflowError {
    /// No registry entry for the requested class name.
    #[error("no custom workflow registered for class `{0}`")]
    ClassNotFound(String),

    /// The workflow's own logic failed.
    #[error("custom workflow `{0}` failed: {1}")]
    Failed(String, String),
}

pub type CustomWorkflowResult<T> = Result<T, CustomWorkflowError>;

/// The subset of the execution facade a custom workflow is allowed to call.
///
/// Defined here rather than depended on directly so that a custom workflow
/// implementation doesn't need to pull in the full host crate to compile
/// against this trait.
#[async_trait]
pub trait ExecutionHandle: Send + Sync {
    async fn run_agent(
        &self,
        agent_name: &str,
        user_message: &str,
        session_id: Option<&str>,
    ) -> anyhow::Result<Value>;

    async fn run_simple_workflow(
        &self,
        workflow_name: &str,
        initial_message: &str,
    ) -> anyhow::Result<Value>;
}

/// A user-supplied workflow, invoked with its declared input and a handle
/// back into the execution layer.
#[async_trait]
pub trait CustomWorkflow: Send + Sync {
    async fn execute(
        &self,
        initial_input: Value,
        executor: &dyn ExecutionHandle,
        session_id: Option<&str>,
    ) -> CustomWorkflowResult<Value>;
}

/// Maps a project's `class_name` to a compiled-in [`CustomWorkflow`].
#[derive(Default, Clone)]
pub struct CustomWorkflowRegistry {
    workflows: HashMap<String, Arc<dyn CustomWorkflow>>,
}

impl CustomWorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class_name: impl Into<String>, workflow: Arc<dyn CustomWorkflow>) {
        self.workflows.insert(class_name.into(), workflow);
    }

    pub fn get(&self, class_name: &str) -> CustomWorkflowResult<Arc<dyn CustomWorkflow>> {
        self.workflows
            .get(class_name)
            .cloned()
            .ok_or_else(|| CustomWorkflowError::ClassNotFound(class_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CustomWorkflow for Echo {
        async fn execute(
            &self,
            initial_input: Value,
            _executor: &dyn ExecutionHandle,
            _session_id: Option<&str>,
        ) -> CustomWorkflowResult<Value> {
            Ok(initial_input)
        }
    }

    #[test]
    fn unregistered_class_errors() {
        let registry = CustomWorkflowRegistry::new();
        let err = registry.get("Missing").unwrap_err();
        assert!(matches!(err, CustomWorkflowError::ClassNotFound(name) if name == "Missing"));
    }

    #[tokio::test]
    async fn registered_workflow_executes() {
        let mut registry = CustomWorkflowRegistry::new();
        registry.register("Echo", Arc::new(Echo));
        let workflow = registry.get("Echo").unwrap();

        struct NoopHandle;
        #[async_trait]
        impl ExecutionHandle for NoopHandle {
            async fn run_agent(&self, _: &str, _: &str, _: Option<&str>) -> anyhow::Result<Value> {
                unreachable!()
            }
            async fn run_simple_workflow(&self, _: &str, _: &str) -> anyhow::Result<Value> {
                unreachable!()
            }
        }

        let out = workflow
            .execute(serde_json::json!({"x": 1}), &NoopHandle, None)
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!({"x": 1}));
    }
}
