//! CustomWorkflowExecutor (§4.12). Dynamic class lookup by module path is
//! replaced, per the redesign note, by a trait-object registry: workflows
//! are compiled in and registered under the `class_name` a project's
//! `CustomWorkflowConfig` references. `module_path` is carried only as
//! advisory metadata for error messages.

use crate::config::CustomWorkflowConfig;
use crate::error::HostError;
use mcp_host_common::{CustomWorkflowError, CustomWorkflowRegistry, ExecutionHandle};
use serde_json::Value;

pub async fn run(
    registry: &CustomWorkflowRegistry,
    config: &CustomWorkflowConfig,
    initial_input: Value,
    executor: &dyn ExecutionHandle,
    session_id: Option<&str>,
) -> Result<Value, HostError> {
    let module_path = config.module_path.clone();
    let workflow = registry.get(&config.class_name).map_err(|err| match err {
        CustomWorkflowError::ClassNotFound(class_name) => HostError::CustomWorkflowLoadError {
            module_path: module_path.clone(),
            class_name,
            cause: "no registry entry for this class_name".to_string(),
        },
        CustomWorkflowError::Failed(class_name, cause) => {
            HostError::CustomWorkflowLoadError { module_path: module_path.clone(), class_name, cause }
        }
    })?;

    workflow
        .execute(initial_input, executor, session_id)
        .await
        .map_err(|err| match err {
            CustomWorkflowError::ClassNotFound(class_name) => {
                HostError::CustomWorkflowLoadError { module_path: module_path.clone(), class_name, cause: "not found".to_string() }
            }
            CustomWorkflowError::Failed(class_name, cause) => {
                HostError::CustomWorkflowLoadError { module_path: module_path.clone(), class_name, cause }
            }
        })
}
