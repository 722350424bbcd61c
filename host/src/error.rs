//! Host-wide error taxonomy.
//!
//! One flat enum covers everything the facade boundary can raise. Tool
//! execution failures are the exception: those are handed back to the LLM
//! as structured tool-result content rather than raised here, so the model
//! can react to them (see `execution::agent`).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Tool,
    Prompt,
    Resource,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComponentKind::Tool => "tool",
            ComponentKind::Prompt => "prompt",
            ComponentKind::Resource => "resource",
        };
        write!(f, "{s}")
    }
}

/// Why resolution found no usable client for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No client ever registered this name.
    Unknown,
    /// At least one client has it, but the agent's policy excludes it.
    Filtered,
    /// A `preferred_client` was given but doesn't provide this component.
    DisallowedClient,
}

impl std::fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotFoundReason::Unknown => "unknown",
            NotFoundReason::Filtered => "filtered",
            NotFoundReason::DisallowedClient => "disallowed_client",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("no {kind} named `{name}` available ({reason})")]
    ComponentNotFound {
        kind: ComponentKind,
        name: String,
        reason: NotFoundReason,
    },

    #[error("`{name}` ({kind}) is provided by more than one client: {candidates:?}")]
    AmbiguousComponent {
        kind: ComponentKind,
        name: String,
        candidates: Vec<String>,
    },

    #[error("client `{client_id}` has no active session")]
    ClientUnavailable { client_id: String },

    #[error("client `{client_id}` failed to initialize: {cause}")]
    ClientInitFailed { client_id: String, cause: String },

    #[error("llm call failed: {cause}")]
    LLMError { cause: String },

    #[error("tool `{tool_name}` execution failed: {cause}")]
    ToolExecutionError { tool_name: String, cause: String },

    #[error("invalid config at {path}: field `{field}`: {message}")]
    ConfigValidationError {
        path: String,
        field: String,
        message: String,
    },

    #[error("workflow `{workflow}` failed at step {step_index}: {cause}")]
    WorkflowStepFailed {
        workflow: String,
        step_index: usize,
        cause: String,
    },

    #[error("custom workflow `{class_name}` (module_path={module_path}) could not be loaded: {cause}")]
    CustomWorkflowLoadError {
        module_path: String,
        class_name: String,
        cause: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type HostResult<T> = Result<T, HostError>;
