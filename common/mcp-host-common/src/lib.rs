//! Shared extensibility types for the MCP host.
//!
//! Kept as its own crate so that a custom workflow implementation can
//! depend on just the trait surface it needs to compile against, without
//! pulling in the host's full dependency stack.

pub mod custom_workflow;

pub use custom_workflow::{
    CustomWorkflow, CustomWorkflowError, CustomWorkflowRegistry, CustomWorkflowResult,
    ExecutionHandle,
};
