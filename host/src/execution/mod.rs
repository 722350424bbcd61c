pub mod agent;
pub mod custom_workflow;
pub mod events;
pub mod facade;
pub mod simple_workflow;

pub use agent::{AgentResult, AgentTurnProcessor, StopReason};
pub use events::{AgentEvent, EventReceiver, EventSender};
pub use facade::ExecutionFacade;
pub use simple_workflow::SimpleWorkflowResult;
