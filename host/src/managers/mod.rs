pub mod filtering;
pub mod prompt;
pub mod resource;
pub mod roots;
pub mod security;
pub mod tool;

pub use filtering::FilteringManager;
pub use prompt::{PromptInfo, PromptManager};
pub use resource::{ResourceInfo, ResourceManager};
pub use roots::RootManager;
pub use security::SecurityManager;
pub use tool::{ToolInfo, ToolManager};
