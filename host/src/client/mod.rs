pub mod manager;
pub mod session;

pub use manager::{ClientHandle, ClientManager};
pub use session::{flatten_content, ClientSession};
