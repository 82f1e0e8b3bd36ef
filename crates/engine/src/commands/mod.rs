//! Command plane: discovery, classification, and the markdown/LLM path.

pub mod dispatch;
pub mod registry;
pub mod runner;

pub use dispatch::{ActionRequest, CommandDispatcher, DispatchResult};
pub use registry::{CommandRecord, CommandRegistry};
pub use runner::MarkdownCommandRunner;
