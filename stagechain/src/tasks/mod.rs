//! Tasks: persisted requests and their results.

mod orchestrator;
mod store;
mod task;

pub use orchestrator::{TaskOrchestrator, TerminalStatusPolicy};
pub use store::{InMemoryTaskStore, TaskStore};
pub use task::{Task, TaskStatus};
