//! Agent-facing tool registry over the hybrid query layer: a closed set of
//! named tools (`types`), their JSON-Schema definitions for the LLM
//! provider (`schemas`), and the dispatcher that executes a call and always
//! returns a JSON payload, even on failure (`executor`).

pub mod executor;
pub mod schemas;
pub mod types;

pub use executor::ToolExecutor;
pub use schemas::ToolSchema;
pub use types::Tool;
