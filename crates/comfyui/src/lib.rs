//! ComfyUI WebSocket and REST client library.
//!
//! Provides the HTTP API wrappers, WebSocket connection, typed message
//! parsing, workflow templating, and a one-shot [`ImageGenerator`] that
//! turns "submit, await completion, fetch output" into a single call.

pub mod api;
pub mod client;
pub mod generator;
pub mod history;
pub mod messages;
pub mod workflow;

pub use generator::{GenerateError, ImageGenerator};
pub use workflow::{WorkflowNodes, WorkflowTemplate};
