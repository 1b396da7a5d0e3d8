//! MCP tool surface: the static catalog, typed argument validation and
//! the dispatcher that maps tool calls onto [`crate::service::EsxiService`].

pub mod args;
pub mod catalog;
pub mod dispatch;
pub mod error;

pub use args::{ToolCall, VmRef};
pub use catalog::{catalog, ToolDescriptor, ToolName};
pub use dispatch::{ToolContent, ToolDispatcher, ToolResponse};
pub use error::ToolError;
