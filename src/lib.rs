//! # esxi-mcp
//!
//! MCP server exposing ESXi management operations as tools. The tool
//! catalog and the vSphere client live in the `esxi-vsphere` crate; this
//! crate adds configuration, logging and the HTTP / JSON-RPC surface.

pub mod config;
pub mod logging;
pub mod protocol;
pub mod server;

pub use config::{AppConfig, ConfigError, LogFormat};
pub use server::{create_router, serve, start_server, McpHandler};
