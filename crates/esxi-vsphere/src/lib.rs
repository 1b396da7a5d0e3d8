//! # esxi-vsphere: ESXi / vSphere Management
//!
//! VMware ESXi / vCenter management via the vSphere REST API, exposed as
//! a catalog of MCP tools.
//!
//! ## Modules
//!
//! - **types**: Shared data structures (VMs, hosts, datastores, networks, snapshots)
//! - **error**: Crate-specific error types
//! - **session**: API session lifecycle with single-flight re-authentication
//! - **vsphere**: vSphere REST API HTTP gateway (401 recovery, typed helpers)
//! - **vm**: VM listing, lookup and power operations
//! - **snapshot**: Snapshot list, create, delete, revert
//! - **network**: Network inventory
//! - **storage**: Datastore inventory
//! - **host**: ESXi host information
//! - **service**: Aggregate facade shared across concurrent calls
//! - **tools**: Tool catalog, argument validation and dispatcher

pub mod types;
pub mod error;
pub mod session;
pub mod vsphere;
pub mod vm;
pub mod snapshot;
pub mod network;
pub mod storage;
pub mod host;
pub mod service;
pub mod tools;

pub use error::{VsphereError, VsphereResult};
pub use service::{EsxiService, EsxiServiceState};
pub use tools::{ToolDispatcher, ToolError, ToolResponse};
pub use types::VsphereConfig;
