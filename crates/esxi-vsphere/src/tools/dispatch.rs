//! Routes validated tool calls onto [`EsxiService`] and wraps the outcome
//! in the MCP tool result envelope.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::args::{ToolCall, VmRef};
use super::catalog::{catalog, ToolDescriptor};
use super::error::ToolError;
use crate::service::EsxiServiceState;

/// One content block of a tool result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Envelope returned for every `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResponse {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResponse {
    pub fn success(payload: &Value) -> Self {
        Self::text(pretty(payload), false)
    }

    pub fn failure(err: &ToolError) -> Self {
        let payload = json!({ "error": err.to_string(), "kind": err.kind() });
        Self::text(pretty(&payload), true)
    }

    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".into(),
                text,
            }],
            is_error,
        }
    }

    /// Parse the text block back into JSON.
    pub fn payload(&self) -> Option<Value> {
        let first = self.content.first()?;
        serde_json::from_str(&first.text).ok()
    }
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

/// Tool dispatcher over a shared service handle.
#[derive(Clone)]
pub struct ToolDispatcher {
    service: EsxiServiceState,
}

impl ToolDispatcher {
    pub fn new(service: EsxiServiceState) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &EsxiServiceState {
        &self.service
    }

    pub fn list_tools(&self) -> &'static [ToolDescriptor] {
        catalog()
    }

    /// Run a tool and wrap the result. Never fails and never panics.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> ToolResponse {
        let outcome = AssertUnwindSafe(self.execute(name, arguments))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(payload)) => ToolResponse::success(&payload),
            Ok(Err(e)) => {
                warn!(tool = name, kind = e.kind(), error = %e, "Tool call failed");
                ToolResponse::failure(&e)
            }
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                error!(tool = name, panic = %msg, "Tool call panicked");
                ToolResponse::failure(&ToolError::Internal(msg))
            }
        }
    }

    /// Validate and run a tool, returning its raw payload.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let call = ToolCall::parse(name, arguments)?;
        debug!(tool = %call.name(), "Executing tool");
        self.run(call).await
    }

    async fn run(&self, call: ToolCall) -> Result<Value, ToolError> {
        let svc = &self.service;

        let payload = match call {
            // ── VMs ─────────────────────────────────────────────────
            ToolCall::ListVms(args) => match args.filter.as_deref() {
                Some(filter) => to_json(svc.list_vms_matching(filter).await?)?,
                None => to_json(svc.list_vms().await?)?,
            },
            ToolCall::GetVm(args) => {
                let vm_id = match args.vm_ref()? {
                    VmRef::Id(id) => id.to_string(),
                    VmRef::Name(name) => svc.require_vm_by_name(name).await?.vm,
                };
                to_json(svc.get_vm(&vm_id).await?)?
            }
            ToolCall::PowerOn(args) => {
                svc.power_on_vm(&args.vm_id).await?;
                done(format!("VM {} powered on", args.vm_id))
            }
            ToolCall::PowerOff(args) => {
                svc.power_off_vm(&args.vm_id, args.force.unwrap_or(false))
                    .await?;
                done(format!("VM {} powered off", args.vm_id))
            }
            ToolCall::RestartVm(args) => {
                svc.restart_vm(&args.vm_id, args.graceful.unwrap_or(false))
                    .await?;
                done(format!("VM {} restarted", args.vm_id))
            }
            ToolCall::SuspendVm(args) => {
                svc.suspend_vm(&args.vm_id).await?;
                done(format!("VM {} suspended", args.vm_id))
            }

            // ── Inventory ───────────────────────────────────────────
            ToolCall::HostInfo => to_json(svc.host_info().await?)?,
            ToolCall::ListDatastores => to_json(svc.list_datastore_usage().await?)?,
            ToolCall::GetDatastore(args) => {
                to_json(svc.get_datastore_usage(&args.datastore_id).await?)?
            },
            ToolCall::ListNetworks => to_json(svc.list_networks().await?)?,

            // ── Snapshots ───────────────────────────────────────────
            ToolCall::ListSnapshots(args) => to_json(svc.list_snapshots(&args.vm_id).await?)?,
            ToolCall::CreateSnapshot(args) => {
                let id = svc.create_snapshot(&args.vm_id, &args.spec()).await?;
                json!({
                    "success": true,
                    "snapshot_id": id,
                    "message": format!("Snapshot \"{}\" created for VM {}", args.name, args.vm_id),
                })
            }
            ToolCall::DeleteSnapshot(args) => {
                svc.delete_snapshot(&args.vm_id, &args.snapshot_id).await?;
                done(format!(
                    "Snapshot {} deleted from VM {}",
                    args.snapshot_id, args.vm_id
                ))
            }
            ToolCall::RevertSnapshot(args) => {
                svc.revert_to_snapshot(&args.vm_id, &args.snapshot_id)
                    .await?;
                done(format!(
                    "VM {} reverted to snapshot {}",
                    args.vm_id, args.snapshot_id
                ))
            }
        };

        Ok(payload)
    }
}

fn done(message: String) -> Value {
    json!({ "success": true, "message": message })
}

fn to_json<T: Serialize>(value: T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Internal(format!("Serialization failed: {e}")))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
