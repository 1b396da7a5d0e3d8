//! The fixed catalog of ESXi tools and their input schemas.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use super::error::ToolError;

/// Every tool the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListVms,
    GetVm,
    PowerOn,
    PowerOff,
    RestartVm,
    SuspendVm,
    HostInfo,
    ListDatastores,
    GetDatastore,
    ListNetworks,
    ListSnapshots,
    CreateSnapshot,
    DeleteSnapshot,
    RevertSnapshot,
}

impl ToolName {
    /// Catalog order.
    pub const ALL: [ToolName; 14] = [
        Self::ListVms,
        Self::GetVm,
        Self::PowerOn,
        Self::PowerOff,
        Self::RestartVm,
        Self::SuspendVm,
        Self::HostInfo,
        Self::ListDatastores,
        Self::GetDatastore,
        Self::ListNetworks,
        Self::ListSnapshots,
        Self::CreateSnapshot,
        Self::DeleteSnapshot,
        Self::RevertSnapshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListVms => "esxi_list_vms",
            Self::GetVm => "esxi_get_vm",
            Self::PowerOn => "esxi_power_on",
            Self::PowerOff => "esxi_power_off",
            Self::RestartVm => "esxi_restart_vm",
            Self::SuspendVm => "esxi_suspend_vm",
            Self::HostInfo => "esxi_host_info",
            Self::ListDatastores => "esxi_list_datastores",
            Self::GetDatastore => "esxi_get_datastore",
            Self::ListNetworks => "esxi_list_networks",
            Self::ListSnapshots => "esxi_list_snapshots",
            Self::CreateSnapshot => "esxi_create_snapshot",
            Self::DeleteSnapshot => "esxi_delete_snapshot",
            Self::RevertSnapshot => "esxi_revert_snapshot",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ListVms => "List all VMs on the ESXi host with their power state",
            Self::GetVm => "Get detailed information about a specific VM",
            Self::PowerOn => "Power on a VM",
            Self::PowerOff => {
                "Power off a VM. Uses graceful shutdown if VMware Tools is installed, otherwise forces power off"
            }
            Self::RestartVm => "Restart a VM",
            Self::SuspendVm => "Suspend a VM",
            Self::HostInfo => "Get ESXi host information including CPU, memory, and version",
            Self::ListDatastores => "List all datastores with capacity and usage information",
            Self::GetDatastore => "Get details of a single datastore",
            Self::ListNetworks => "List all networks and port groups",
            Self::ListSnapshots => "List all snapshots of a VM",
            Self::CreateSnapshot => "Create a snapshot of a VM",
            Self::DeleteSnapshot => "Delete a snapshot from a VM",
            Self::RevertSnapshot => "Revert a VM to a specific snapshot",
        }
    }

    /// Arguments that must be present and non-null.
    pub fn required_args(&self) -> &'static [&'static str] {
        match self {
            Self::PowerOn
            | Self::PowerOff
            | Self::RestartVm
            | Self::SuspendVm
            | Self::ListSnapshots => &["vm_id"],
            Self::GetDatastore => &["datastore_id"],
            Self::CreateSnapshot => &["vm_id", "name"],
            Self::DeleteSnapshot | Self::RevertSnapshot => &["vm_id", "snapshot_id"],
            Self::ListVms
            | Self::GetVm
            | Self::HostInfo
            | Self::ListDatastores
            | Self::ListNetworks => &[],
        }
    }

    /// `(name, type, description)` for every declared property.
    fn properties(&self) -> &'static [(&'static str, &'static str, &'static str)] {
        match self {
            Self::ListVms => &[(
                "filter",
                "string",
                "Filter VMs by name or power state (optional)",
            )],
            Self::GetVm => &[
                ("vm_id", "string", "VM identifier (e.g., vm-1)"),
                ("vm_name", "string", "VM name (alternative to vm_id)"),
            ],
            Self::PowerOn => &[("vm_id", "string", "VM identifier to power on")],
            Self::PowerOff => &[
                ("vm_id", "string", "VM identifier to power off"),
                (
                    "force",
                    "boolean",
                    "Force power off without graceful shutdown (default: false)",
                ),
            ],
            Self::RestartVm => &[
                ("vm_id", "string", "VM identifier to restart"),
                (
                    "graceful",
                    "boolean",
                    "Use graceful reboot via VMware Tools if available (default: false)",
                ),
            ],
            Self::SuspendVm => &[("vm_id", "string", "VM identifier to suspend")],
            Self::HostInfo | Self::ListDatastores | Self::ListNetworks => &[],
            Self::GetDatastore => &[("datastore_id", "string", "Datastore identifier")],
            Self::ListSnapshots => &[("vm_id", "string", "VM identifier")],
            Self::CreateSnapshot => &[
                ("vm_id", "string", "VM identifier"),
                ("name", "string", "Snapshot name"),
                ("description", "string", "Snapshot description (optional)"),
                (
                    "memory",
                    "boolean",
                    "Include memory state in snapshot (default: false)",
                ),
            ],
            Self::DeleteSnapshot => &[
                ("vm_id", "string", "VM identifier"),
                ("snapshot_id", "string", "Snapshot identifier to delete"),
            ],
            Self::RevertSnapshot => &[
                ("vm_id", "string", "VM identifier"),
                ("snapshot_id", "string", "Snapshot identifier to revert to"),
            ],
        }
    }

    /// JSON Schema of the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, ty, description) in self.properties() {
            properties.insert(
                (*name).to_string(),
                json!({ "type": ty, "description": description }),
            );
        }

        let mut schema = json!({ "type": "object", "properties": properties });
        let required = self.required_args();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.as_str(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Catalog entry as served by `tools/list`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The full catalog, built once.
pub fn catalog() -> &'static [ToolDescriptor] {
    static CATALOG: OnceLock<Vec<ToolDescriptor>> = OnceLock::new();
    CATALOG.get_or_init(|| ToolName::ALL.iter().map(ToolName::descriptor).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_round_trip_and_are_unique() {
        let mut seen = HashSet::new();
        for tool in ToolName::ALL {
            assert!(seen.insert(tool.as_str()));
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
        assert_eq!(catalog().len(), ToolName::ALL.len());
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "esxi_format_disk".parse::<ToolName>().unwrap_err();
        assert_eq!(err.kind(), "UnknownTool");
    }

    #[test]
    fn required_args_are_declared_properties() {
        for tool in ToolName::ALL {
            let schema = tool.input_schema();
            for arg in tool.required_args() {
                assert!(
                    schema["properties"].get(*arg).is_some(),
                    "{tool}: {arg} missing from properties"
                );
            }
        }
    }

    #[test]
    fn power_off_schema() {
        let schema = ToolName::PowerOff.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["vm_id"]));
        assert_eq!(schema["properties"]["force"]["type"], "boolean");
    }

    #[test]
    fn argless_tools_have_no_required_list() {
        let schema = ToolName::HostInfo.input_schema();
        assert_eq!(schema["properties"], json!({}));
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn descriptor_serializes_input_schema_camel_case() {
        let v = serde_json::to_value(ToolName::CreateSnapshot.descriptor()).unwrap();
        assert_eq!(v["name"], "esxi_create_snapshot");
        assert_eq!(v["inputSchema"]["required"], json!(["vm_id", "name"]));
    }
}
