//! Typed tool arguments.
//!
//! A raw `(name, arguments)` pair is turned into a [`ToolCall`] before
//! anything touches the host: the name must be in the catalog, every
//! required argument must be present and non-null, and the rest must
//! deserialize into the tool's argument struct.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::catalog::ToolName;
use super::error::ToolError;
use crate::types::CreateSnapshotSpec;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ListVmsArgs {
    #[serde(default)]
    pub filter: Option<String>,
}

/// A VM named either by id or by display name.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VmRefArgs {
    #[serde(default)]
    pub vm_id: Option<String>,
    #[serde(default)]
    pub vm_name: Option<String>,
}

/// How a [`VmRefArgs`] should be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmRef<'a> {
    Id(&'a str),
    Name(&'a str),
}

impl VmRefArgs {
    /// `vm_id` wins over `vm_name`; empty strings count as absent.
    pub fn vm_ref(&self) -> Result<VmRef<'_>, ToolError> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|v| !v.is_empty())
        }

        if let Some(id) = non_empty(&self.vm_id) {
            return Ok(VmRef::Id(id));
        }
        if let Some(name) = non_empty(&self.vm_name) {
            return Ok(VmRef::Name(name));
        }
        Err(ToolError::MissingArgument("vm_id or vm_name".into()))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VmIdArgs {
    pub vm_id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PowerOffArgs {
    pub vm_id: String,
    #[serde(default)]
    pub force: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RestartArgs {
    pub vm_id: String,
    #[serde(default)]
    pub graceful: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatastoreArgs {
    pub datastore_id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreateSnapshotArgs {
    pub vm_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub memory: Option<bool>,
}

impl CreateSnapshotArgs {
    pub fn spec(&self) -> CreateSnapshotSpec {
        CreateSnapshotSpec {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            memory: self.memory.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SnapshotRefArgs {
    pub vm_id: String,
    pub snapshot_id: String,
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListVms(ListVmsArgs),
    GetVm(VmRefArgs),
    PowerOn(VmIdArgs),
    PowerOff(PowerOffArgs),
    RestartVm(RestartArgs),
    SuspendVm(VmIdArgs),
    HostInfo,
    ListDatastores,
    GetDatastore(DatastoreArgs),
    ListNetworks,
    ListSnapshots(VmIdArgs),
    CreateSnapshot(CreateSnapshotArgs),
    DeleteSnapshot(SnapshotRefArgs),
    RevertSnapshot(SnapshotRefArgs),
}

impl ToolCall {
    /// Validate `arguments` for the tool called `name`.
    ///
    /// `null` arguments are treated as `{}`.
    pub fn parse(name: &str, arguments: Value) -> Result<Self, ToolError> {
        let tool: ToolName = name.parse()?;

        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "{tool}: arguments must be an object, got {}",
                    json_type(&other)
                )))
            }
        };

        for required in tool.required_args() {
            if args.get(*required).map_or(true, Value::is_null) {
                return Err(ToolError::MissingArgument((*required).to_string()));
            }
        }

        let args = Value::Object(args);
        Ok(match tool {
            ToolName::ListVms => Self::ListVms(typed(tool, args)?),
            ToolName::GetVm => Self::GetVm(typed(tool, args)?),
            ToolName::PowerOn => Self::PowerOn(typed(tool, args)?),
            ToolName::PowerOff => Self::PowerOff(typed(tool, args)?),
            ToolName::RestartVm => Self::RestartVm(typed(tool, args)?),
            ToolName::SuspendVm => Self::SuspendVm(typed(tool, args)?),
            ToolName::HostInfo => Self::HostInfo,
            ToolName::ListDatastores => Self::ListDatastores,
            ToolName::GetDatastore => Self::GetDatastore(typed(tool, args)?),
            ToolName::ListNetworks => Self::ListNetworks,
            ToolName::ListSnapshots => Self::ListSnapshots(typed(tool, args)?),
            ToolName::CreateSnapshot => Self::CreateSnapshot(typed(tool, args)?),
            ToolName::DeleteSnapshot => Self::DeleteSnapshot(typed(tool, args)?),
            ToolName::RevertSnapshot => Self::RevertSnapshot(typed(tool, args)?),
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::ListVms(_) => ToolName::ListVms,
            Self::GetVm(_) => ToolName::GetVm,
            Self::PowerOn(_) => ToolName::PowerOn,
            Self::PowerOff(_) => ToolName::PowerOff,
            Self::RestartVm(_) => ToolName::RestartVm,
            Self::SuspendVm(_) => ToolName::SuspendVm,
            Self::HostInfo => ToolName::HostInfo,
            Self::ListDatastores => ToolName::ListDatastores,
            Self::GetDatastore(_) => ToolName::GetDatastore,
            Self::ListNetworks => ToolName::ListNetworks,
            Self::ListSnapshots(_) => ToolName::ListSnapshots,
            Self::CreateSnapshot(_) => ToolName::CreateSnapshot,
            Self::DeleteSnapshot(_) => ToolName::DeleteSnapshot,
            Self::RevertSnapshot(_) => ToolName::RevertSnapshot,
        }
    }
}

fn typed<T: DeserializeOwned>(tool: ToolName, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(format!("{tool}: {e}")))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
