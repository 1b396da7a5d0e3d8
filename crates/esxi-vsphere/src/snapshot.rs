//! VM snapshot management via the vSphere REST API.

use crate::error::{VsphereError, VsphereResult};
use crate::types::*;
use crate::vsphere::{api_path, VsphereClient};

use serde_json::Value;
use tracing::warn;

/// Snapshot operations on a VM.
pub struct SnapshotManager<'a> {
    client: &'a VsphereClient,
}

impl<'a> SnapshotManager<'a> {
    pub fn new(client: &'a VsphereClient) -> Self {
        Self { client }
    }

    /// List all snapshots for a VM as a flat list.
    ///
    /// Hosts without the snapshot API answer 404; that is reported as an
    /// empty list.
    pub async fn list_snapshots(&self, vm_id: &str) -> VsphereResult<Vec<SnapshotInfo>> {
        let path = api_path(&["vcenter", "vm", vm_id, "snapshots"])?;
        match self.client.get::<Option<Vec<SnapshotInfo>>>(&path).await {
            Ok(snaps) => Ok(snaps.unwrap_or_default()),
            Err(e) if e.status() == Some(404) => {
                warn!(vm = vm_id, "Snapshot API not available, returning empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Create a new snapshot and return its identifier.
    pub async fn create_snapshot(
        &self,
        vm_id: &str,
        spec: &CreateSnapshotSpec,
    ) -> VsphereResult<String> {
        let path = api_path(&["vcenter", "vm", vm_id, "snapshots"])?;
        let resp: Value = self.client.post(&path, spec).await?;
        snapshot_id_from(resp)
    }

    pub async fn delete_snapshot(&self, vm_id: &str, snapshot_id: &str) -> VsphereResult<()> {
        let path = api_path(&["vcenter", "vm", vm_id, "snapshots", snapshot_id])?;
        self.client.delete(&path).await
    }

    pub async fn revert_to_snapshot(&self, vm_id: &str, snapshot_id: &str) -> VsphereResult<()> {
        let path = format!(
            "{}?action=revert",
            api_path(&["vcenter", "vm", vm_id, "snapshots", snapshot_id])?
        );
        self.client.post_empty(&path).await
    }
}

/// Snapshots with no parent, i.e. the roots of the VM's snapshot forest.
pub fn root_snapshots(snaps: &[SnapshotInfo]) -> impl Iterator<Item = &SnapshotInfo> {
    snaps.iter().filter(|s| s.parent.is_none())
}

/// Direct children of `snapshot_id`.
pub fn child_snapshots<'s>(
    snaps: &'s [SnapshotInfo],
    snapshot_id: &'s str,
) -> impl Iterator<Item = &'s SnapshotInfo> {
    snaps
        .iter()
        .filter(move |s| s.parent.as_deref() == Some(snapshot_id))
}

/// The create call answers with either a bare id or `{"value": id}`.
fn snapshot_id_from(resp: Value) -> VsphereResult<String> {
    match resp {
        Value::String(id) => Ok(id),
        Value::Object(mut map) => match map.remove("value") {
            Some(Value::String(id)) => Ok(id),
            _ => Err(VsphereError::parse("Snapshot create response has no id")),
        },
        other => Err(VsphereError::parse(format!(
            "Unexpected snapshot create response: {other}"
        ))),
    }
}
