//! Aggregate service facade for the ESXi crate.
//!
//! `EsxiService` owns the `VsphereClient` and exposes every domain
//! operation. Concurrent tool calls share it as
//! `EsxiServiceState = Arc<EsxiService>`; the session manager inside the
//! client does its own locking, so there is no outer mutex.

use crate::error::VsphereResult;
use crate::host::HostManager;
use crate::network::NetworkManager;
use crate::snapshot::SnapshotManager;
use crate::storage::StorageManager;
use crate::types::*;
use crate::vm::VmManager;
use crate::vsphere::VsphereClient;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared handle passed to the dispatcher and the HTTP server.
pub type EsxiServiceState = Arc<EsxiService>;

/// Top-level service that aggregates all ESXi subsystems.
#[derive(Debug)]
pub struct EsxiService {
    client: VsphereClient,
    config: VsphereConfigSafe,
}

impl EsxiService {
    /// Build the service. No session is opened until the first call.
    pub fn new(config: &VsphereConfig) -> VsphereResult<Self> {
        let client = VsphereClient::new(config)?;
        Ok(Self {
            client,
            config: VsphereConfigSafe::from(config),
        })
    }

    pub fn into_state(self) -> EsxiServiceState {
        Arc::new(self)
    }

    /// Current config (without password).
    pub fn get_config(&self) -> &VsphereConfigSafe {
        &self.config
    }

    // ── Connection ──────────────────────────────────────────────────

    /// Log in eagerly, e.g. to validate credentials at startup.
    pub async fn connect(&self) -> VsphereResult<()> {
        self.client.session().authenticate().await?;
        info!(host = %self.config.host, "Connected to ESXi");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.client.session().is_authenticated().await
    }

    /// Best-effort logout; the session is gone afterwards either way.
    pub async fn disconnect(&self) {
        self.client.logout().await;
    }

    // ── VM operations ───────────────────────────────────────────────

    pub async fn list_vms(&self) -> VsphereResult<Vec<VmSummary>> {
        VmManager::new(&self.client).list_vms().await
    }

    pub async fn list_vms_matching(&self, filter: &str) -> VsphereResult<Vec<VmSummary>> {
        VmManager::new(&self.client).list_vms_matching(filter).await
    }

    pub async fn find_vm_by_name(&self, name: &str) -> VsphereResult<Option<VmSummary>> {
        VmManager::new(&self.client).find_vm_by_name(name).await
    }

    pub async fn require_vm_by_name(&self, name: &str) -> VsphereResult<VmSummary> {
        VmManager::new(&self.client).require_vm_by_name(name).await
    }

    pub async fn get_vm(&self, vm_id: &str) -> VsphereResult<VmInfo> {
        VmManager::new(&self.client).get_vm(vm_id).await
    }

    pub async fn power_on_vm(&self, vm_id: &str) -> VsphereResult<()> {
        VmManager::new(&self.client).power_on(vm_id).await
    }

    pub async fn power_off_vm(&self, vm_id: &str, force: bool) -> VsphereResult<()> {
        VmManager::new(&self.client).power_off(vm_id, force).await
    }

    pub async fn restart_vm(&self, vm_id: &str, graceful: bool) -> VsphereResult<()> {
        VmManager::new(&self.client).restart(vm_id, graceful).await
    }

    pub async fn suspend_vm(&self, vm_id: &str) -> VsphereResult<()> {
        VmManager::new(&self.client).suspend(vm_id).await
    }

    // ── Host / inventory ────────────────────────────────────────────

    pub async fn host_info(&self) -> VsphereResult<HostInfo> {
        HostManager::new(&self.client).host_info().await
    }

    pub async fn list_hosts(&self) -> VsphereResult<Vec<HostSummary>> {
        HostManager::new(&self.client).list_hosts().await
    }

    pub async fn list_datastores(&self) -> VsphereResult<Vec<DatastoreInfo>> {
        StorageManager::new(&self.client).list_datastores().await
    }

    pub async fn list_datastore_usage(&self) -> VsphereResult<Vec<DatastoreUsage>> {
        StorageManager::new(&self.client).list_datastore_usage().await
    }

    pub async fn get_datastore(&self, ds_id: &str) -> VsphereResult<DatastoreInfo> {
        StorageManager::new(&self.client).get_datastore(ds_id).await
    }

    pub async fn get_datastore_usage(&self, ds_id: &str) -> VsphereResult<DatastoreUsage> {
        StorageManager::new(&self.client).get_datastore_usage(ds_id).await
    }

    pub async fn list_networks(&self) -> VsphereResult<Vec<NetworkInfo>> {
        NetworkManager::new(&self.client).list_networks().await
    }

    // ── Snapshots ───────────────────────────────────────────────────

    pub async fn list_snapshots(&self, vm_id: &str) -> VsphereResult<Vec<SnapshotInfo>> {
        SnapshotManager::new(&self.client).list_snapshots(vm_id).await
    }

    pub async fn create_snapshot(
        &self,
        vm_id: &str,
        spec: &CreateSnapshotSpec,
    ) -> VsphereResult<String> {
        SnapshotManager::new(&self.client)
            .create_snapshot(vm_id, spec)
            .await
    }

    pub async fn delete_snapshot(&self, vm_id: &str, snapshot_id: &str) -> VsphereResult<()> {
        SnapshotManager::new(&self.client)
            .delete_snapshot(vm_id, snapshot_id)
            .await
    }

    pub async fn revert_to_snapshot(&self, vm_id: &str, snapshot_id: &str) -> VsphereResult<()> {
        SnapshotManager::new(&self.client)
            .revert_to_snapshot(vm_id, snapshot_id)
            .await
    }
}

/// Config snapshot safe to expose (no password).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VsphereConfigSafe {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub insecure: bool,
}

impl From<&VsphereConfig> for VsphereConfigSafe {
    fn from(c: &VsphereConfig) -> Self {
        Self {
            host: c.host.clone(),
            port: c.port,
            username: c.username.clone(),
            insecure: c.insecure,
        }
    }
}
