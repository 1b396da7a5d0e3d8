//! VM lifecycle management via the vSphere REST API.
//!
//! Covers listing, lookup by name, detail, hypervisor power actions and
//! the in-guest shutdown / reboot paths with their hard fallbacks.

use crate::error::{VsphereError, VsphereResult};
use crate::types::*;
use crate::vsphere::{api_path, VsphereClient};

use tracing::{info, warn};

/// High-level VM operations backed by `VsphereClient`.
pub struct VmManager<'a> {
    client: &'a VsphereClient,
}

impl<'a> VmManager<'a> {
    pub fn new(client: &'a VsphereClient) -> Self {
        Self { client }
    }

    // ── List / Get ──────────────────────────────────────────────────

    /// List every VM on the host.
    pub async fn list_vms(&self) -> VsphereResult<Vec<VmSummary>> {
        self.client.get::<Vec<VmSummary>>("/api/vcenter/vm").await
    }

    /// List VMs whose name or power state contains `filter`
    /// (case-insensitive). An empty filter matches everything.
    pub async fn list_vms_matching(&self, filter: &str) -> VsphereResult<Vec<VmSummary>> {
        let vms = self.list_vms().await?;
        Ok(filter_vms(vms, filter))
    }

    /// Full VM detail, with `power_state` taken from the live power
    /// endpoint rather than the detail document.
    pub async fn get_vm(&self, vm_id: &str) -> VsphereResult<VmInfo> {
        let mut info = self
            .client
            .get::<VmInfo>(&api_path(&["vcenter", "vm", vm_id])?)
            .await?;
        info.power_state = self.get_power_state(vm_id).await?;
        Ok(info)
    }

    pub async fn get_power_state(&self, vm_id: &str) -> VsphereResult<VmPowerState> {
        let power: PowerInfo = self
            .client
            .get(&api_path(&["vcenter", "vm", vm_id, "power"])?)
            .await?;
        Ok(power.state)
    }

    // ── Power operations ────────────────────────────────────────────

    pub async fn power_on(&self, vm_id: &str) -> VsphereResult<()> {
        self.power_action(vm_id, "start").await
    }

    /// Hard power off.
    pub async fn stop(&self, vm_id: &str) -> VsphereResult<()> {
        self.power_action(vm_id, "stop").await
    }

    pub async fn suspend(&self, vm_id: &str) -> VsphereResult<()> {
        self.power_action(vm_id, "suspend").await
    }

    /// Hard reset.
    pub async fn reset(&self, vm_id: &str) -> VsphereResult<()> {
        self.power_action(vm_id, "reset").await
    }

    /// Power a VM off. Without `force` an in-guest shutdown is tried first;
    /// if that fails the VM is stopped at the hypervisor instead.
    pub async fn power_off(&self, vm_id: &str, force: bool) -> VsphereResult<()> {
        if !force {
            match self.shutdown_guest(vm_id).await {
                Ok(()) => {
                    info!(vm = vm_id, "Guest shutdown requested");
                    return Ok(());
                }
                Err(e) => {
                    warn!(vm = vm_id, error = %e, "Guest shutdown failed, forcing power off");
                }
            }
        }
        self.stop(vm_id).await
    }

    /// Restart a VM. With `graceful` an in-guest reboot is tried first and
    /// falls back to a hard reset; otherwise the VM is reset directly.
    pub async fn restart(&self, vm_id: &str, graceful: bool) -> VsphereResult<()> {
        if graceful {
            match self.reboot_guest(vm_id).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(vm = vm_id, error = %e, "Guest reboot failed, resetting");
                }
            }
        }
        self.reset(vm_id).await
    }

    async fn power_action(&self, vm_id: &str, action: &str) -> VsphereResult<()> {
        let path = format!(
            "{}?action={action}",
            api_path(&["vcenter", "vm", vm_id, "power"])?
        );
        self.client.post_empty(&path).await
    }

    // ── Guest operations ────────────────────────────────────────────

    /// Graceful shutdown via VMware Tools.
    pub async fn shutdown_guest(&self, vm_id: &str) -> VsphereResult<()> {
        let path = format!(
            "{}?action=shutdown",
            api_path(&["vcenter", "vm", vm_id, "guest", "power"])?
        );
        self.client.post_empty(&path).await
    }

    /// Graceful reboot via VMware Tools.
    pub async fn reboot_guest(&self, vm_id: &str) -> VsphereResult<()> {
        let path = format!(
            "{}?action=reboot",
            api_path(&["vcenter", "vm", vm_id, "guest", "power"])?
        );
        self.client.post_empty(&path).await
    }

    // ── Convenience helpers ─────────────────────────────────────────

    /// Find a VM by exact name, ignoring case.
    pub async fn find_vm_by_name(&self, name: &str) -> VsphereResult<Option<VmSummary>> {
        let vms = self.list_vms().await?;
        let wanted = name.to_lowercase();
        Ok(vms.into_iter().find(|v| v.name.to_lowercase() == wanted))
    }

    /// Like [`find_vm_by_name`](Self::find_vm_by_name) but absent is an error.
    pub async fn require_vm_by_name(&self, name: &str) -> VsphereResult<VmSummary> {
        self.find_vm_by_name(name)
            .await?
            .ok_or_else(|| VsphereError::not_found(format!("VM not found: {name}")))
    }
}

/// Keep VMs whose name or power state contains `filter`, ignoring case.
pub fn filter_vms(vms: Vec<VmSummary>, filter: &str) -> Vec<VmSummary> {
    if filter.is_empty() {
        return vms;
    }
    let needle = filter.to_lowercase();
    vms.into_iter()
        .filter(|vm| {
            vm.name.to_lowercase().contains(&needle)
                || vm.power_state.as_str().to_lowercase().contains(&needle)
        })
        .collect()
}
