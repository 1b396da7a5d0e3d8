//! ESXi host inventory via the vSphere REST API.

use crate::error::{VsphereError, VsphereResult};
use crate::types::*;
use crate::vsphere::{api_path, VsphereClient};

/// Host operations.
pub struct HostManager<'a> {
    client: &'a VsphereClient,
}

impl<'a> HostManager<'a> {
    pub fn new(client: &'a VsphereClient) -> Self {
        Self { client }
    }

    pub async fn list_hosts(&self) -> VsphereResult<Vec<HostSummary>> {
        self.client.get::<Vec<HostSummary>>("/api/vcenter/host").await
    }

    /// Name of the first listed host merged with its product, CPU and
    /// memory details. Sections the host does not report come back empty.
    pub async fn host_info(&self) -> VsphereResult<HostInfo> {
        let hosts = self.list_hosts().await?;
        let first = hosts.into_iter().next().ok_or(VsphereError::NoHostsFound)?;

        let detail: HostDetail = self
            .client
            .get(&api_path(&["vcenter", "host", first.host.as_str()])?)
            .await?;

        Ok(merge_host(first, detail))
    }
}

fn merge_host(summary: HostSummary, detail: HostDetail) -> HostInfo {
    HostInfo {
        name: summary.name,
        product: detail.product.unwrap_or_default(),
        cpu: detail.cpu.unwrap_or_default(),
        memory: detail.memory.unwrap_or_default(),
    }
}
