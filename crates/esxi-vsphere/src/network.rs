//! Network inventory via the vSphere REST API.

use crate::error::VsphereResult;
use crate::types::*;
use crate::vsphere::VsphereClient;

/// Network operations.
pub struct NetworkManager<'a> {
    client: &'a VsphereClient,
}

impl<'a> NetworkManager<'a> {
    pub fn new(client: &'a VsphereClient) -> Self {
        Self { client }
    }

    /// Standard portgroups, distributed portgroups and opaque networks.
    pub async fn list_networks(&self) -> VsphereResult<Vec<NetworkInfo>> {
        self.client.get::<Vec<NetworkInfo>>("/api/vcenter/network").await
    }
}
