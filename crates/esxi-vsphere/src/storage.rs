//! Datastore inventory via the vSphere REST API.

use crate::error::VsphereResult;
use crate::types::*;
use crate::vsphere::{api_path, VsphereClient};

/// Datastore operations.
pub struct StorageManager<'a> {
    client: &'a VsphereClient,
}

impl<'a> StorageManager<'a> {
    pub fn new(client: &'a VsphereClient) -> Self {
        Self { client }
    }

    pub async fn list_datastores(&self) -> VsphereResult<Vec<DatastoreInfo>> {
        self.client
            .get::<Vec<DatastoreInfo>>("/api/vcenter/datastore")
            .await
    }

    pub async fn get_datastore(&self, ds_id: &str) -> VsphereResult<DatastoreInfo> {
        self.client
            .get::<DatastoreInfo>(&api_path(&["vcenter", "datastore", ds_id])?)
            .await
    }

    /// Datastores with GB and percent figures attached.
    pub async fn list_datastore_usage(&self) -> VsphereResult<Vec<DatastoreUsage>> {
        let stores = self.list_datastores().await?;
        Ok(stores.into_iter().map(DatastoreUsage::from).collect())
    }

    pub async fn get_datastore_usage(&self, ds_id: &str) -> VsphereResult<DatastoreUsage> {
        self.get_datastore(ds_id).await.map(DatastoreUsage::from)
    }
}
