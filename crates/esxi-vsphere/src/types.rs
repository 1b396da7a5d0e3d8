//! Shared types for ESXi / vSphere management.
//!
//! Field names follow the wire format of the `/api` REST surface
//! (snake_case with a few odd capitalisations such as `memory_size_MiB`),
//! so values round-trip unchanged to tool callers.

use crate::error::{VsphereError, VsphereResult};

use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;
use url::Url;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Connection / Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configuration for connecting to an ESXi host or vCenter.
#[derive(Clone, Serialize, Deserialize)]
pub struct VsphereConfig {
    /// Hostname / IP (e.g. "esxi01.lab.local"), optionally with a port or
    /// a full `http(s)://` URL.
    pub host: String,
    /// Port used when `host` does not carry one (default 443)
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification (self-signed hosts)
    #[serde(default)]
    pub insecure: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 { 443 }
fn default_username() -> String { "root".into() }
fn default_timeout() -> u64 { 30 }

impl Default for VsphereConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            username: default_username(),
            password: String::new(),
            insecure: false,
            timeout_secs: default_timeout(),
        }
    }
}

impl fmt::Debug for VsphereConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VsphereConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl VsphereConfig {
    /// Base URL for API calls, without a trailing slash.
    pub fn base_url(&self) -> VsphereResult<String> {
        let raw = if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("https://{}", self.host)
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| VsphereError::connection(format!("Invalid host '{}': {e}", self.host)))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(VsphereError::connection(format!(
                "Invalid host '{}': missing hostname",
                self.host
            )));
        }
        if url.port().is_none() && self.port != default_port() {
            url.set_port(Some(self.port)).map_err(|_| {
                VsphereError::connection(format!("Cannot set port on '{}'", self.host))
            })?;
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VM Power State
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VmPowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
    #[default]
    #[serde(other)]
    Unknown,
}

impl VmPowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PoweredOn => "POWERED_ON",
            Self::PoweredOff => "POWERED_OFF",
            Self::Suspended => "SUSPENDED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Body of `GET /api/vcenter/vm/{vm}/power`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PowerInfo {
    pub state: VmPowerState,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VM Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Concise VM summary (from the list endpoint).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VmSummary {
    /// Opaque VM identifier (e.g. "vm-42" or "1")
    pub vm: String,
    pub name: String,
    #[serde(default)]
    pub power_state: VmPowerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<u32>,
    #[serde(default, rename = "memory_size_MiB", skip_serializing_if = "Option::is_none")]
    pub memory_size_mib: Option<u64>,
}

/// Full VM detail (from `GET /api/vcenter/vm/{vm}`).
///
/// `power_state` is overwritten with the live value from the power
/// endpoint by [`crate::vm::VmManager::get_vm`].
///
/// Only the fields below are kept. Other sections of the detail document
/// (`boot`, `cdroms`, `identity`, ...) are dropped on decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub power_state: VmPowerState,
    #[serde(default)]
    pub cpu: VmCpu,
    #[serde(default)]
    pub memory: VmMemory,
    #[serde(default, rename = "guest_OS", skip_serializing_if = "Option::is_none")]
    pub guest_os: Option<String>,
    #[serde(default)]
    pub hardware: VmHardware,
    #[serde(default, deserialize_with = "keyed_list")]
    pub nics: Vec<VmNic>,
    #[serde(default, deserialize_with = "keyed_list")]
    pub disks: Vec<VmDisk>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmCpu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores_per_socket: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_add_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_remove_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmMemory {
    #[serde(default, rename = "size_MiB", skip_serializing_if = "Option::is_none")]
    pub size_mib: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_add_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmHardware {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmNic {
    #[serde(default)]
    pub nic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub nic_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing: Option<VmNicBacking>,
    /// Link state, e.g. "CONNECTED"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmNicBacking {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub backing_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmDisk {
    #[serde(default)]
    pub disk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<String>,
    /// Capacity in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,
}

/// Device entries that may arrive keyed by their identifier.
pub(crate) trait DeviceId {
    fn assign_id(&mut self, id: String);
}

impl DeviceId for VmNic {
    fn assign_id(&mut self, id: String) {
        if self.nic.is_empty() {
            self.nic = id;
        }
    }
}

impl DeviceId for VmDisk {
    fn assign_id(&mut self, id: String) {
        if self.disk.is_empty() {
            self.disk = id;
        }
    }
}

/// Accepts either `[{..}, ..]` or `{"4000": {..}, ..}`, keeping document
/// order. `null` decodes as an empty list.
fn keyed_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + DeviceId,
{
    struct KeyedListVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for KeyedListVisitor<T>
    where
        T: Deserialize<'de> + DeviceId,
    {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of devices or a map of devices keyed by id")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<T>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(item) = seq.next_element()? {
                out.push(item);
            }
            Ok(out)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Vec<T>, A::Error> {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, mut item)) = map.next_entry::<String, T>()? {
                item.assign_id(key);
                out.push(item);
            }
            Ok(out)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Vec<T>, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Vec<T>, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(KeyedListVisitor(PhantomData))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Snapshots
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotInfo {
    pub snapshot: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    /// Parent snapshot; `None` for roots of the VM's snapshot forest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSnapshotSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Snapshot the VM's memory state
    #[serde(default)]
    pub memory: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Host (ESXi)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostConnectionState {
    Connected,
    Disconnected,
    NotResponding,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Entry of `GET /api/vcenter/host`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSummary {
    pub host: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connection_state: HostConnectionState,
}

/// Body of `GET /api/vcenter/host/{host}`; every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HostDetail {
    #[serde(default)]
    pub product: Option<HostProduct>,
    #[serde(default)]
    pub cpu: Option<HostCpu>,
    #[serde(default)]
    pub memory: Option<HostMemory>,
}

/// Merged host view: name from the list entry, the rest from the detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: String,
    #[serde(default)]
    pub product: HostProduct,
    #[serde(default)]
    pub cpu: HostCpu,
    #[serde(default)]
    pub memory: HostMemory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostCpu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Socket count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostMemory {
    #[serde(default, rename = "total_MiB", skip_serializing_if = "Option::is_none")]
    pub total_mib: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Datastore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatastoreInfo {
    #[serde(default)]
    pub datastore: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ds_type: Option<String>,
    /// Bytes
    #[serde(default)]
    pub free_space: u64,
    /// Bytes
    #[serde(default)]
    pub capacity: u64,
}

const GIB: f64 = (1u64 << 30) as f64;

/// A datastore plus the human-readable figures shown to tool callers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatastoreUsage {
    #[serde(flatten)]
    pub info: DatastoreInfo,
    #[serde(rename = "free_space_GB")]
    pub free_space_gb: u64,
    #[serde(rename = "capacity_GB")]
    pub capacity_gb: u64,
    /// `None` when the capacity is zero.
    pub used_percent: Option<i64>,
}

impl From<DatastoreInfo> for DatastoreUsage {
    fn from(info: DatastoreInfo) -> Self {
        let free = info.free_space as f64;
        let capacity = info.capacity as f64;
        let used_percent = if info.capacity == 0 {
            None
        } else {
            Some((((capacity - free) / capacity) * 100.0).round() as i64)
        };

        Self {
            free_space_gb: (free / GIB).round() as u64,
            capacity_gb: (capacity / GIB).round() as u64,
            used_percent,
            info,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Network
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkInfo {
    pub network: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
}
