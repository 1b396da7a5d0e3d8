//! Resource operations over the service facade.

mod common;

use common::FakeVsphere;
use esxi_vsphere::types::{CreateSnapshotSpec, VmPowerState};
use serde_json::json;

fn inventory(fake: &FakeVsphere) {
    fake.route(
        "GET",
        "/api/vcenter/vm",
        200,
        json!([
            { "vm": "vm-1", "name": "web01", "power_state": "POWERED_ON", "cpu_count": 2, "memory_size_MiB": 4096 },
            { "vm": "vm-2", "name": "DB01", "power_state": "POWERED_OFF" }
        ]),
    );
}

// ── VMs ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_vm_by_name_is_exact_and_case_insensitive() {
    let fake = FakeVsphere::start().await;
    inventory(&fake);
    let svc = fake.service();

    let hit = svc.find_vm_by_name("db01").await.unwrap().unwrap();
    assert_eq!(hit.vm, "vm-2");
    assert!(svc.find_vm_by_name("db").await.unwrap().is_none());

    let err = svc.require_vm_by_name("mail").await.unwrap_err();
    assert_eq!(err.kind(), "NotFound");
    assert_eq!(err.to_string(), "VM not found: mail");
}

#[tokio::test]
async fn list_vms_matching_filters_on_name_or_state() {
    let fake = FakeVsphere::start().await;
    inventory(&fake);
    let svc = fake.service();

    let off = svc.list_vms_matching("powered_off").await.unwrap();
    assert_eq!(off.len(), 1);
    assert_eq!(off[0].name, "DB01");
    assert_eq!(svc.list_vms().await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_vm_takes_live_power_state() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "GET",
        "/api/vcenter/vm/vm-1",
        200,
        json!({
            "name": "web01",
            "power_state": "POWERED_OFF",
            "cpu": { "count": 2, "cores_per_socket": 1 },
            "memory": { "size_MiB": 4096 },
            "guest_OS": "UBUNTU_64",
            "nics": { "4000": { "label": "Network adapter 1", "state": "CONNECTED" } },
            "disks": {}
        }),
    );
    fake.route(
        "GET",
        "/api/vcenter/vm/vm-1/power",
        200,
        json!({ "state": "POWERED_ON" }),
    );
    let svc = fake.service();

    let vm = svc.get_vm("vm-1").await.unwrap();
    assert_eq!(vm.power_state, VmPowerState::PoweredOn);
    assert_eq!(vm.memory.size_mib, Some(4096));
    assert_eq!(vm.nics[0].nic, "4000");
    assert!(vm.disks.is_empty());
}

#[tokio::test]
async fn power_off_prefers_guest_shutdown() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1/guest/power?action=shutdown",
        204,
        serde_json::Value::Null,
    );
    let svc = fake.service();

    svc.power_off_vm("vm-1", false).await.unwrap();
    assert_eq!(
        fake.hits(),
        ["POST /api/vcenter/vm/vm-1/guest/power?action=shutdown"]
    );
}

#[tokio::test]
async fn power_off_falls_back_to_hard_stop() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1/guest/power?action=shutdown",
        503,
        json!({ "error_type": "SERVICE_UNAVAILABLE", "messages": ["Tools not running"] }),
    );
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1/power?action=stop",
        204,
        serde_json::Value::Null,
    );
    let svc = fake.service();

    svc.power_off_vm("vm-1", false).await.unwrap();
    assert_eq!(
        fake.hits(),
        [
            "POST /api/vcenter/vm/vm-1/guest/power?action=shutdown",
            "POST /api/vcenter/vm/vm-1/power?action=stop"
        ]
    );
}

#[tokio::test]
async fn forced_power_off_skips_guest_shutdown() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1/power?action=stop",
        204,
        serde_json::Value::Null,
    );
    let svc = fake.service();

    svc.power_off_vm("vm-1", true).await.unwrap();
    assert_eq!(fake.hits(), ["POST /api/vcenter/vm/vm-1/power?action=stop"]);
}

#[tokio::test]
async fn hard_stop_failure_is_propagated() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1/power?action=stop",
        400,
        json!({ "error_type": "ALREADY_IN_DESIRED_STATE" }),
    );
    let svc = fake.service();

    let err = svc.power_off_vm("vm-1", true).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn restart_defaults_to_reset_and_graceful_falls_back() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1/power?action=reset",
        204,
        serde_json::Value::Null,
    );
    let svc = fake.service();

    svc.restart_vm("vm-1", false).await.unwrap();
    assert_eq!(fake.hits(), ["POST /api/vcenter/vm/vm-1/power?action=reset"]);

    // no scripted reboot route, so the guest call 404s and we reset
    svc.restart_vm("vm-1", true).await.unwrap();
    assert_eq!(
        fake.hits()[1..],
        [
            "POST /api/vcenter/vm/vm-1/guest/power?action=reboot",
            "POST /api/vcenter/vm/vm-1/power?action=reset"
        ]
    );
}

// ── Opaque identifiers ──────────────────────────────────────────────

#[tokio::test]
async fn traversal_in_vm_id_stays_in_one_segment() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1%2F..%2Fvm-2/power?action=stop",
        204,
        serde_json::Value::Null,
    );
    let svc = fake.service();

    svc.power_off_vm("vm-1/../vm-2", true).await.unwrap();
    assert_eq!(
        fake.hits(),
        ["POST /api/vcenter/vm/vm-1%2F..%2Fvm-2/power?action=stop"]
    );
    assert_eq!(fake.hit_count("POST", "/api/vcenter/vm/vm-2/power?action=stop"), 0);
}

#[tokio::test]
async fn query_characters_in_ids_are_encoded() {
    let fake = FakeVsphere::start().await;
    let svc = fake.service();

    let err = svc.get_vm("vm-1/power?x=").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(fake.hits(), ["GET /api/vcenter/vm/vm-1%2Fpower%3Fx%3D"]);

    svc.delete_snapshot("vm-1", "snap#1").await.unwrap_err();
    assert_eq!(
        fake.hits()[1],
        "DELETE /api/vcenter/vm/vm-1/snapshots/snap%231"
    );
}

#[tokio::test]
async fn dot_segment_ids_never_reach_the_host() {
    let fake = FakeVsphere::start().await;
    let svc = fake.service();

    let err = svc.power_on_vm("..").await.unwrap_err();
    assert_eq!(err.kind(), "NotFound");
    let err = svc.get_datastore(".").await.unwrap_err();
    assert_eq!(err.kind(), "NotFound");
    assert!(fake.hits().is_empty());
}

// ── Host / inventory ────────────────────────────────────────────────

#[tokio::test]
async fn host_info_merges_first_host_with_detail() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "GET",
        "/api/vcenter/host",
        200,
        json!([
            { "host": "host-9", "name": "esx01.lab", "connection_state": "CONNECTED" },
            { "host": "host-10", "name": "esx02.lab" }
        ]),
    );
    fake.route(
        "GET",
        "/api/vcenter/host/host-9",
        200,
        json!({ "product": { "name": "VMware ESXi", "version": "8.0.2" } }),
    );
    let svc = fake.service();

    let host = svc.host_info().await.unwrap();
    let v = serde_json::to_value(&host).unwrap();
    assert_eq!(v["name"], "esx01.lab");
    assert_eq!(v["product"]["version"], "8.0.2");
    assert_eq!(v["cpu"], json!({}));
    assert_eq!(v["memory"], json!({}));
}

#[tokio::test]
async fn host_info_without_hosts() {
    let fake = FakeVsphere::start().await;
    fake.route("GET", "/api/vcenter/host", 200, json!([]));
    let svc = fake.service();

    let err = svc.host_info().await.unwrap_err();
    assert_eq!(err.kind(), "NoHostsFound");
}

#[tokio::test]
async fn datastores_and_networks() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "GET",
        "/api/vcenter/datastore",
        200,
        json!([
            { "datastore": "datastore-1", "name": "ssd", "type": "VMFS",
              "free_space": 4u64 << 30, "capacity": 10u64 << 30 },
            { "datastore": "datastore-2", "name": "empty", "type": "NFS",
              "free_space": 0, "capacity": 0 }
        ]),
    );
    fake.route(
        "GET",
        "/api/vcenter/datastore/datastore-1",
        200,
        json!({ "datastore": "datastore-1", "name": "ssd", "type": "VMFS",
                "free_space": 4u64 << 30, "capacity": 10u64 << 30 }),
    );
    fake.route(
        "GET",
        "/api/vcenter/network",
        200,
        json!([{ "network": "network-1", "name": "VM Network", "type": "STANDARD_PORTGROUP" }]),
    );
    let svc = fake.service();

    let usage = svc.list_datastore_usage().await.unwrap();
    assert_eq!(usage[0].used_percent, Some(60));
    assert_eq!(usage[0].capacity_gb, 10);
    assert_eq!(usage[1].used_percent, None);

    let ds = svc.get_datastore("datastore-1").await.unwrap();
    assert_eq!(ds.ds_type.as_deref(), Some("VMFS"));

    let nets = svc.list_networks().await.unwrap();
    assert_eq!(nets[0].name, "VM Network");
}

// ── Snapshots ───────────────────────────────────────────────────────

#[tokio::test]
async fn snapshots_404_means_none() {
    let fake = FakeVsphere::start().await;
    let svc = fake.service();

    let snaps = svc.list_snapshots("vm-1").await.unwrap();
    assert!(snaps.is_empty());
    assert_eq!(fake.hit_count("GET", "/api/vcenter/vm/vm-1/snapshots"), 1);
}

#[tokio::test]
async fn snapshots_other_errors_propagate() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "GET",
        "/api/vcenter/vm/vm-1/snapshots",
        500,
        json!({ "error_type": "ERROR" }),
    );
    let svc = fake.service();

    let err = svc.list_snapshots("vm-1").await.unwrap_err();
    assert_eq!(err.kind(), "GatewayError");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn snapshots_null_body_means_none() {
    let fake = FakeVsphere::start().await;
    fake.route("GET", "/api/vcenter/vm/vm-1/snapshots", 204, serde_json::Value::Null);
    let svc = fake.service();

    assert!(svc.list_snapshots("vm-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn snapshot_create_delete_revert() {
    let fake = FakeVsphere::start().await;
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1/snapshots",
        201,
        json!({ "value": "snapshot-3" }),
    );
    fake.route(
        "DELETE",
        "/api/vcenter/vm/vm-1/snapshots/snapshot-3",
        204,
        serde_json::Value::Null,
    );
    fake.route(
        "POST",
        "/api/vcenter/vm/vm-1/snapshots/snapshot-2?action=revert",
        204,
        serde_json::Value::Null,
    );
    let svc = fake.service();

    let id = svc
        .create_snapshot(
            "vm-1",
            &CreateSnapshotSpec {
                name: "pre-upgrade".into(),
                description: String::new(),
                memory: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(id, "snapshot-3");

    svc.delete_snapshot("vm-1", "snapshot-3").await.unwrap();
    svc.revert_to_snapshot("vm-1", "snapshot-2").await.unwrap();
    assert_eq!(fake.hits().len(), 3);
}

#[tokio::test]
async fn disconnect_swallows_logout_failure() {
    let fake = FakeVsphere::start().await;
    fake.fail_logout();
    let svc = fake.service();
    svc.connect().await.unwrap();
    assert!(svc.is_connected().await);

    svc.disconnect().await;
    assert!(!svc.is_connected().await);
    assert_eq!(fake.logouts(), 1);
}
