/*!
 * Hierarchy Scenario Tests
 * Host → Vm → Snapshot open and close sequences end to end
 */

use crate::{fixture, BUILD, DB, WEB};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use vix_runtime::native::constants::*;
use vix_runtime::{
    ConnectParams, ErrorKind, Host, LifecycleState, NativeHandle, Resource, Runtime, SimulatedHost,
    SnapshotParams,
};

#[test]
fn test_full_scenario() {
    let (sim, runtime) = fixture();

    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    assert_eq!(host.state(), LifecycleState::Open);

    let vm = host.open_vm(WEB).unwrap();
    assert_eq!(host.open_vms().unwrap(), vec![vm.id()]);
    assert_eq!(vm.host(), Some(host.id()));
    assert_eq!(vm.vmx_path().as_deref(), Some(WEB));

    let first = vm.create_snapshot(&SnapshotParams::named("first")).unwrap();
    let second = vm.create_snapshot(&SnapshotParams::named("second")).unwrap();
    assert_eq!(vm.open_snapshots().unwrap(), vec![second.id(), first.id()]);
    assert_eq!(first.vm(), Some(vm.id()));

    let report = vm.close().unwrap();
    assert_eq!(report.resource, vm.id());
    assert_eq!(report.children_closed, 2);
    assert!(report.is_clean());

    assert!(first.is_closed());
    assert!(second.is_closed());
    assert!(vm.is_closed());
    assert_eq!(first.handle(), NativeHandle::INVALID);
    assert_eq!(vm.open_snapshots().unwrap(), Vec::new());
    assert_eq!(host.open_vms().unwrap(), Vec::new());
    assert_eq!(vm.host(), None);
    assert_eq!(first.vm(), None);

    assert_eq!(host.state(), LifecycleState::Open);
    assert_eq!(sim.live_handles(), vec![host.handle()]);

    let report = host.close().unwrap();
    assert_eq!(report.children_closed, 0);
    assert!(host.is_closed());
    assert!(sim.live_handles().is_empty());
}

#[test]
fn test_children_released_most_recent_first() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();
    let first = vm.create_snapshot(&SnapshotParams::named("first")).unwrap();
    let second = vm.create_snapshot(&SnapshotParams::named("second")).unwrap();
    let (vm_handle, first_handle, second_handle) = (vm.handle(), first.handle(), second.handle());

    // Live handles as seen at the start of each release
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer = Arc::downgrade(&sim);
    sim.on_call(
        "release_handle",
        Arc::new(move || {
            if let Some(sim) = observer.upgrade() {
                sink.lock().push(sim.live_handles());
            }
        }),
    );

    vm.close().unwrap();
    sim.clear_hook("release_handle");

    let seen = seen.lock();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].contains(&second_handle));
    assert!(!seen[1].contains(&second_handle) && seen[1].contains(&first_handle));
    assert!(!seen[2].contains(&first_handle) && seen[2].contains(&vm_handle));
}

#[test]
fn test_host_close_cascades_through_vms() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    let web = host.open_vm(WEB).unwrap();
    let db = host.open_vm(DB).unwrap();
    let snap = web.create_snapshot(&SnapshotParams::named("pre-upgrade")).unwrap();
    assert_eq!(host.open_vms().unwrap(), vec![db.id(), web.id()]);

    let report = host.close().unwrap();
    assert_eq!(report.children_closed, 3);
    assert!(report.is_clean());
    assert!(web.is_closed() && db.is_closed() && snap.is_closed());
    assert!(sim.live_handles().is_empty());

    // Entries stay until their client handles go away
    assert_eq!(runtime.live_resources(), 4);
    assert_eq!(runtime.open_resources(), 0);
    drop(snap);
    drop(web);
    drop(db);
    drop(host);
    assert_eq!(runtime.live_resources(), 0);
}

#[test]
fn test_double_close_is_client_error() {
    let (_sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(BUILD).unwrap();

    vm.close().unwrap();
    let err = vm.close().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClientProgrammer);
    assert_eq!(vm.state(), LifecycleState::Closed);

    host.close().unwrap();
    assert!(host.close().unwrap_err().is_client_error());
}

#[test]
fn test_operations_on_closed_resource_fail() {
    let (_sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(BUILD).unwrap();
    vm.close().unwrap();

    assert!(vm.power_on().unwrap_err().is_client_error());
    assert!(vm.property(VIX_PROPERTY_VM_POWER_STATE).unwrap_err().is_client_error());
    assert!(vm
        .create_snapshot(&SnapshotParams::default())
        .unwrap_err()
        .is_client_error());
}

#[test]
fn test_open_child_under_closed_parent() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    host.close().unwrap();

    let err = host.open_vm(WEB).unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(runtime.live_resources(), 1);
    assert_eq!(sim.call_count("open_vm"), 0);
    assert!(sim.live_handles().is_empty());
}

#[test]
fn test_failed_open_leaves_nothing_behind() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    let err = host.open_vm("/vms/missing.vmx").unwrap_err();
    assert_eq!(err.native_code(), Some(VIX_E_VM_NOT_FOUND));
    assert_eq!(host.open_vms().unwrap(), Vec::new());
    assert_eq!(runtime.live_resources(), 1);
    assert_eq!(sim.live_handles(), vec![host.handle()]);
}

#[test]
fn test_connect_named_host_without_credentials() {
    let sim = Arc::new(SimulatedHost::builder().with_credentials("root", "secret").build());
    let runtime = Runtime::new(sim.clone());

    let params = ConnectParams::local().with_host("esx01.lab", 902);
    let err = Host::connect(&runtime, &params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Security);
    assert_eq!(err.native_code(), Some(VIX_E_HOST_USER_PERMISSIONS));
    assert_eq!(runtime.live_resources(), 0);

    let host = Host::connect(&runtime, &params.with_credentials("root", "secret")).unwrap();
    assert_eq!(host.host_name().as_deref(), Some("esx01.lab"));
    assert_eq!(sim.live_handles(), vec![host.handle()]);
}
