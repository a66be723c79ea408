/*!
 * Cascade Tests
 * Teardown failures, destructor teardown and leak checks
 */

use crate::{fixture, DB, WEB};
use pretty_assertions::assert_eq;
use vix_runtime::native::constants::*;
use vix_runtime::{ConnectParams, ErrorKind, Host, NativeHandle, Resource, SnapshotParams};

#[test]
fn test_cascade_continues_past_release_failure() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let web = host.open_vm(WEB).unwrap();
    let db = host.open_vm(DB).unwrap();
    let snap = web.create_snapshot(&SnapshotParams::named("stuck")).unwrap();
    let stuck = snap.handle();
    sim.fail_release(stuck, VIX_E_OBJECT_IS_BUSY);

    let report = host.close().unwrap();
    assert_eq!(report.children_closed, 3);
    assert_eq!(report.suppressed.len(), 1);
    assert_eq!(report.suppressed[0].resource, snap.id());
    assert_eq!(report.suppressed[0].error.native_code(), Some(VIX_E_OBJECT_IS_BUSY));
    assert!(!report.is_clean());

    // The failed node is still forced closed and untracked
    assert!(snap.is_closed());
    assert_eq!(snap.handle(), NativeHandle::INVALID);
    assert_eq!(web.open_snapshots().unwrap(), Vec::new());
    assert_eq!(host.open_vms().unwrap(), Vec::new());
    assert!(web.is_closed() && db.is_closed() && host.is_closed());

    // Only the handle the native side refused to release is left over
    assert_eq!(sim.live_handles(), vec![stuck]);
}

#[test]
fn test_direct_close_failure_still_unlinks() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();
    sim.fail_release(vm.handle(), VIX_E_OBJECT_IS_BUSY);

    let err = vm.close().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Native);
    assert_eq!(err.native_code(), Some(VIX_E_OBJECT_IS_BUSY));

    assert!(vm.is_closed());
    assert_eq!(vm.handle(), NativeHandle::INVALID);
    assert_eq!(vm.host(), None);
    assert_eq!(host.open_vms().unwrap(), Vec::new());
    assert!(vm.close().unwrap_err().is_client_error());
}

#[test]
fn test_drop_releases_everything() {
    let (sim, runtime) = fixture();
    {
        let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
        let vm = host.open_vm(WEB).unwrap();
        let _first = vm.create_snapshot(&SnapshotParams::named("first")).unwrap();
        let _second = vm.create_snapshot(&SnapshotParams::named("second")).unwrap();
        assert_eq!(sim.live_handles().len(), 4);
    }

    assert!(sim.live_handles().is_empty());
    assert_eq!(runtime.live_resources(), 0);
    // Snapshots were only released, never removed from the VM
    assert_eq!(sim.snapshot_names(WEB), vec!["first".to_string(), "second".to_string()]);
}

#[test]
fn test_dropping_host_first_closes_children() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();
    let snap = vm.create_snapshot(&SnapshotParams::default()).unwrap();

    drop(host);
    assert!(vm.is_closed());
    assert!(snap.is_closed());
    assert!(sim.live_handles().is_empty());
    assert!(vm.power_off().unwrap_err().is_client_error());

    drop(vm);
    drop(snap);
    assert_eq!(runtime.live_resources(), 0);
}

#[test]
fn test_drop_suppresses_release_failure() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();
    let handle = vm.handle();
    sim.fail_release(handle, VIX_E_FAIL);

    drop(vm);
    assert_eq!(host.open_vms().unwrap(), Vec::new());
    assert_eq!(runtime.live_resources(), 1);
    assert!(sim.is_live(handle));
}

#[test]
fn test_explicit_close_then_drop() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();

    vm.close().unwrap();
    let releases = sim.call_count("release_handle");
    drop(vm);

    assert_eq!(sim.call_count("release_handle"), releases);
    assert_eq!(runtime.live_resources(), 1);
    host.close().unwrap();
}

#[test]
fn test_root_snapshots_are_tracked() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();
    drop(vm.create_snapshot(&SnapshotParams::named("base")).unwrap());
    drop(vm.create_snapshot(&SnapshotParams::named("patched")).unwrap());
    assert_eq!(vm.root_snapshot_count().unwrap(), 2);

    let roots = vm.root_snapshots().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(vm.open_snapshots().unwrap(), vec![roots[1].id(), roots[0].id()]);
    assert_eq!(roots[0].display_name().unwrap().as_deref(), Some("base"));

    let report = vm.close().unwrap();
    assert_eq!(report.children_closed, 2);
    assert!(roots.iter().all(|snap| snap.is_closed()));
    assert_eq!(sim.live_handles(), vec![host.handle()]);
}

#[test]
fn test_root_snapshots_all_or_nothing() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();
    drop(vm.create_snapshot(&SnapshotParams::named("base")).unwrap());
    sim.fail_next("root_snapshot", VIX_E_OBJECT_IS_BUSY);

    let err = vm.root_snapshots().unwrap_err();
    assert_eq!(err.native_code(), Some(VIX_E_OBJECT_IS_BUSY));
    assert_eq!(vm.open_snapshots().unwrap(), Vec::new());
    assert_eq!(runtime.live_resources(), 2);
    assert_eq!(sim.live_handles(), vec![host.handle(), vm.handle()]);
}
