/*!
 * VM Operation Tests
 * Power, guest tools, guest sessions and snapshot management
 */

use crate::{fixture, BUILD, DB, WEB};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use vix_runtime::native::constants::*;
use vix_runtime::{
    ConnectParams, ErrorKind, Host, PropertyValue, Resource, Runtime, SimulatedHost, SnapshotParams,
    Timeout,
};

#[test]
fn test_power_cycle() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(BUILD).unwrap();

    vm.power_on().unwrap();
    assert!(sim.is_running(BUILD));
    assert_eq!(
        vm.property(VIX_PROPERTY_VM_POWER_STATE).unwrap(),
        PropertyValue::Int(VIX_POWERSTATE_POWERED_ON)
    );

    vm.reset().unwrap();
    vm.suspend().unwrap();
    assert!(!sim.is_running(BUILD));

    let err = vm.power_off().unwrap_err();
    assert_eq!(err.native_code(), Some(VIX_E_VM_NOT_RUNNING));
}

#[test]
fn test_upgrade_requires_powered_off() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();

    assert_eq!(vm.upgrade_virtual_hardware().unwrap_err().native_code(), Some(VIX_E_VM_IS_RUNNING));
    vm.power_off().unwrap();
    vm.upgrade_virtual_hardware().unwrap();
    assert_eq!(sim.hardware_version(WEB), Some(5));
}

#[test]
fn test_wait_for_tools() {
    let (_sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(DB).unwrap();

    assert!(vm.wait_for_tools_in_guest(Timeout::Seconds(5)).unwrap());
    assert!(vm.wait_for_tools().unwrap());
}

#[test]
fn test_wait_for_tools_not_installed() {
    let sim = Arc::new(SimulatedHost::builder().with_vm_without_tools("/vms/bare.vmx").build());
    let runtime = Runtime::new(sim.clone());
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm("/vms/bare.vmx").unwrap();
    vm.power_on().unwrap();

    // A bounded wait ends without the tools coming up
    assert!(!vm.wait_for_tools_in_guest(Timeout::Seconds(1)).unwrap());

    let err = vm.wait_for_tools_in_guest(Timeout::Infinite).unwrap_err();
    assert_eq!(err.native_code(), Some(VIX_E_TIMEOUT_WAITING_FOR_TOOLS));
}

#[test]
fn test_guest_session() {
    let sim = Arc::new(
        SimulatedHost::builder()
            .with_running_vm(WEB)
            .with_guest_file(WEB, "/usr/bin/uptime")
            .with_guest_credentials("ops", "pa55")
            .build(),
    );
    let runtime = Runtime::new(sim.clone());
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();

    // Nothing guest-side works before a login
    let err = vm.run_program_in_guest("/usr/bin/uptime", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Security);

    let err = vm.login_in_guest("ops", "wrong", 0).unwrap_err();
    assert_eq!(err.native_code(), Some(VIX_E_GUEST_USER_PERMISSIONS));

    vm.login_in_guest("ops", "pa55", 0).unwrap();
    vm.run_program_in_guest("/usr/bin/uptime", "-p").unwrap();
    vm.copy_file_from_host_to_guest("/tmp/motd", "/etc/motd").unwrap();
    assert!(sim.guest_file_exists(WEB, "/etc/motd"));
    vm.copy_file_from_guest_to_host("/etc/motd", "/tmp/motd.copy").unwrap();

    let err = vm.copy_file_from_guest_to_host("/etc/shadow", "/tmp/shadow").unwrap_err();
    assert_eq!(err.native_code(), Some(VIX_E_FILE_NOT_FOUND));
    let err = vm.run_program_in_guest("/usr/bin/missing", "").unwrap_err();
    assert_eq!(err.native_code(), Some(VIX_E_PROGRAM_NOT_STARTED));
}

#[test]
fn test_install_tools_requires_running_vm() {
    let (_sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(BUILD).unwrap();

    assert_eq!(vm.install_tools().unwrap_err().native_code(), Some(VIX_E_VM_NOT_RUNNING));
    vm.power_on().unwrap();
    vm.install_tools().unwrap();
}

#[test]
fn test_revert_and_remove_snapshot() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();
    let snap = vm
        .create_snapshot(&SnapshotParams::named("running").with_description("before power off"))
        .unwrap();
    assert_eq!(
        snap.property(VIX_PROPERTY_SNAPSHOT_DESCRIPTION).unwrap().as_str(),
        Some("before power off")
    );

    vm.power_off().unwrap();
    vm.revert_to_snapshot(&snap).unwrap();
    assert!(sim.is_running(WEB));

    vm.remove_snapshot(&snap).unwrap();
    assert!(sim.snapshot_names(WEB).is_empty());

    // Removing the snapshot on the host leaves the wrapper open
    assert!(!snap.is_closed());
    assert_eq!(vm.open_snapshots().unwrap(), vec![snap.id()]);
    snap.close().unwrap();
    assert_eq!(vm.open_snapshots().unwrap(), Vec::new());
}

#[test]
fn test_snapshot_from_another_runtime_is_rejected() {
    let (_sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();

    let (_other_sim, other_runtime) = fixture();
    let other_host = Host::connect(&other_runtime, &ConnectParams::local()).unwrap();
    let other_vm = other_host.open_vm(WEB).unwrap();
    let foreign = other_vm.create_snapshot(&SnapshotParams::default()).unwrap();

    assert!(vm.revert_to_snapshot(&foreign).unwrap_err().is_client_error());
    assert!(vm.remove_snapshot(&foreign).unwrap_err().is_client_error());
}

#[test]
fn test_delete_keeps_session_open() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(BUILD).unwrap();

    vm.delete().unwrap();
    assert!(!sim.is_registered(BUILD));
    assert!(!vm.is_closed());
    vm.close().unwrap();
}

#[test]
fn test_register_and_unregister() {
    let (sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    host.register_vm("/vms/new/new.vmx").unwrap();
    assert!(sim.is_registered("/vms/new/new.vmx"));
    assert_eq!(
        host.register_vm("/vms/new/new.vmx").unwrap_err().native_code(),
        Some(VIX_E_VM_ALREADY_LOADED)
    );

    host.unregister_vm("/vms/new/new.vmx").unwrap();
    assert!(!sim.is_registered("/vms/new/new.vmx"));
    host.unregister_vm("/vms/new/new.vmx").unwrap();
}

#[test]
fn test_find_running_vm_paths() {
    let (_sim, runtime) = fixture();
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    let paths = host.find_running_vm_paths().unwrap();
    assert_eq!(paths, vec![WEB.to_string(), DB.to_string()]);
}
