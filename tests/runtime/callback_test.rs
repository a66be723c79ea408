/*!
 * Callback Bridge Tests
 * Items delivered from native callback threads during a host search
 */

use crate::{fixture, DB, WEB};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use vix_runtime::native::constants::*;
use vix_runtime::native::{NativeApi, NativeEvent};
use vix_runtime::runtime::{AccumulatorShape, CallbackBridge, Converter};
use vix_runtime::{
    ConnectParams, ErrorKind, Host, NativeHandle, Resource, Runtime, SimulatedHost, Timeout,
    VixError,
};

#[test]
fn test_running_vms_in_reported_order() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    let paths = host.find_running_vm_paths().unwrap();
    assert_eq!(paths, vec![WEB.to_string(), DB.to_string()]);

    // Job and per-item handles are gone once the search returns
    assert_eq!(sim.live_handles(), vec![host.handle()]);
}

#[test]
fn test_no_running_vms() {
    let sim = Arc::new(SimulatedHost::builder().with_vm(WEB).build());
    let runtime = Runtime::new(sim.clone());
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    assert_eq!(host.find_running_vm_paths().unwrap(), Vec::<String>::new());
}

#[test]
fn test_failed_wait_discards_results() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    sim.fail_next("find_items", VIX_E_FAIL);

    let err = host.find_running_vm_paths().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Native);
    assert_eq!(err.native_code(), Some(VIX_E_FAIL));

    // The runtime is usable again right away
    assert_eq!(host.find_running_vm_paths().unwrap().len(), 2);
}

#[test]
fn test_search_on_closed_host() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    host.close().unwrap();

    assert!(host.find_running_vm_paths().unwrap_err().is_client_error());
    assert_eq!(sim.call_count("find_items"), 0);
}

#[test]
fn test_bridge_with_custom_converter() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    let convert: Converter<(i32, bool)> = Arc::new(|_api: &dyn NativeApi, event: NativeEvent| {
        Ok((event.kind, event.info.is_valid()))
    });
    let (bridge, accumulator) = CallbackBridge::new(
        runtime.clone(),
        VIX_EVENTTYPE_JOB_COMPLETED,
        AccumulatorShape::Tuple(1),
        convert,
    );

    sim.find_items(host.handle(), VIX_FIND_RUNNING_VMS, Timeout::Infinite, bridge.into_callback())
        .unwrap();
    assert_eq!(accumulator.pending(), 1);
    assert_eq!(accumulator.finish(Ok(())).unwrap(), vec![(VIX_EVENTTYPE_JOB_COMPLETED, false)]);
}

#[test]
fn test_bridge_counts_unconvertible_items() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    let convert: Converter<NativeHandle> = Arc::new(|_api: &dyn NativeApi, event: NativeEvent| {
        if event.info.is_valid() {
            Ok(event.info)
        } else {
            Err(VixError::internal("no info handle"))
        }
    });
    let (bridge, accumulator) = CallbackBridge::new(
        runtime.clone(),
        VIX_EVENTTYPE_JOB_PROGRESS,
        AccumulatorShape::List,
        convert,
    );

    sim.find_items(host.handle(), VIX_FIND_RUNNING_VMS, Timeout::Infinite, bridge.into_callback())
        .unwrap();
    assert_eq!(accumulator.failures(), 1);
    assert!(accumulator.finish(Ok(())).unwrap().is_empty());
}
