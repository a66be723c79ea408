/*!
 * Concurrency Tests
 * The execution lock is given up around blocking calls and state is
 * re-validated when it is taken back
 */

use crate::{fixture, DB, WEB};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use vix_runtime::native::constants::*;
use vix_runtime::{ConnectParams, Host, Resource, SimulatedHost};

/// Park the first `op` call until the returned barrier is passed twice;
/// later calls run straight through
fn hold_first_call(sim: &SimulatedHost, op: &'static str) -> Arc<Barrier> {
    let pause = Arc::new(Barrier::new(2));
    let hook = Arc::clone(&pause);
    let first = AtomicBool::new(true);
    sim.on_call(
        op,
        Arc::new(move || {
            if first.swap(false, Ordering::SeqCst) {
                hook.wait();
                hook.wait();
            }
        }),
    );
    pause
}

#[test]
fn test_lock_released_during_native_call() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();

    let was_locked = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&was_locked);
    let observer = runtime.clone();
    sim.on_call(
        "power_off",
        Arc::new(move || flag.store(observer.is_locked(), Ordering::SeqCst)),
    );

    vm.power_off().unwrap();
    sim.clear_hook("power_off");
    assert!(!was_locked.load(Ordering::SeqCst));
    assert!(!runtime.is_locked());
}

#[test]
fn test_reentry_from_native_call() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();

    // Managed code runs again on the calling thread while the call is in flight
    let open_seen = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&open_seen);
    let observer = runtime.clone();
    sim.on_call(
        "reset",
        Arc::new(move || sink.store(observer.open_resources(), Ordering::SeqCst)),
    );

    vm.reset().unwrap();
    sim.clear_hook("reset");
    assert_eq!(open_seen.load(Ordering::SeqCst), 2);
}

#[test]
#[serial]
fn test_native_calls_overlap() {
    let (sim, runtime) = fixture(Duration::from_millis(40));
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let web = host.open_vm(WEB).unwrap();
    let db = host.open_vm(DB).unwrap();
    let start = Barrier::new(2);

    thread::scope(|s| {
        let a = s.spawn(|| {
            start.wait();
            web.power_off()
        });
        let b = s.spawn(|| {
            start.wait();
            db.power_off()
        });
        a.join().unwrap().unwrap();
        b.join().unwrap().unwrap();
    });

    assert!(sim.peak_concurrency() >= 2);
    assert!(!sim.is_running(WEB) && !sim.is_running(DB));
}

#[test]
#[serial]
fn test_concurrent_close_has_one_winner() {
    let (sim, runtime) = fixture(Duration::from_millis(20));
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let vm = host.open_vm(WEB).unwrap();
    let start = Barrier::new(2);

    let results = thread::scope(|s| {
        let closers: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    start.wait();
                    vm.close()
                })
            })
            .collect();
        closers
            .into_iter()
            .map(|closer| closer.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find_map(Result::err).unwrap();
    assert!(loser.is_client_error());
    assert_eq!(sim.call_count("release_handle"), 1);
    assert_eq!(host.open_vms().unwrap(), Vec::new());
}

#[test]
fn test_open_rejected_while_parent_closing() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let _web = host.open_vm(WEB).unwrap();

    // Hold the host's teardown inside the release of its only child
    let pause = Arc::new(Barrier::new(2));
    let hook = Arc::clone(&pause);
    sim.on_call(
        "release_handle",
        Arc::new(move || {
            hook.wait();
            hook.wait();
        }),
    );

    thread::scope(|s| {
        let closer = s.spawn(|| host.close());
        pause.wait();

        let err = host.open_vm(DB).unwrap_err();
        assert!(err.is_client_error());

        pause.wait();
        let report = closer.join().unwrap().unwrap();
        assert_eq!(report.children_closed, 1);
    });
    sim.clear_hook("release_handle");

    assert!(sim.live_handles().is_empty());
    assert_eq!(sim.call_count("open_vm"), 1);
}

#[test]
fn test_host_closed_while_child_opening() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    // Hold the open inside the native call, lock released
    let pause = Arc::new(Barrier::new(2));
    let hook = Arc::clone(&pause);
    sim.on_call(
        "open_vm",
        Arc::new(move || {
            hook.wait();
            hook.wait();
        }),
    );

    thread::scope(|s| {
        let opener = s.spawn(|| host.open_vm(WEB).map(|vm| vm.id()));
        pause.wait();

        host.close().unwrap();

        pause.wait();
        let err = opener.join().unwrap().unwrap_err();
        assert_eq!(err.native_code(), Some(VIX_E_INVALID_HANDLE));
    });
    sim.clear_hook("open_vm");

    assert!(host.is_closed());
    assert_eq!(runtime.live_resources(), 1);
    assert!(sim.live_handles().is_empty());
}

#[test]
fn test_sibling_closed_during_parent_cascade() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let web = host.open_vm(WEB).unwrap();
    let db = host.open_vm(DB).unwrap();

    // The cascade starts at db; web is closed directly while db releases
    let pause = hold_first_call(&sim, "release_handle");
    thread::scope(|s| {
        let closer = s.spawn(|| host.close());
        pause.wait();

        let sibling = web.close().unwrap();
        assert!(sibling.is_clean());
        assert_eq!(sibling.children_closed, 0);

        pause.wait();
        let report = closer.join().unwrap().unwrap();
        assert!(report.is_clean(), "{}", report);
        assert_eq!(report.children_closed, 1);
    });
    sim.clear_hook("release_handle");

    assert!(web.is_closed() && db.is_closed() && host.is_closed());
    assert_eq!(web.host(), None);
    assert!(sim.live_handles().is_empty());
    assert_eq!(sim.call_count("release_handle"), 2);
}

#[test]
fn test_sibling_dropped_during_parent_cascade() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let web = host.open_vm(WEB).unwrap();
    let db = host.open_vm(DB).unwrap();

    let pause = hold_first_call(&sim, "release_handle");
    thread::scope(|s| {
        let closer = s.spawn(|| host.close());
        pause.wait();

        drop(web);
        assert_eq!(runtime.live_resources(), 2);

        pause.wait();
        let report = closer.join().unwrap().unwrap();
        assert!(report.is_clean(), "{}", report);
        assert_eq!(report.children_closed, 1);
    });
    sim.clear_hook("release_handle");

    assert!(db.is_closed() && host.is_closed());
    assert_eq!(runtime.live_resources(), 2);
    assert!(sim.live_handles().is_empty());
    assert_eq!(sim.call_count("release_handle"), 2);
}

#[test]
fn test_cascade_skips_child_under_direct_close() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let web = host.open_vm(WEB).unwrap();
    let db = host.open_vm(DB).unwrap();

    // web's own release is in flight when the host cascade reaches it
    let pause = hold_first_call(&sim, "release_handle");
    thread::scope(|s| {
        let sibling = s.spawn(|| web.close());
        pause.wait();

        let report = host.close().unwrap();
        assert!(report.is_clean(), "{}", report);
        assert_eq!(report.children_closed, 1);
        assert!(db.is_closed());

        pause.wait();
        let sibling = sibling.join().unwrap().unwrap();
        assert!(sibling.is_clean());
    });
    sim.clear_hook("release_handle");

    assert!(web.is_closed());
    assert_eq!(web.host(), None);
    assert!(sim.live_handles().is_empty());
    assert_eq!(sim.call_count("release_handle"), 2);
}

#[test]
fn test_operations_rejected_while_closing() {
    let (sim, runtime) = fixture(Duration::ZERO);
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();
    let web = host.open_vm(WEB).unwrap();
    let db = host.open_vm(DB).unwrap();

    // db is mid-release and the host is mid-cascade; web has not been reached
    let pause = hold_first_call(&sim, "release_handle");
    thread::scope(|s| {
        let closer = s.spawn(|| host.close());
        pause.wait();

        assert!(db.power_off().unwrap_err().is_client_error());
        assert!(db.property(VIX_PROPERTY_VM_POWER_STATE).unwrap_err().is_client_error());
        assert!(host.register_vm(WEB).unwrap_err().is_client_error());
        assert!(host.find_running_vm_paths().unwrap_err().is_client_error());
        web.power_off().unwrap();

        pause.wait();
        let report = closer.join().unwrap().unwrap();
        assert!(report.is_clean(), "{}", report);
        assert_eq!(report.children_closed, 2);
    });
    sim.clear_hook("release_handle");

    assert_eq!(sim.call_count("power_off"), 1);
    assert_eq!(sim.call_count("register_vm"), 0);
    assert!(!sim.is_running(WEB) && sim.is_running(DB));
    assert!(sim.live_handles().is_empty());
}

#[test]
fn test_callbacks_wait_for_the_lock() {
    let (sim, runtime) = fixture(Duration::from_millis(5));
    let host = Host::connect(&runtime, &ConnectParams::local()).unwrap();

    // Another thread keeps entering managed code while the search runs
    let done = AtomicBool::new(false);
    let paths = thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::SeqCst) {
                let _ = runtime.open_resources();
            }
        });
        let paths = host.find_running_vm_paths();
        done.store(true, Ordering::SeqCst);
        paths
    });

    assert_eq!(paths.unwrap(), vec![WEB.to_string(), DB.to_string()]);
    assert_eq!(sim.live_handles(), vec![host.handle()]);
}
