/*!
 * Simulated Native Backend
 *
 * In-memory implementation of `NativeApi`: a registry of virtual machines
 * with power state, guest tools, snapshots and guest files, plus a ledger of
 * every handle it has handed out.
 *
 * Features:
 * - Live-handle ledger so callers can assert nothing leaked
 * - Credentials check for named hosts
 * - Per-call latency and a concurrency high-water mark
 * - Fault injection (next call of an operation, release of one handle)
 * - Call hooks that run while the call is in flight
 * - `find_items` delivers its events from a separate thread
 */

use super::api::{EventCallback, NativeApi, NativeEvent, SnapshotParams};
use super::constants::*;
use super::property::PropertyValue;
use crate::core::config::ConnectParams;
use crate::core::limits;
use crate::core::errors::{NativeError, NativeResult};
use crate::core::types::{NativeHandle, PropertyId, RawHandle, Timeout};
use ahash::RandomState;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// First raw value handed out; keeps simulated handles easy to spot in logs
const FIRST_HANDLE: RawHandle = 1000;

/// Hook run at the start of a simulated call, outside every lock
pub type CallHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone)]
struct SimSnapshot {
    id: u64,
    name: String,
    description: String,
    power_state: i32,
}

#[derive(Debug, Clone)]
struct SimVm {
    vmx_path: String,
    running: bool,
    suspended: bool,
    tools_installed: bool,
    tools_state: i32,
    logged_in: bool,
    hardware_version: i32,
    snapshots: Vec<SimSnapshot>,
    guest_files: HashSet<String, RandomState>,
}

impl SimVm {
    fn new(vmx_path: &str) -> Self {
        Self {
            vmx_path: vmx_path.to_string(),
            running: false,
            suspended: false,
            tools_installed: true,
            tools_state: VIX_TOOLSSTATE_UNKNOWN,
            logged_in: false,
            hardware_version: 4,
            snapshots: Vec::new(),
            guest_files: HashSet::with_hasher(RandomState::new()),
        }
    }

    fn power_state(&self) -> i32 {
        if self.running {
            VIX_POWERSTATE_POWERED_ON
        } else if self.suspended {
            VIX_POWERSTATE_SUSPENDED
        } else {
            VIX_POWERSTATE_POWERED_OFF
        }
    }

    fn require_running(&self) -> NativeResult<()> {
        if self.running {
            Ok(())
        } else {
            Err(NativeError::new(VIX_E_VM_NOT_RUNNING))
        }
    }

    fn require_powered_off(&self) -> NativeResult<()> {
        if self.running {
            Err(NativeError::new(VIX_E_VM_IS_RUNNING))
        } else {
            Ok(())
        }
    }

    fn require_guest_session(&self) -> NativeResult<()> {
        self.require_running()?;
        if self.logged_in {
            Ok(())
        } else {
            Err(NativeError::with_message(
                VIX_E_GUEST_USER_PERMISSIONS,
                "no guest session: log in first",
            ))
        }
    }
}

/// What a live handle refers to
#[derive(Debug, Clone, PartialEq, Eq)]
enum HandleObject {
    Host { host_type: i32 },
    Vm { vmx_path: String },
    Snapshot { vmx_path: String, snapshot: u64 },
    FoundItem { location: String },
}

#[derive(Debug, Clone)]
enum StoredProperty {
    Value(PropertyValue),
    /// Only a type tag; reading the value is not supported
    Opaque(i32),
}

struct SimState {
    next_handle: RawHandle,
    next_snapshot: u64,
    live: HashMap<RawHandle, HandleObject, RandomState>,
    vms: Vec<SimVm>,
    properties: HashMap<(RawHandle, PropertyId), StoredProperty, RandomState>,
    pending_failures: HashMap<&'static str, ErrorCode, RandomState>,
    release_failures: HashMap<RawHandle, ErrorCode, RandomState>,
    hooks: HashMap<&'static str, CallHook, RandomState>,
    calls: Vec<&'static str>,
}

impl SimState {
    fn allocate(&mut self, object: HandleObject) -> NativeHandle {
        let raw = self.next_handle;
        self.next_handle += 1;
        self.live.insert(raw, object);
        NativeHandle::new(raw)
    }

    fn object(&self, handle: NativeHandle) -> NativeResult<&HandleObject> {
        self.live
            .get(&handle.raw())
            .ok_or_else(|| NativeError::new(VIX_E_INVALID_HANDLE))
    }

    fn require_host(&self, handle: NativeHandle) -> NativeResult<()> {
        match self.object(handle)? {
            HandleObject::Host { .. } => Ok(()),
            _ => Err(NativeError::new(VIX_E_NOT_SUPPORTED_ON_HANDLE_TYPE)),
        }
    }

    fn vm_path(&self, handle: NativeHandle) -> NativeResult<String> {
        match self.object(handle)? {
            HandleObject::Vm { vmx_path } => Ok(vmx_path.clone()),
            _ => Err(NativeError::new(VIX_E_NOT_SUPPORTED_ON_HANDLE_TYPE)),
        }
    }

    fn find_vm(&self, vmx_path: &str) -> Option<&SimVm> {
        self.vms.iter().find(|vm| vm.vmx_path == vmx_path)
    }

    fn vm(&self, handle: NativeHandle) -> NativeResult<&SimVm> {
        let path = self.vm_path(handle)?;
        self.find_vm(&path)
            .ok_or_else(|| NativeError::new(VIX_E_VM_NOT_FOUND))
    }

    fn vm_mut(&mut self, handle: NativeHandle) -> NativeResult<&mut SimVm> {
        let path = self.vm_path(handle)?;
        self.vms
            .iter_mut()
            .find(|vm| vm.vmx_path == path)
            .ok_or_else(|| NativeError::new(VIX_E_VM_NOT_FOUND))
    }

    /// Snapshot id behind `snapshot`, checked to belong to the VM behind `vm`
    fn snapshot_of(&self, vm: NativeHandle, snapshot: NativeHandle) -> NativeResult<u64> {
        let path = self.vm_path(vm)?;
        match self.object(snapshot)? {
            HandleObject::Snapshot { vmx_path, snapshot } if *vmx_path == path => {
                let exists = self
                    .find_vm(&path)
                    .map(|vm| vm.snapshots.iter().any(|s| s.id == *snapshot))
                    .unwrap_or(false);
                if exists {
                    Ok(*snapshot)
                } else {
                    Err(NativeError::new(VIX_E_SNAPSHOT_NOT_FOUND))
                }
            }
            HandleObject::Snapshot { .. } => Err(NativeError::new(VIX_E_SNAPSHOT_NOT_FOUND)),
            _ => Err(NativeError::new(VIX_E_NOT_SUPPORTED_ON_HANDLE_TYPE)),
        }
    }

    fn property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<StoredProperty> {
        let object = self.object(handle)?;
        if let Some(stored) = self.properties.get(&(handle.raw(), id)) {
            return Ok(stored.clone());
        }

        let value = match (object, id) {
            (HandleObject::Host { host_type }, VIX_PROPERTY_HOST_HOSTTYPE) => {
                PropertyValue::Int(*host_type)
            }
            (HandleObject::Host { .. }, VIX_PROPERTY_HOST_API_VERSION) => {
                PropertyValue::Int(limits::API_VERSION)
            }
            (HandleObject::Vm { vmx_path }, _) => {
                let vm = self
                    .find_vm(vmx_path)
                    .ok_or_else(|| NativeError::new(VIX_E_VM_NOT_FOUND))?;
                match id {
                    VIX_PROPERTY_VM_VMX_PATHNAME => PropertyValue::String(vm.vmx_path.clone()),
                    VIX_PROPERTY_VM_POWER_STATE => PropertyValue::Int(vm.power_state()),
                    VIX_PROPERTY_VM_TOOLS_STATE => PropertyValue::Int(vm.tools_state),
                    VIX_PROPERTY_VM_IS_RUNNING => PropertyValue::Bool(vm.running),
                    VIX_PROPERTY_VM_NUM_VCPUS => PropertyValue::Int(1),
                    VIX_PROPERTY_VM_MEMORY_SIZE => PropertyValue::Int(512),
                    _ => return Err(NativeError::new(VIX_E_UNRECOGNIZED_PROPERTY)),
                }
            }
            (HandleObject::Snapshot { vmx_path, snapshot }, _) => {
                let snap = self
                    .find_vm(vmx_path)
                    .and_then(|vm| vm.snapshots.iter().find(|s| s.id == *snapshot))
                    .ok_or_else(|| NativeError::new(VIX_E_SNAPSHOT_NOT_FOUND))?;
                match id {
                    VIX_PROPERTY_SNAPSHOT_DISPLAYNAME => PropertyValue::String(snap.name.clone()),
                    VIX_PROPERTY_SNAPSHOT_DESCRIPTION => {
                        PropertyValue::String(snap.description.clone())
                    }
                    VIX_PROPERTY_SNAPSHOT_POWERSTATE => PropertyValue::Int(snap.power_state),
                    _ => return Err(NativeError::new(VIX_E_UNRECOGNIZED_PROPERTY)),
                }
            }
            (HandleObject::FoundItem { location }, VIX_PROPERTY_FOUND_ITEM_LOCATION) => {
                PropertyValue::String(location.clone())
            }
            _ => return Err(NativeError::new(VIX_E_UNRECOGNIZED_PROPERTY)),
        };
        Ok(StoredProperty::Value(value))
    }

    fn property_value(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<PropertyValue> {
        match self.property(handle, id)? {
            StoredProperty::Value(value) => Ok(value),
            StoredProperty::Opaque(_) => Err(NativeError::new(VIX_E_TYPE_MISMATCH)),
        }
    }
}

/// Builder for `SimulatedHost`
#[derive(Default)]
pub struct SimulatedHostBuilder {
    vms: Vec<SimVm>,
    credentials: Option<(String, String)>,
    guest_credentials: Option<(String, String)>,
    latency: Duration,
}

impl SimulatedHostBuilder {
    /// Register a powered-off VM
    #[must_use]
    pub fn with_vm(mut self, vmx_path: &str) -> Self {
        self.vms.push(SimVm::new(vmx_path));
        self
    }

    /// Register a VM that is already running with its tools up
    #[must_use]
    pub fn with_running_vm(mut self, vmx_path: &str) -> Self {
        let mut vm = SimVm::new(vmx_path);
        vm.running = true;
        vm.tools_state = VIX_TOOLSSTATE_RUNNING;
        self.vms.push(vm);
        self
    }

    /// Register a powered-off VM with no guest tools installed
    #[must_use]
    pub fn with_vm_without_tools(mut self, vmx_path: &str) -> Self {
        let mut vm = SimVm::new(vmx_path);
        vm.tools_installed = false;
        vm.tools_state = VIX_TOOLSSTATE_NOT_INSTALLED;
        self.vms.push(vm);
        self
    }

    /// Place a file in the guest file system of an already registered VM
    #[must_use]
    pub fn with_guest_file(mut self, vmx_path: &str, guest_path: &str) -> Self {
        if let Some(vm) = self.vms.iter_mut().find(|vm| vm.vmx_path == vmx_path) {
            vm.guest_files.insert(guest_path.to_string());
        }
        self
    }

    /// Credentials required to connect to a named host
    #[must_use]
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Guest account accepted by `login_in_guest`
    #[must_use]
    pub fn with_guest_credentials(mut self, username: &str, password: &str) -> Self {
        self.guest_credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Time every call spends "on the wire"
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn build(self) -> SimulatedHost {
        SimulatedHost {
            state: Mutex::new(SimState {
                next_handle: FIRST_HANDLE,
                next_snapshot: 1,
                live: HashMap::with_hasher(RandomState::new()),
                vms: self.vms,
                properties: HashMap::with_hasher(RandomState::new()),
                pending_failures: HashMap::with_hasher(RandomState::new()),
                release_failures: HashMap::with_hasher(RandomState::new()),
                hooks: HashMap::with_hasher(RandomState::new()),
                calls: Vec::new(),
            }),
            credentials: self.credentials,
            guest_credentials: self.guest_credentials,
            latency: self.latency,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }
}

/// In-memory native backend
pub struct SimulatedHost {
    state: Mutex<SimState>,
    credentials: Option<(String, String)>,
    guest_credentials: Option<(String, String)>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl fmt::Debug for SimulatedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SimulatedHost")
            .field("vms", &state.vms.len())
            .field("live_handles", &state.live.len())
            .field("latency", &self.latency)
            .finish()
    }
}

/// Tracks one in-flight call for the concurrency high-water mark
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SimulatedHost {
    pub fn builder() -> SimulatedHostBuilder {
        SimulatedHostBuilder::default()
    }

    // =========================================================================
    // Test controls
    // =========================================================================

    /// Make the next call of `op` fail with `code`
    pub fn fail_next(&self, op: &'static str, code: ErrorCode) {
        self.state.lock().pending_failures.insert(op, code);
    }

    /// Make every release of `handle` fail with `code`; the handle stays live
    pub fn fail_release(&self, handle: NativeHandle, code: ErrorCode) {
        self.state.lock().release_failures.insert(handle.raw(), code);
    }

    /// Run `hook` at the start of every call of `op`
    pub fn on_call(&self, op: &'static str, hook: CallHook) {
        self.state.lock().hooks.insert(op, hook);
    }

    pub fn clear_hook(&self, op: &'static str) {
        self.state.lock().hooks.remove(op);
    }

    /// Attach a property to a handle, shadowing any built-in one
    pub fn define_property(&self, handle: NativeHandle, id: PropertyId, value: PropertyValue) {
        self.state
            .lock()
            .properties
            .insert((handle.raw(), id), StoredProperty::Value(value));
    }

    /// Attach a property that only reports a type tag
    pub fn define_opaque_property(&self, handle: NativeHandle, id: PropertyId, type_tag: i32) {
        self.state
            .lock()
            .properties
            .insert((handle.raw(), id), StoredProperty::Opaque(type_tag));
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Handles handed out and not yet released, in allocation order
    pub fn live_handles(&self) -> Vec<NativeHandle> {
        let state = self.state.lock();
        let mut raw: Vec<_> = state.live.keys().copied().collect();
        raw.sort_unstable();
        raw.into_iter().map(NativeHandle::new).collect()
    }

    pub fn is_live(&self, handle: NativeHandle) -> bool {
        self.state.lock().live.contains_key(&handle.raw())
    }

    /// Operation names in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Most calls ever in flight at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_registered(&self, vmx_path: &str) -> bool {
        self.state.lock().find_vm(vmx_path).is_some()
    }

    pub fn is_running(&self, vmx_path: &str) -> bool {
        self.state
            .lock()
            .find_vm(vmx_path)
            .map(|vm| vm.running)
            .unwrap_or(false)
    }

    pub fn hardware_version(&self, vmx_path: &str) -> Option<i32> {
        self.state.lock().find_vm(vmx_path).map(|vm| vm.hardware_version)
    }

    /// Snapshot names of a VM, oldest first
    pub fn snapshot_names(&self, vmx_path: &str) -> Vec<String> {
        self.state
            .lock()
            .find_vm(vmx_path)
            .map(|vm| vm.snapshots.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn guest_file_exists(&self, vmx_path: &str, guest_path: &str) -> bool {
        self.state
            .lock()
            .find_vm(vmx_path)
            .map(|vm| vm.guest_files.contains(guest_path))
            .unwrap_or(false)
    }

    // =========================================================================
    // Call plumbing
    // =========================================================================

    /// Record the call, run its hook, wait out the latency
    fn begin(&self, op: &'static str) -> InFlight<'_> {
        trace!(op, "simulated native call");
        let hook = {
            let mut state = self.state.lock();
            state.calls.push(op);
            state.hooks.get(op).cloned()
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight {
            counter: &self.in_flight,
        };

        if let Some(hook) = hook {
            hook();
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        guard
    }

    fn injected_failure(&self, op: &'static str) -> NativeResult<()> {
        match self.state.lock().pending_failures.remove(op) {
            Some(code) => Err(NativeError::new(code)),
            None => Ok(()),
        }
    }

    /// Run one call against the locked state
    fn call<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut SimState) -> NativeResult<R>,
    ) -> NativeResult<R> {
        let _in_flight = self.begin(op);
        self.injected_failure(op)?;
        let mut state = self.state.lock();
        f(&mut state)
    }

    fn release(&self, op: &'static str, handle: NativeHandle) -> NativeResult<()> {
        self.call(op, |state| {
            if let Some(code) = state.release_failures.get(&handle.raw()) {
                return Err(NativeError::new(*code));
            }
            state
                .live
                .remove(&handle.raw())
                .map(|_| ())
                .ok_or_else(|| NativeError::new(VIX_E_INVALID_HANDLE))
        })
    }

    fn check_host_credentials(&self, params: &ConnectParams) -> NativeResult<()> {
        if params.host_name.is_none() {
            return Ok(());
        }
        let (Some(user), Some(password)) = (&params.username, &params.password) else {
            return Err(NativeError::with_message(
                VIX_E_HOST_USER_PERMISSIONS,
                "credentials are required for a named host",
            ));
        };
        match &self.credentials {
            Some((expected_user, expected_password))
                if expected_user != user || expected_password != password =>
            {
                Err(NativeError::new(VIX_E_HOST_USER_PERMISSIONS))
            }
            _ => Ok(()),
        }
    }
}

impl NativeApi for SimulatedHost {
    fn connect(&self, params: &ConnectParams) -> NativeResult<NativeHandle> {
        self.check_host_credentials(params)?;
        let host_type = params.host_type;
        self.call("connect", |state| Ok(state.allocate(HandleObject::Host { host_type })))
    }

    fn disconnect(&self, host: NativeHandle) -> NativeResult<()> {
        self.release("disconnect", host)
    }

    fn find_items(
        &self,
        host: NativeHandle,
        search: i32,
        _timeout: Timeout,
        callback: EventCallback,
    ) -> NativeResult<()> {
        let _in_flight = self.begin("find_items");
        let (job, locations) = {
            let mut state = self.state.lock();
            state.require_host(host)?;
            let locations: Vec<String> = state
                .vms
                .iter()
                .filter(|vm| search != VIX_FIND_RUNNING_VMS || vm.running)
                .map(|vm| vm.vmx_path.clone())
                .collect();
            let job = state.allocate(HandleObject::Host { host_type: 0 });
            (job, locations)
        };

        // Events arrive on a thread the caller does not own
        let delivered = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    callback(NativeEvent {
                        job,
                        kind: VIX_EVENTTYPE_JOB_PROGRESS,
                        info: NativeHandle::INVALID,
                    });
                    for location in locations {
                        let info = self.state.lock().allocate(HandleObject::FoundItem { location });
                        callback(NativeEvent {
                            job,
                            kind: VIX_EVENTTYPE_FIND_ITEM,
                            info,
                        });
                        self.state.lock().live.remove(&info.raw());
                    }
                    callback(NativeEvent {
                        job,
                        kind: VIX_EVENTTYPE_JOB_COMPLETED,
                        info: NativeHandle::INVALID,
                    });
                })
                .join()
        });

        self.state.lock().live.remove(&job.raw());
        if delivered.is_err() {
            return Err(NativeError::with_message(VIX_E_FAIL, "event callback panicked"));
        }
        // The job wait reports injected failures after the events went out
        self.injected_failure("find_items")
    }

    fn register_vm(&self, host: NativeHandle, vmx_path: &str) -> NativeResult<()> {
        self.call("register_vm", |state| {
            state.require_host(host)?;
            if state.find_vm(vmx_path).is_some() {
                return Err(NativeError::new(VIX_E_VM_ALREADY_LOADED));
            }
            state.vms.push(SimVm::new(vmx_path));
            Ok(())
        })
    }

    fn unregister_vm(&self, host: NativeHandle, vmx_path: &str) -> NativeResult<()> {
        self.call("unregister_vm", |state| {
            state.require_host(host)?;
            state.vms.retain(|vm| vm.vmx_path != vmx_path);
            Ok(())
        })
    }

    fn open_vm(&self, host: NativeHandle, vmx_path: &str) -> NativeResult<NativeHandle> {
        self.call("open_vm", |state| {
            state.require_host(host)?;
            if state.find_vm(vmx_path).is_none() {
                return Err(NativeError::new(VIX_E_VM_NOT_FOUND));
            }
            Ok(state.allocate(HandleObject::Vm {
                vmx_path: vmx_path.to_string(),
            }))
        })
    }

    fn release_handle(&self, handle: NativeHandle) -> NativeResult<()> {
        self.release("release_handle", handle)
    }

    fn power_on(&self, vm: NativeHandle, _options: i32) -> NativeResult<()> {
        self.call("power_on", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_powered_off()?;
            vm.running = true;
            vm.suspended = false;
            vm.tools_state = VIX_TOOLSSTATE_UNKNOWN;
            Ok(())
        })
    }

    fn power_off(&self, vm: NativeHandle) -> NativeResult<()> {
        self.call("power_off", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_running()?;
            vm.running = false;
            vm.logged_in = false;
            vm.tools_state = VIX_TOOLSSTATE_UNKNOWN;
            Ok(())
        })
    }

    fn reset(&self, vm: NativeHandle) -> NativeResult<()> {
        self.call("reset", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_running()?;
            vm.logged_in = false;
            vm.tools_state = VIX_TOOLSSTATE_UNKNOWN;
            Ok(())
        })
    }

    fn suspend(&self, vm: NativeHandle) -> NativeResult<()> {
        self.call("suspend", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_running()?;
            vm.running = false;
            vm.suspended = true;
            vm.logged_in = false;
            Ok(())
        })
    }

    fn upgrade_virtual_hardware(&self, vm: NativeHandle) -> NativeResult<()> {
        self.call("upgrade_virtual_hardware", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_powered_off()?;
            vm.hardware_version += 1;
            Ok(())
        })
    }

    fn wait_for_tools_in_guest(&self, vm: NativeHandle, timeout: Timeout) -> NativeResult<()> {
        self.call("wait_for_tools_in_guest", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_running()?;
            if vm.tools_installed {
                vm.tools_state = VIX_TOOLSSTATE_RUNNING;
                Ok(())
            } else if timeout == Timeout::Infinite {
                Err(NativeError::new(VIX_E_TIMEOUT_WAITING_FOR_TOOLS))
            } else {
                // A bounded wait ends quietly with the tools still unknown
                vm.tools_state = VIX_TOOLSSTATE_UNKNOWN;
                Ok(())
            }
        })
    }

    fn install_tools(&self, vm: NativeHandle) -> NativeResult<()> {
        self.call("install_tools", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_running()?;
            vm.tools_installed = true;
            Ok(())
        })
    }

    fn delete_vm(&self, vm: NativeHandle) -> NativeResult<()> {
        self.call("delete_vm", |state| {
            let path = state.vm_path(vm)?;
            state.vm(vm)?.require_powered_off()?;
            state.vms.retain(|vm| vm.vmx_path != path);
            Ok(())
        })
    }

    fn create_snapshot(
        &self,
        vm: NativeHandle,
        params: &SnapshotParams,
    ) -> NativeResult<NativeHandle> {
        self.call("create_snapshot", |state| {
            let vmx_path = state.vm_path(vm)?;
            let id = state.next_snapshot;
            state.next_snapshot += 1;

            let target = state.vm_mut(vm)?;
            let snapshot = SimSnapshot {
                id,
                name: params.name.clone().unwrap_or_else(|| format!("Snapshot {}", id)),
                description: params.description.clone().unwrap_or_default(),
                power_state: target.power_state(),
            };
            target.snapshots.push(snapshot);

            Ok(state.allocate(HandleObject::Snapshot {
                vmx_path,
                snapshot: id,
            }))
        })
    }

    fn remove_snapshot(&self, vm: NativeHandle, snapshot: NativeHandle) -> NativeResult<()> {
        self.call("remove_snapshot", |state| {
            let id = state.snapshot_of(vm, snapshot)?;
            state.vm_mut(vm)?.snapshots.retain(|s| s.id != id);
            Ok(())
        })
    }

    fn revert_to_snapshot(&self, vm: NativeHandle, snapshot: NativeHandle) -> NativeResult<()> {
        self.call("revert_to_snapshot", |state| {
            let id = state.snapshot_of(vm, snapshot)?;
            let target = state.vm_mut(vm)?;
            let power_state = target
                .snapshots
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.power_state)
                .ok_or_else(|| NativeError::new(VIX_E_SNAPSHOT_NOT_FOUND))?;
            target.running = power_state == VIX_POWERSTATE_POWERED_ON;
            target.suspended = false;
            target.logged_in = false;
            Ok(())
        })
    }

    fn root_snapshot_count(&self, vm: NativeHandle) -> NativeResult<i32> {
        self.call("root_snapshot_count", |state| {
            let count = state.vm(vm)?.snapshots.len();
            i32::try_from(count).map_err(|_| NativeError::new(VIX_E_FAIL))
        })
    }

    fn root_snapshot(&self, vm: NativeHandle, index: i32) -> NativeResult<NativeHandle> {
        self.call("root_snapshot", |state| {
            let target = state.vm(vm)?;
            let snapshot = usize::try_from(index)
                .ok()
                .and_then(|i| target.snapshots.get(i))
                .map(|s| s.id)
                .ok_or_else(|| NativeError::new(VIX_E_INVALID_ARG))?;
            let vmx_path = target.vmx_path.clone();
            Ok(state.allocate(HandleObject::Snapshot { vmx_path, snapshot }))
        })
    }

    fn login_in_guest(
        &self,
        vm: NativeHandle,
        username: &str,
        password: &str,
        _options: i32,
    ) -> NativeResult<()> {
        let accepted = match &self.guest_credentials {
            Some((user, pass)) => user == username && pass == password,
            None => true,
        };
        self.call("login_in_guest", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_running()?;
            if vm.tools_state != VIX_TOOLSSTATE_RUNNING {
                return Err(NativeError::new(VIX_E_TOOLS_NOT_RUNNING));
            }
            if !accepted {
                return Err(NativeError::new(VIX_E_GUEST_USER_PERMISSIONS));
            }
            vm.logged_in = true;
            Ok(())
        })
    }

    fn copy_file_from_host_to_guest(
        &self,
        vm: NativeHandle,
        _src: &str,
        dst: &str,
    ) -> NativeResult<()> {
        self.call("copy_file_from_host_to_guest", |state| {
            let vm = state.vm_mut(vm)?;
            vm.require_guest_session()?;
            vm.guest_files.insert(dst.to_string());
            Ok(())
        })
    }

    fn copy_file_from_guest_to_host(
        &self,
        vm: NativeHandle,
        src: &str,
        _dst: &str,
    ) -> NativeResult<()> {
        self.call("copy_file_from_guest_to_host", |state| {
            let vm = state.vm(vm)?;
            vm.require_guest_session()?;
            if vm.guest_files.contains(src) {
                Ok(())
            } else {
                Err(NativeError::new(VIX_E_FILE_NOT_FOUND))
            }
        })
    }

    fn run_program_in_guest(
        &self,
        vm: NativeHandle,
        program: &str,
        _command_line: &str,
    ) -> NativeResult<()> {
        self.call("run_program_in_guest", |state| {
            let vm = state.vm(vm)?;
            vm.require_guest_session()?;
            if vm.guest_files.contains(program) {
                Ok(())
            } else {
                Err(NativeError::new(VIX_E_PROGRAM_NOT_STARTED))
            }
        })
    }

    fn property_type(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<i32> {
        self.call("property_type", |state| {
            Ok(match state.property(handle, id)? {
                StoredProperty::Value(value) => value.property_type().tag(),
                StoredProperty::Opaque(tag) => tag,
            })
        })
    }

    fn string_property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<String> {
        self.call("string_property", |state| {
            state
                .property_value(handle, id)?
                .into_string()
                .ok_or_else(|| NativeError::new(VIX_E_TYPE_MISMATCH))
        })
    }

    fn int_property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<i32> {
        self.call("int_property", |state| {
            state
                .property_value(handle, id)?
                .as_int()
                .ok_or_else(|| NativeError::new(VIX_E_TYPE_MISMATCH))
        })
    }

    fn int64_property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<i64> {
        self.call("int64_property", |state| match state.property_value(handle, id)? {
            PropertyValue::Int64(v) => Ok(v),
            _ => Err(NativeError::new(VIX_E_TYPE_MISMATCH)),
        })
    }

    fn bool_property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<bool> {
        self.call("bool_property", |state| {
            state
                .property_value(handle, id)?
                .as_bool()
                .ok_or_else(|| NativeError::new(VIX_E_TYPE_MISMATCH))
        })
    }
}
