/*!
 * Native API
 *
 * The seam between the lifecycle core and the native virtualization library.
 * Every method is one native call followed by its job wait, so each one
 * blocks until the remote side answers. Callers run them through the
 * execution boundary, never with the lock held.
 */

use crate::core::config::ConnectParams;
use crate::core::errors::NativeResult;
use crate::core::types::{NativeHandle, PropertyId, Timeout};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Event delivered by the native library while a job is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeEvent {
    /// Job the event belongs to
    pub job: NativeHandle,
    /// Native event type (see `VIX_EVENTTYPE_*`)
    pub kind: i32,
    /// Event info handle, owned by the native library
    pub info: NativeHandle,
}

/// Callback invoked by the native library, possibly on one of its own threads
pub type EventCallback = Arc<dyn Fn(NativeEvent) + Send + Sync>;

/// Snapshot creation parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub options: i32,
}

impl SnapshotParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: i32) -> Self {
        self.options = options;
        self
    }
}

/// Blocking interface to the native library
///
/// Implementations must be callable from any thread. `find_items` may invoke
/// its callback from threads the caller does not own, but must not return
/// before the last invocation has finished.
pub trait NativeApi: Send + Sync + fmt::Debug {
    // Host

    fn connect(&self, params: &ConnectParams) -> NativeResult<NativeHandle>;

    fn disconnect(&self, host: NativeHandle) -> NativeResult<()>;

    fn find_items(
        &self,
        host: NativeHandle,
        search: i32,
        timeout: Timeout,
        callback: EventCallback,
    ) -> NativeResult<()>;

    fn register_vm(&self, host: NativeHandle, vmx_path: &str) -> NativeResult<()>;

    fn unregister_vm(&self, host: NativeHandle, vmx_path: &str) -> NativeResult<()>;

    fn open_vm(&self, host: NativeHandle, vmx_path: &str) -> NativeResult<NativeHandle>;

    // Handles

    fn release_handle(&self, handle: NativeHandle) -> NativeResult<()>;

    // VM power and maintenance

    fn power_on(&self, vm: NativeHandle, options: i32) -> NativeResult<()>;

    fn power_off(&self, vm: NativeHandle) -> NativeResult<()>;

    fn reset(&self, vm: NativeHandle) -> NativeResult<()>;

    fn suspend(&self, vm: NativeHandle) -> NativeResult<()>;

    fn upgrade_virtual_hardware(&self, vm: NativeHandle) -> NativeResult<()>;

    fn wait_for_tools_in_guest(&self, vm: NativeHandle, timeout: Timeout) -> NativeResult<()>;

    fn install_tools(&self, vm: NativeHandle) -> NativeResult<()>;

    fn delete_vm(&self, vm: NativeHandle) -> NativeResult<()>;

    // Snapshots

    fn create_snapshot(
        &self,
        vm: NativeHandle,
        params: &SnapshotParams,
    ) -> NativeResult<NativeHandle>;

    fn remove_snapshot(&self, vm: NativeHandle, snapshot: NativeHandle) -> NativeResult<()>;

    fn revert_to_snapshot(&self, vm: NativeHandle, snapshot: NativeHandle) -> NativeResult<()>;

    fn root_snapshot_count(&self, vm: NativeHandle) -> NativeResult<i32>;

    fn root_snapshot(&self, vm: NativeHandle, index: i32) -> NativeResult<NativeHandle>;

    // Guest

    fn login_in_guest(
        &self,
        vm: NativeHandle,
        username: &str,
        password: &str,
        options: i32,
    ) -> NativeResult<()>;

    fn copy_file_from_host_to_guest(
        &self,
        vm: NativeHandle,
        src: &str,
        dst: &str,
    ) -> NativeResult<()>;

    fn copy_file_from_guest_to_host(
        &self,
        vm: NativeHandle,
        src: &str,
        dst: &str,
    ) -> NativeResult<()>;

    fn run_program_in_guest(
        &self,
        vm: NativeHandle,
        program: &str,
        command_line: &str,
    ) -> NativeResult<()>;

    // Properties

    fn property_type(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<i32>;

    fn string_property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<String>;

    fn int_property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<i32>;

    fn int64_property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<i64>;

    fn bool_property(&self, handle: NativeHandle, id: PropertyId) -> NativeResult<bool>;
}
