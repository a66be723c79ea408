/*!
 * Virtual Machine
 *
 * Session resource opened through a host. Tracked by its host while open;
 * tracks its own open snapshots.
 */

use super::host::Host;
use super::report::{CloseReport, TeardownMode};
use super::resource::Resource;
use super::snapshot::Snapshot;
use crate::core::errors::{VixError, VixResult};
use crate::core::types::{NativeHandle, ResourceId, ResourceKind, Timeout};
use crate::lifecycle::wrapper::WrapperAccess;
use crate::native::api::SnapshotParams;
use crate::native::constants::{
    VIX_PROPERTY_VM_TOOLS_STATE, VIX_TOOLSSTATE_UNKNOWN, VIX_VMPOWEROP_NORMAL,
};
use crate::native::property;
use crate::runtime::lock::{Managed, Runtime};
use std::fmt;
use tracing::{debug, error};

/// A VM session
pub struct Vm {
    runtime: Runtime,
    id: ResourceId,
}

impl Vm {
    /// Open the VM at `vmx_path` through `host`
    ///
    /// The host must be open; otherwise this is a client error and nothing
    /// is tracked.
    pub fn open(host: &Host, vmx_path: &str) -> VixResult<Vm> {
        let runtime = host.runtime();
        let id = runtime.enter().open_child(
            host.id(),
            ResourceKind::Vm,
            Some(vmx_path.to_string()),
            "open_vm",
            |api, host_handle| api.open_vm(host_handle, vmx_path),
        )?;

        Ok(Vm {
            runtime: runtime.clone(),
            id,
        })
    }

    /// Close open snapshots, release the VM and detach it from its host
    ///
    /// Closing a closed VM is a client error.
    pub fn close(&self) -> VixResult<CloseReport> {
        let mut managed = self.runtime.enter();
        managed.wrapper(self.id)?.require_open()?;
        managed.close_with_unlink(self.id, TeardownMode::Direct)
    }

    /// Host tracking this VM; `None` once closed
    pub fn host(&self) -> Option<ResourceId> {
        self.runtime.enter().entry(self.id).ok().and_then(|entry| entry.parent())
    }

    /// Path of the VM's configuration file
    pub fn vmx_path(&self) -> Option<String> {
        self.runtime
            .enter()
            .entry(self.id)
            .ok()
            .and_then(|entry| entry.label().map(str::to_string))
    }

    /// Open snapshots, most recently opened first
    pub fn open_snapshots(&self) -> VixResult<Vec<ResourceId>> {
        self.runtime.enter().children_of(self.id)
    }

    // =========================================================================
    // Power
    // =========================================================================

    pub fn power_on(&self) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "power_on", |api, vm| api.power_on(vm, VIX_VMPOWEROP_NORMAL))
    }

    pub fn power_off(&self) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "power_off", |api, vm| api.power_off(vm))
    }

    pub fn reset(&self) -> VixResult<()> {
        self.runtime.enter().call_open(self.id, "reset", |api, vm| api.reset(vm))
    }

    pub fn suspend(&self) -> VixResult<()> {
        self.runtime.enter().call_open(self.id, "suspend", |api, vm| api.suspend(vm))
    }

    pub fn upgrade_virtual_hardware(&self) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "upgrade_virtual_hardware", |api, vm| {
                api.upgrade_virtual_hardware(vm)
            })
    }

    /// Delete the VM from the host. The session stays open until closed.
    pub fn delete(&self) -> VixResult<()> {
        self.runtime.enter().call_open(self.id, "delete_vm", |api, vm| api.delete_vm(vm))
    }

    // =========================================================================
    // Guest tools
    // =========================================================================

    /// Wait for the guest tools; false if they were still not up when the
    /// wait ended
    pub fn wait_for_tools_in_guest(&self, timeout: Timeout) -> VixResult<bool> {
        let mut managed = self.runtime.enter();
        managed.call_open(self.id, "wait_for_tools_in_guest", |api, vm| {
            api.wait_for_tools_in_guest(vm, timeout)
        })?;

        let handle = managed.require_usable(self.id)?;
        let api = managed.api();
        let state = managed.blocking("property", || {
            property::extract_property(api, handle, VIX_PROPERTY_VM_TOOLS_STATE)
        })?;
        match state.as_int() {
            Some(tools_state) => Ok(tools_state != VIX_TOOLSSTATE_UNKNOWN),
            None => Err(VixError::internal("tools state is not an integer property")),
        }
    }

    /// `wait_for_tools_in_guest` with the configured tools timeout
    pub fn wait_for_tools(&self) -> VixResult<bool> {
        self.wait_for_tools_in_guest(self.runtime.config().tools_timeout)
    }

    pub fn install_tools(&self) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "install_tools", |api, vm| api.install_tools(vm))
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Take a snapshot; it becomes the newest child of this VM
    pub fn create_snapshot(&self, params: &SnapshotParams) -> VixResult<Snapshot> {
        let id = self.runtime.enter().open_child(
            self.id,
            ResourceKind::Snapshot,
            params.name.clone(),
            "create_snapshot",
            |api, vm| api.create_snapshot(vm, params),
        )?;
        Ok(Snapshot::wrap(self.runtime.clone(), id))
    }

    /// Delete `snapshot` on the host. The wrapper stays open until closed.
    pub fn remove_snapshot(&self, snapshot: &Snapshot) -> VixResult<()> {
        let mut managed = self.runtime.enter();
        let target = self.owned_snapshot_handle(&managed, snapshot)?;
        managed.call_open(self.id, "remove_snapshot", |api, vm| {
            api.remove_snapshot(vm, target)
        })
    }

    pub fn revert_to_snapshot(&self, snapshot: &Snapshot) -> VixResult<()> {
        let mut managed = self.runtime.enter();
        let target = self.owned_snapshot_handle(&managed, snapshot)?;
        managed.call_open(self.id, "revert_to_snapshot", |api, vm| {
            api.revert_to_snapshot(vm, target)
        })
    }

    fn owned_snapshot_handle(
        &self,
        managed: &Managed<'_>,
        snapshot: &Snapshot,
    ) -> VixResult<NativeHandle> {
        if !snapshot.runtime().same_runtime(&self.runtime) {
            return Err(VixError::client("snapshot belongs to a different runtime"));
        }
        managed.require_usable(snapshot.id())
    }

    /// Number of root snapshots
    pub fn root_snapshot_count(&self) -> VixResult<usize> {
        let count = self
            .runtime
            .enter()
            .call_open(self.id, "root_snapshot_count", |api, vm| {
                api.root_snapshot_count(vm)
            })?;
        usize::try_from(count)
            .map_err(|_| VixError::internal(format!("negative snapshot count {}", count)))
    }

    /// Wrap every root snapshot; each becomes a tracked child of this VM
    ///
    /// All or nothing: if fetching one fails, the ones already wrapped are
    /// released again.
    pub fn root_snapshots(&self) -> VixResult<Vec<Snapshot>> {
        let mut managed = self.runtime.enter();
        let count = managed.call_open(self.id, "root_snapshot_count", |api, vm| {
            api.root_snapshot_count(vm)
        })?;

        let mut ids = Vec::new();
        for index in 0..count.max(0) {
            let opened = managed.open_child(
                self.id,
                ResourceKind::Snapshot,
                None,
                "root_snapshot",
                |api, vm| api.root_snapshot(vm, index),
            );
            match opened {
                Ok(id) => ids.push(id),
                Err(err) => {
                    for id in ids {
                        let released = managed.close_with_unlink(id, TeardownMode::Destructor);
                        if let Err(close_err) = released {
                            error!(
                                resource = %id,
                                error = %close_err,
                                "failed to release root snapshot"
                            );
                        }
                        managed.remove(id);
                    }
                    return Err(err);
                }
            }
        }
        drop(managed);

        debug!(vm = %self.id, count = ids.len(), "wrapped root snapshots");
        Ok(ids
            .into_iter()
            .map(|id| Snapshot::wrap(self.runtime.clone(), id))
            .collect())
    }

    // =========================================================================
    // Guest operations
    // =========================================================================

    pub fn login_in_guest(&self, username: &str, password: &str, options: i32) -> VixResult<()> {
        self.runtime.enter().call_open(self.id, "login_in_guest", |api, vm| {
            api.login_in_guest(vm, username, password, options)
        })
    }

    pub fn copy_file_from_host_to_guest(&self, src: &str, dst: &str) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "copy_file_from_host_to_guest", |api, vm| {
                api.copy_file_from_host_to_guest(vm, src, dst)
            })
    }

    pub fn copy_file_from_guest_to_host(&self, src: &str, dst: &str) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "copy_file_from_guest_to_host", |api, vm| {
                api.copy_file_from_guest_to_host(vm, src, dst)
            })
    }

    pub fn run_program_in_guest(&self, program: &str, command_line: &str) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "run_program_in_guest", |api, vm| {
                api.run_program_in_guest(vm, program, command_line)
            })
    }
}

impl Resource for Vm {
    fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn id(&self) -> ResourceId {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Vm
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        self.runtime.enter().release_on_drop(self.id);
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm").field("id", &self.id).finish()
    }
}
