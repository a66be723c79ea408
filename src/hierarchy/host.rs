/*!
 * Host
 *
 * Root of the hierarchy: one connection to a virtualization host. Closing
 * it closes every VM opened through it, and every snapshot beneath those,
 * before the connection itself is released.
 */

use super::report::{CloseReport, TeardownMode};
use super::resource::Resource;
use super::vm::Vm;
use crate::core::config::ConnectParams;
use crate::core::errors::VixResult;
use crate::core::types::{ResourceId, ResourceKind, Timeout};
use crate::lifecycle::wrapper::WrapperAccess;
use crate::native::constants::VIX_FIND_RUNNING_VMS;
use crate::runtime::bridge;
use crate::runtime::lock::Runtime;
use std::fmt;
use tracing::info;

/// Connection to a virtualization host
pub struct Host {
    runtime: Runtime,
    id: ResourceId,
}

impl Host {
    /// Connect with `params`
    pub fn connect(runtime: &Runtime, params: &ConnectParams) -> VixResult<Host> {
        let id = runtime
            .enter()
            .open_root(ResourceKind::Host, params.host_name.clone(), "connect", |api| {
                api.connect(params)
            })?;

        info!(
            resource = %id,
            host = params.host_name.as_deref().unwrap_or("localhost"),
            "connected to host"
        );
        Ok(Host {
            runtime: runtime.clone(),
            id,
        })
    }

    /// Close every open VM, then the connection
    ///
    /// Closing a closed host is a client error.
    pub fn close(&self) -> VixResult<CloseReport> {
        let mut managed = self.runtime.enter();
        managed.wrapper(self.id)?.require_open()?;
        let report = managed.close_with_unlink(self.id, TeardownMode::Direct)?;
        info!(%report, "host closed");
        Ok(report)
    }

    /// Paths of the VMs currently running on the host, in the order the
    /// host reported them
    pub fn find_running_vm_paths(&self) -> VixResult<Vec<String>> {
        self.find_vm_paths(VIX_FIND_RUNNING_VMS, self.runtime.config().find_timeout)
    }

    fn find_vm_paths(&self, search: i32, timeout: Timeout) -> VixResult<Vec<String>> {
        let (bridge, accumulator) = bridge::found_item_locations(self.runtime.clone());
        let callback = bridge.into_callback();

        let mut managed = self.runtime.enter();
        let handle = managed.require_usable(self.id)?;
        let api = managed.api();
        let wait = managed.blocking("find_items", || {
            api.find_items(handle, search, timeout, callback)
        });
        drop(managed);

        accumulator.finish(wait)
    }

    pub fn register_vm(&self, vmx_path: &str) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "register_vm", |api, handle| api.register_vm(handle, vmx_path))
    }

    /// Unregistering a VM the host does not know is not an error
    pub fn unregister_vm(&self, vmx_path: &str) -> VixResult<()> {
        self.runtime
            .enter()
            .call_open(self.id, "unregister_vm", |api, handle| api.unregister_vm(handle, vmx_path))
    }

    /// Open the VM at `vmx_path`; it becomes the newest child of this host
    pub fn open_vm(&self, vmx_path: &str) -> VixResult<Vm> {
        Vm::open(self, vmx_path)
    }

    /// Open VMs, most recently opened first
    pub fn open_vms(&self) -> VixResult<Vec<ResourceId>> {
        self.runtime.enter().children_of(self.id)
    }

    /// Host name this connection was made to; `None` for the local host
    pub fn host_name(&self) -> Option<String> {
        self.runtime
            .enter()
            .entry(self.id)
            .ok()
            .and_then(|entry| entry.label().map(str::to_string))
    }
}

impl Resource for Host {
    fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn id(&self) -> ResourceId {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Host
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.runtime.enter().release_on_drop(self.id);
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").field("id", &self.id).finish()
    }
}
