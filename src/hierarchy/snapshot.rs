/*!
 * Snapshot
 * Derived resource: a point-in-time snapshot belonging to a VM
 */

use super::report::{CloseReport, TeardownMode};
use super::resource::Resource;
use crate::core::errors::VixResult;
use crate::core::types::{ResourceId, ResourceKind};
use crate::lifecycle::wrapper::WrapperAccess;
use crate::native::constants::VIX_PROPERTY_SNAPSHOT_DISPLAYNAME;
use crate::runtime::lock::Runtime;
use std::fmt;

/// A snapshot handle, tracked by its VM while open
///
/// Created through `Vm::create_snapshot` or `Vm::root_snapshots`.
pub struct Snapshot {
    runtime: Runtime,
    id: ResourceId,
}

impl Snapshot {
    /// Take ownership of an entry already opened and tracked under a VM
    pub(crate) fn wrap(runtime: Runtime, id: ResourceId) -> Self {
        Self { runtime, id }
    }

    /// Release the snapshot handle and detach it from its VM
    ///
    /// Closing a closed snapshot is a client error.
    pub fn close(&self) -> VixResult<CloseReport> {
        let mut managed = self.runtime.enter();
        managed.wrapper(self.id)?.require_open()?;
        managed.close_with_unlink(self.id, TeardownMode::Direct)
    }

    /// VM tracking this snapshot; `None` once closed
    pub fn vm(&self) -> Option<ResourceId> {
        self.runtime.enter().entry(self.id).ok().and_then(|entry| entry.parent())
    }

    /// Display name as stored on the host
    pub fn display_name(&self) -> VixResult<Option<String>> {
        Ok(self.property(VIX_PROPERTY_SNAPSHOT_DISPLAYNAME)?.into_string())
    }
}

impl Resource for Snapshot {
    fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn id(&self) -> ResourceId {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Snapshot
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        self.runtime.enter().release_on_drop(self.id);
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").field("id", &self.id).finish()
    }
}
