/*!
 * Resource Trait
 *
 * Behavior common to every client-side resource handle. Implementors only
 * say where they live; state, handle and property access come for free.
 */

use crate::core::errors::VixResult;
use crate::core::types::{NativeHandle, PropertyId, ResourceId, ResourceKind};
use crate::lifecycle::state::LifecycleState;
use crate::lifecycle::wrapper::WrapperAccess;
use crate::native::property::{self, PropertyValue};
use crate::runtime::lock::Runtime;

/// A client handle onto one entry of the resource table
pub trait Resource {
    fn runtime(&self) -> &Runtime;

    fn id(&self) -> ResourceId;

    fn kind(&self) -> ResourceKind;

    /// Current lifecycle state
    fn state(&self) -> LifecycleState {
        self.runtime()
            .enter()
            .entry(self.id())
            .map(|entry| entry.state())
            .unwrap_or(LifecycleState::Closed)
    }

    /// Native handle; invalid unless open
    fn handle(&self) -> NativeHandle {
        self.runtime()
            .enter()
            .entry(self.id())
            .map(|entry| entry.handle())
            .unwrap_or(NativeHandle::INVALID)
    }

    /// True once the resource is known to be closed
    fn is_closed(&self) -> bool {
        self.state() != LifecycleState::Open
    }

    /// Read a native property
    fn property(&self, id: PropertyId) -> VixResult<PropertyValue> {
        let mut managed = self.runtime().enter();
        let handle = managed.require_usable(self.id())?;
        let api = managed.api();
        managed.blocking("property", || property::extract_property(api, handle, id))
    }

    /// Properties are read-only; this always fails
    fn set_property(&self, id: PropertyId, value: &PropertyValue) -> VixResult<()> {
        let managed = self.runtime().enter();
        managed.require_usable(self.id())?;
        property::set_property(id, value)
    }
}
