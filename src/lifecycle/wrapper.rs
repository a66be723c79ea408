/*!
 * Handle Wrapper
 *
 * Binds one state machine to one native handle. Open / require-open / close
 * semantics are defined once here and reused by every resource kind.
 */

use super::state::{LifecycleState, StateMachine};
use crate::core::errors::{NativeResult, VixError, VixResult};
use crate::core::types::{NativeHandle, ResourceId, ResourceKind};

/// State + native handle of one resource
#[derive(Debug, Clone)]
pub struct HandleWrapper {
    id: ResourceId,
    kind: ResourceKind,
    machine: StateMachine,
    handle: NativeHandle,
}

impl HandleWrapper {
    pub fn new(id: ResourceId, kind: ResourceKind) -> Self {
        Self {
            id,
            kind,
            machine: StateMachine::new(),
            handle: NativeHandle::INVALID,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.machine.current()
    }

    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state() == LifecycleState::Open
    }

    /// Fail with a client error unless open; returns the live handle
    pub fn require_open(&self) -> VixResult<NativeHandle> {
        if self.is_open() {
            Ok(self.handle)
        } else {
            Err(VixError::not_open(self.id))
        }
    }

    fn ensure_created(&self) -> VixResult<()> {
        if self.state() == LifecycleState::Created {
            Ok(())
        } else {
            Err(VixError::internal(format!(
                "{} {} opened twice (state: {})",
                self.kind,
                self.id,
                self.state()
            )))
        }
    }

    /// Record a freshly acquired handle and move to Open
    pub fn complete_open(&mut self, handle: NativeHandle) -> VixResult<()> {
        if !handle.is_valid() {
            return Err(VixError::internal(format!(
                "native acquisition for {} {} returned the invalid handle",
                self.kind, self.id
            )));
        }
        self.machine.transition(LifecycleState::Open)?;
        self.handle = handle;
        Ok(())
    }

    /// Handle that still needs a native release, if any
    #[inline]
    pub fn releasable(&self) -> Option<NativeHandle> {
        (self.is_open() && self.handle.is_valid()).then_some(self.handle)
    }

    /// Invalidate the handle and move to Closed
    pub fn complete_close(&mut self) -> VixResult<()> {
        self.handle = NativeHandle::INVALID;
        self.machine.transition(LifecycleState::Closed)
    }
}

/// Access to wrappers that live behind the execution lock
///
/// Implemented by the lock guard of the resource table. `blocking` must give
/// the lock up for the duration of `call` and hold it again on return.
pub trait WrapperAccess {
    fn wrapper(&self, id: ResourceId) -> VixResult<&HandleWrapper>;

    fn wrapper_mut(&mut self, id: ResourceId) -> VixResult<&mut HandleWrapper>;

    fn blocking<R>(&mut self, op: &'static str, call: impl FnOnce() -> R) -> R;
}

/// Acquire the native resource for `id` and move it to Open
///
/// On native failure the state is left untouched and the error is returned;
/// the caller discards the wrapper, it is never retried.
pub fn open<A, F>(
    access: &mut A,
    id: ResourceId,
    op: &'static str,
    acquire: F,
) -> VixResult<NativeHandle>
where
    A: WrapperAccess,
    F: FnOnce() -> NativeResult<NativeHandle>,
{
    access.wrapper(id)?.ensure_created()?;

    let handle = access.blocking(op, acquire)?;

    access.wrapper_mut(id)?.complete_open(handle)?;
    Ok(handle)
}

/// Release the native resource for `id` and move it to Closed
///
/// Already-closed wrappers are left alone. A failed native release still
/// invalidates the handle and closes the wrapper before the error is
/// returned, so the handle is never released twice.
pub fn close<A, F>(access: &mut A, id: ResourceId, op: &'static str, release: F) -> VixResult<()>
where
    A: WrapperAccess,
    F: FnOnce(NativeHandle) -> NativeResult<()>,
{
    if access.wrapper(id)?.state() == LifecycleState::Closed {
        return Ok(());
    }

    let releasable = access.wrapper(id)?.releasable();
    let released = match releasable {
        Some(handle) => access.blocking(op, || release(handle)),
        None => Ok(()),
    };

    access.wrapper_mut(id)?.complete_close()?;
    released.map_err(VixError::from)
}
