/*!
 * Hierarchy Operations
 *
 * Open, cascade and close sequences shared by hosts, VMs and snapshots.
 * Every function here runs with the execution lock held; blocking native
 * calls give it up, so state read before a call is re-checked after it.
 */

use super::report::{CloseReport, TeardownMode};
use crate::core::errors::{NativeResult, VixError, VixResult};
use crate::core::types::{NativeHandle, ResourceId, ResourceKind};
use crate::lifecycle::state::LifecycleState;
use crate::lifecycle::wrapper::{self, WrapperAccess};
use crate::native::api::NativeApi;
use crate::runtime::lock::Managed;
use std::time::Instant;
use tracing::{debug, error, warn};

fn release_op(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Host => "disconnect",
        ResourceKind::Vm | ResourceKind::Snapshot => "release_handle",
    }
}

fn already_closing(id: ResourceId) -> VixError {
    VixError::client(format!("resource {} is already being closed", id))
}

fn release(api: &dyn NativeApi, kind: ResourceKind, handle: NativeHandle) -> NativeResult<()> {
    match kind {
        ResourceKind::Host => api.disconnect(handle),
        ResourceKind::Vm | ResourceKind::Snapshot => api.release_handle(handle),
    }
}

impl Managed<'_> {
    /// Live handle of `id`, which must be open and not mid-teardown
    pub(crate) fn require_usable(&self, id: ResourceId) -> VixResult<NativeHandle> {
        let entry = self.entry(id)?;
        if entry.closing {
            return Err(VixError::client(format!(
                "{} {} is being closed",
                entry.kind(),
                id
            )));
        }
        entry.wrapper.require_open()
    }

    /// Run one blocking native call against the open resource `id`
    pub(crate) fn call_open<R, F>(
        &mut self,
        id: ResourceId,
        op: &'static str,
        call: F,
    ) -> VixResult<R>
    where
        F: FnOnce(&dyn NativeApi, NativeHandle) -> NativeResult<R>,
    {
        let handle = self.require_usable(id)?;
        let api = self.api();
        Ok(self.blocking(op, || call(api, handle))?)
    }

    /// Create and open a resource with no parent
    ///
    /// A failed acquisition leaves nothing behind.
    pub(crate) fn open_root<F>(
        &mut self,
        kind: ResourceKind,
        label: Option<String>,
        op: &'static str,
        acquire: F,
    ) -> VixResult<ResourceId>
    where
        F: FnOnce(&dyn NativeApi) -> NativeResult<NativeHandle>,
    {
        let id = self.insert(kind, label);
        let api = self.api();
        match wrapper::open(self, id, op, || acquire(api)) {
            Ok(handle) => {
                debug!(resource = %id, %kind, %handle, "opened");
                Ok(id)
            }
            Err(err) => {
                self.remove(id);
                Err(err)
            }
        }
    }

    /// Create and open a resource under `parent`, then track it there
    ///
    /// `acquire` receives the parent's handle. If the parent was closed
    /// while the lock was released, the fresh handle is given back and the
    /// open fails with a client error.
    pub(crate) fn open_child<F>(
        &mut self,
        parent: ResourceId,
        kind: ResourceKind,
        label: Option<String>,
        op: &'static str,
        acquire: F,
    ) -> VixResult<ResourceId>
    where
        F: FnOnce(&dyn NativeApi, NativeHandle) -> NativeResult<NativeHandle>,
    {
        let parent_handle = self.require_usable(parent)?;
        let id = self.insert(kind, label);
        let api = self.api();

        if let Err(err) = wrapper::open(self, id, op, || acquire(api, parent_handle)) {
            self.remove(id);
            return Err(err);
        }

        if let Err(err) = self.adopt_child(parent, id) {
            let mut report = CloseReport::new(id, kind);
            let given_back = self.close_without_unlink(id, TeardownMode::Destructor, &mut report);
            if let Err(release_err) = given_back {
                error!(resource = %id, error = %release_err, "failed to give back orphaned handle");
            }
            self.remove(id);
            return Err(err);
        }

        debug!(resource = %id, %kind, parent = %parent, "opened");
        Ok(id)
    }

    /// Make the freshly opened `child` the head of `parent`'s tracker
    pub(crate) fn adopt_child(&mut self, parent: ResourceId, child: ResourceId) -> VixResult<()> {
        let entry = self.entry_mut(parent)?;
        if entry.closing || !entry.wrapper.is_open() {
            return Err(VixError::client(format!(
                "{} {} was closed before child {} finished opening",
                entry.kind(),
                parent,
                child
            )));
        }
        entry.children.add(child);
        self.entry_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Close `id` and everything beneath it, leaving its parent's tracker alone
    ///
    /// Children are cascaded before the resource's own handle is released.
    /// On suppressing paths a failed release is recorded in `report` and the
    /// resource still ends up Closed with an invalid handle.
    pub(crate) fn close_without_unlink(
        &mut self,
        id: ResourceId,
        mode: TeardownMode,
        report: &mut CloseReport,
    ) -> VixResult<()> {
        let entry = self.entry_mut(id)?;
        if entry.closing {
            return match mode {
                TeardownMode::Direct => Err(already_closing(id)),
                _ => Ok(()),
            };
        }
        entry.closing = true;
        let kind = entry.kind();

        if kind.has_children() {
            if let Err(err) = self.cascade(id, report) {
                self.suppress(id, err, report);
            }
        }

        let api = self.api();
        let closed = wrapper::close(self, id, release_op(kind), |handle| {
            release(api, kind, handle)
        });
        if let Ok(entry) = self.entry_mut(id) {
            entry.closing = false;
        }

        match closed {
            Ok(()) => {
                debug!(resource = %id, %kind, ?mode, "closed");
                Ok(())
            }
            Err(err) if mode.suppresses_failures() => {
                self.suppress(id, err, report);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Close `id`, then remove it from its parent's tracker
    ///
    /// On the direct path the resource is unlinked even when its native
    /// release failed, and the release error is returned afterwards.
    pub(crate) fn close_with_unlink(
        &mut self,
        id: ResourceId,
        mode: TeardownMode,
    ) -> VixResult<CloseReport> {
        let start = Instant::now();
        let entry = self.entry(id)?;
        let mut report = CloseReport::new(id, entry.kind());

        if entry.closing {
            return match mode {
                TeardownMode::Direct => Err(already_closing(id)),
                _ => Ok(report),
            };
        }

        let closed = self.close_without_unlink(id, mode, &mut report);
        let unlinked = self.unlink(id);
        report.duration_micros = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        if mode.suppresses_failures() {
            if let Err(err) = closed.and(unlinked) {
                self.suppress(id, err, &mut report);
            }
        } else {
            closed?;
            unlinked?;
        }
        Ok(report)
    }

    /// Drain the tracker of `id` head to tail
    ///
    /// The tracker stays in the entry for the whole walk and the head is
    /// re-read after every child, so a sibling closed or dropped while the
    /// lock was released has already unlinked itself. Each child is closed
    /// in cascade mode, so native failures never stop the walk. A child that
    /// cannot be closed at all is logged and forced closed before its node
    /// is dropped.
    fn cascade(&mut self, id: ResourceId, report: &mut CloseReport) -> VixResult<()> {
        let pending = self.entry(id)?.children.len();
        if pending > 0 {
            debug!(parent = %id, children = pending, "cascading close");
        }

        while let Some(child) = self.entry(id)?.children.head() {
            match self.release_tracked_child(child, report) {
                Ok(true) => report.children_closed += 1,
                Ok(false) => {}
                Err(err) => {
                    error!(parent = %id, %child, error = %err, "cascade could not close child");
                    self.force_closed(child);
                    report.record(child, err);
                }
            }
            self.entry_mut(id)?.children.remove(child, true)?;
        }
        Ok(())
    }

    /// Close one tracked child without unlinking it
    ///
    /// Returns whether this walk is what moved the child from Open to
    /// Closed. A child already under a direct close is left to that closer,
    /// and one that left the table while the lock was released is done.
    fn release_tracked_child(
        &mut self,
        child: ResourceId,
        report: &mut CloseReport,
    ) -> VixResult<bool> {
        let Ok(entry) = self.entry(child) else {
            return Ok(false);
        };
        let owned = !entry.closing && entry.state() == LifecycleState::Open;

        self.close_without_unlink(child, TeardownMode::Cascade, report)?;
        let Ok(entry) = self.entry_mut(child) else {
            return Ok(owned);
        };
        entry.parent = None;
        if entry.dropped && !entry.closing {
            self.remove(child);
        }
        Ok(owned)
    }

    /// Last resort for a child the cascade could not close
    fn force_closed(&mut self, id: ResourceId) {
        let Ok(entry) = self.entry_mut(id) else {
            return;
        };
        entry.parent = None;
        entry.closing = false;
        if entry.state() != LifecycleState::Closed {
            if let Err(err) = entry.wrapper.complete_close() {
                error!(resource = %id, error = %err, "failed to force resource closed");
            }
        }
        if entry.dropped {
            self.remove(id);
        }
    }

    fn unlink(&mut self, id: ResourceId) -> VixResult<()> {
        let Some(parent) = self.entry_mut(id)?.parent.take() else {
            return Ok(());
        };
        self.entry_mut(parent)?.children.remove(id, true)?;
        Ok(())
    }

    fn suppress(&mut self, id: ResourceId, err: VixError, report: &mut CloseReport) {
        if err.is_internal() {
            error!(resource = %id, error = %err, "teardown failed");
        } else {
            warn!(resource = %id, error = %err, "native release failed during teardown");
        }
        report.record(id, err);
    }

    /// Teardown for a client handle that went away
    ///
    /// Never fails. An open resource is closed with every failure
    /// suppressed; the entry leaves the table once nothing is tearing it
    /// down.
    pub(crate) fn release_on_drop(&mut self, id: ResourceId) {
        let Ok(entry) = self.entry_mut(id) else {
            warn!(resource = %id, "dropped handle for a resource that is not in the table");
            return;
        };
        if entry.closing {
            entry.dropped = true;
            return;
        }

        if entry.state() == LifecycleState::Open {
            match self.close_with_unlink(id, TeardownMode::Destructor) {
                Ok(report) if report.is_clean() => debug!(%report, "released on drop"),
                Ok(report) => warn!(%report, "released on drop with failures"),
                Err(err) => error!(resource = %id, error = %err, "release on drop failed"),
            }
        }
        self.remove(id);
    }
}
