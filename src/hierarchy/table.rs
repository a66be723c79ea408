/*!
 * Resource Table
 *
 * Arena of every managed resource, keyed by `ResourceId`. Parents own their
 * children's tracker nodes; children store only the parent's id. The table
 * is reachable only through the execution lock.
 */

use crate::core::errors::{VixError, VixResult};
use crate::core::limits::TABLE_INITIAL_CAPACITY;
use crate::core::types::{NativeHandle, ResourceId, ResourceKind};
use crate::lifecycle::state::LifecycleState;
use crate::lifecycle::tracker::ChildTracker;
use crate::lifecycle::wrapper::HandleWrapper;
use ahash::RandomState;
use std::collections::HashMap;

/// One managed resource
#[derive(Debug, Clone)]
pub struct Entry {
    pub(super) wrapper: HandleWrapper,
    pub(super) parent: Option<ResourceId>,
    pub(super) children: ChildTracker<ResourceId>,
    pub(super) label: Option<String>,
    /// Teardown in progress; the lock may be released mid-teardown
    pub(super) closing: bool,
    /// Client handle dropped while another thread was tearing the entry down
    pub(super) dropped: bool,
}

impl Entry {
    fn new(id: ResourceId, kind: ResourceKind, label: Option<String>) -> Self {
        Self {
            wrapper: HandleWrapper::new(id, kind),
            parent: None,
            children: ChildTracker::new(),
            label,
            closing: false,
            dropped: false,
        }
    }

    #[inline]
    pub fn wrapper(&self) -> &HandleWrapper {
        &self.wrapper
    }

    #[inline]
    pub fn wrapper_mut(&mut self) -> &mut HandleWrapper {
        &mut self.wrapper
    }

    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.wrapper.kind()
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.wrapper.state()
    }

    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.wrapper.handle()
    }

    /// Parent id while tracked by the parent
    #[inline]
    pub fn parent(&self) -> Option<ResourceId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &ChildTracker<ResourceId> {
        &self.children
    }

    /// VMX path for VMs, host name for named hosts
    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[inline]
    pub fn is_closing(&self) -> bool {
        self.closing
    }
}

/// Arena of managed resources
#[derive(Debug)]
pub struct ResourceTable {
    next_id: u64,
    entries: HashMap<ResourceId, Entry, RandomState>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: HashMap::with_capacity_and_hasher(TABLE_INITIAL_CAPACITY, RandomState::new()),
        }
    }

    /// Add a Created entry under a fresh id
    pub fn insert(&mut self, kind: ResourceKind, label: Option<String>) -> ResourceId {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, Entry::new(id, kind, label));
        id
    }

    pub fn entry(&self, id: ResourceId) -> VixResult<&Entry> {
        self.entries
            .get(&id)
            .ok_or_else(|| VixError::internal(format!("resource {} is not in the table", id)))
    }

    pub fn entry_mut(&mut self, id: ResourceId) -> VixResult<&mut Entry> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| VixError::internal(format!("resource {} is not in the table", id)))
    }

    #[inline]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn remove(&mut self, id: ResourceId) -> Option<Entry> {
        self.entries.remove(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.entries.values().filter(|e| e.wrapper.is_open()).count()
    }

    /// Tracked children of `id`, most recent first
    pub fn children_of(&self, id: ResourceId) -> VixResult<Vec<ResourceId>> {
        Ok(self.entry(id)?.children.iter().collect())
    }
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::new()
    }
}
