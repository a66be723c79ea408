/*!
 * Execution Lock
 *
 * One mutex guards every piece of managed state: the resource table and, by
 * extension, every wrapper and tracker in it. `Runtime` is the cheap,
 * cloneable handle through which client objects reach it.
 */

use crate::core::config::RuntimeConfig;
use crate::core::errors::VixResult;
use crate::core::types::ResourceId;
use crate::hierarchy::table::ResourceTable;
use crate::lifecycle::wrapper::{HandleWrapper, WrapperAccess};
use crate::native::api::NativeApi;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::trace;

struct Shared {
    table: Mutex<ResourceTable>,
    api: Arc<dyn NativeApi>,
    config: RuntimeConfig,
}

/// Shared execution context: the lock, the native API and the settings
#[derive(Clone)]
pub struct Runtime {
    shared: Arc<Shared>,
}

impl Runtime {
    pub fn new(api: Arc<dyn NativeApi>) -> Self {
        Self::with_config(api, RuntimeConfig::default())
    }

    pub fn with_config(api: Arc<dyn NativeApi>, config: RuntimeConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(ResourceTable::new()),
                api,
                config,
            }),
        }
    }

    #[inline]
    pub fn api(&self) -> &Arc<dyn NativeApi> {
        &self.shared.api
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Acquire the execution lock from a thread that runs managed code
    ///
    /// The lock is not reentrant: never call this while a `Managed` guard is
    /// alive on the same thread outside a blocking section.
    pub(crate) fn enter(&self) -> Managed<'_> {
        Managed {
            table: self.shared.table.lock(),
            api: self.shared.api.as_ref(),
        }
    }

    /// Acquire the execution lock from a thread owned by the native library
    pub(crate) fn enter_foreign(&self) -> Managed<'_> {
        trace!(thread = ?std::thread::current().id(), "foreign thread entering managed code");
        self.enter()
    }

    /// Whether some thread currently holds the execution lock
    pub fn is_locked(&self) -> bool {
        self.shared.table.is_locked()
    }

    /// Entries in the resource table (open or closed, not yet dropped)
    pub fn live_resources(&self) -> usize {
        self.enter().len()
    }

    /// Resources currently in the Open state
    pub fn open_resources(&self) -> usize {
        self.enter().open_count()
    }

    /// Whether two handles share one execution context
    pub fn same_runtime(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("api", &self.shared.api)
            .field("config", &self.shared.config)
            .finish()
    }
}

/// Proof that the execution lock is held
///
/// Dereferences to the resource table. Blocking native calls go through
/// `WrapperAccess::blocking`, which gives the lock up for their duration.
pub struct Managed<'a> {
    table: MutexGuard<'a, ResourceTable>,
    api: &'a dyn NativeApi,
}

impl<'a> Managed<'a> {
    /// Native API, usable inside blocking sections
    #[inline]
    pub fn api(&self) -> &'a dyn NativeApi {
        self.api
    }
}

impl Deref for Managed<'_> {
    type Target = ResourceTable;

    fn deref(&self) -> &ResourceTable {
        &self.table
    }
}

impl DerefMut for Managed<'_> {
    fn deref_mut(&mut self) -> &mut ResourceTable {
        &mut self.table
    }
}

impl WrapperAccess for Managed<'_> {
    fn wrapper(&self, id: ResourceId) -> VixResult<&HandleWrapper> {
        self.table.entry(id).map(|entry| entry.wrapper())
    }

    fn wrapper_mut(&mut self, id: ResourceId) -> VixResult<&mut HandleWrapper> {
        self.table.entry_mut(id).map(|entry| entry.wrapper_mut())
    }

    fn blocking<R>(&mut self, op: &'static str, call: impl FnOnce() -> R) -> R {
        super::boundary::blocking(&mut self.table, op, call)
    }
}
