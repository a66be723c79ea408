/*!
 * VIX Runtime Library
 * Lifecycle management for native virtualization handles: hosts, VMs and
 * snapshots behind one shared execution lock
 */

pub mod core;
pub mod hierarchy;
pub mod lifecycle;
pub mod monitoring;
pub mod native;
pub mod runtime;

// Re-exports
pub use crate::core::config::{ConfigError, ConnectParams, RuntimeConfig};
pub use crate::core::errors::{ErrorKind, NativeError, NativeResult, VixError, VixResult};
pub use crate::core::types::{NativeHandle, PropertyId, ResourceId, ResourceKind, Timeout};
pub use hierarchy::{CloseReport, Host, Resource, Snapshot, SuppressedFailure, TeardownMode, Vm};
pub use lifecycle::{ChildTracker, LifecycleState, StateMachine};
pub use monitoring::init_tracing;
pub use native::{NativeApi, PropertyValue, SimulatedHost, SnapshotParams};
pub use runtime::Runtime;
