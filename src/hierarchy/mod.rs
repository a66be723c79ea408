/*!
 * Resource Hierarchy
 *
 * Host → Vm → Snapshot. Every resource is an entry in one arena guarded by
 * the execution lock; client handles are thin (runtime, id) pairs whose
 * `Drop` tears the entry down if the client never closed it.
 */

mod host;
mod ops;
mod report;
mod resource;
mod snapshot;
mod vm;

pub mod table;

pub use host::Host;
pub use report::{CloseReport, SuppressedFailure, TeardownMode};
pub use resource::Resource;
pub use snapshot::Snapshot;
pub use vm::Vm;
