/*!
 * Lifecycle Module
 * State machine, handle wrapper and child tracker shared by every resource kind
 */

pub mod state;
pub mod tracker;
pub mod wrapper;

pub use state::{LifecycleState, StateMachine};
pub use tracker::{CascadeInterrupted, ChildTracker};
pub use wrapper::{HandleWrapper, WrapperAccess};
