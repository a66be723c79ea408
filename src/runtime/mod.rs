/*!
 * Runtime Module
 * The shared execution lock, the boundary around blocking native calls, and
 * the bridge for callbacks arriving on foreign threads
 */

pub mod boundary;
pub mod bridge;
pub mod lock;

pub use bridge::{Accumulator, AccumulatorShape, CallbackBridge, Converter};
pub use lock::{Managed, Runtime};
