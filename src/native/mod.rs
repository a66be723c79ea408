/*!
 * Native Module
 * Interface to the native virtualization library and its constant tables
 */

pub mod api;
pub mod constants;
pub mod property;
pub mod simulated;

pub use api::{EventCallback, NativeApi, NativeEvent, SnapshotParams};
pub use property::{extract_property, PropertyType, PropertyValue};
pub use simulated::{SimulatedHost, SimulatedHostBuilder};
