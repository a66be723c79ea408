/*!
 * Core Module
 * Fundamental types, error handling, configuration and defaults
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::{ConfigError, ConfigResult, ConnectParams, RuntimeConfig};
pub use errors::*;
pub use types::*;
