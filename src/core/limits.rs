/*!
 * Runtime Limits and Defaults
 *
 * Centralized location for defaults and thresholds used by the runtime.
 */

use crate::core::types::Timeout;
use crate::native::constants::VIX_SERVICEPROVIDER_VMWARE_SERVER;

// =============================================================================
// CONNECTION DEFAULTS
// =============================================================================

/// Service provider used when none is configured
pub const DEFAULT_SERVICE_PROVIDER: i32 = VIX_SERVICEPROVIDER_VMWARE_SERVER;

/// Host port used when none is configured (native library picks its default)
pub const DEFAULT_HOST_PORT: u16 = 0;

/// Native API version requested on connect
pub const API_VERSION: i32 = 1;

// =============================================================================
// WAIT DEFAULTS
// =============================================================================

/// Timeout for host-wide searches (running VMs)
pub const DEFAULT_FIND_TIMEOUT: Timeout = Timeout::Infinite;

/// Timeout for waiting on guest tools
pub const DEFAULT_TOOLS_TIMEOUT: Timeout = Timeout::Infinite;

// =============================================================================
// TRACKER SIZING
// =============================================================================

/// Initial capacity of a child tracker
/// [PERF] Most hosts hold a handful of VMs, most VMs a handful of snapshots
pub const TRACKER_INITIAL_CAPACITY: usize = 4;

/// Initial capacity of the resource arena
pub const TABLE_INITIAL_CAPACITY: usize = 64;
