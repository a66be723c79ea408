/*!
 * Core Types
 * Common types used across the runtime
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Raw native handle value as handed out by the native library
pub type RawHandle = i32;

/// Native property identifier
pub type PropertyId = i32;

/// Opaque native handle
///
/// Only identity and validity are meaningful. `NativeHandle::INVALID` is the
/// sentinel stored in every wrapper that is not open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeHandle(RawHandle);

impl NativeHandle {
    /// The "no handle" sentinel
    pub const INVALID: NativeHandle = NativeHandle(0);

    #[inline]
    pub const fn new(raw: RawHandle) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> RawHandle {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "<invalid>")
        }
    }
}

/// Arena index of a managed resource
///
/// Ids are handed out monotonically and never reused, so a stale id can
/// always be detected instead of aliasing a newer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three resource kinds of the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Root: connection to a host
    Host,
    /// Session: a VM opened through a host
    Vm,
    /// Derived: a snapshot belonging to a VM
    Snapshot,
}

impl ResourceKind {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Host => "host",
            ResourceKind::Vm => "vm",
            ResourceKind::Snapshot => "snapshot",
        }
    }

    /// Whether resources of this kind track children of their own
    #[inline]
    pub const fn has_children(self) -> bool {
        !matches!(self, ResourceKind::Snapshot)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wait timeout passed through to native blocking calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeout {
    /// Wait as long as the native side needs
    #[default]
    Infinite,
    /// Give up after the given number of seconds
    Seconds(u32),
}

impl Timeout {
    /// Native representation (seconds, or `NO_TIMEOUT`)
    #[inline]
    pub fn as_native(self) -> i32 {
        match self {
            Timeout::Infinite => crate::native::constants::NO_TIMEOUT,
            Timeout::Seconds(secs) => i32::try_from(secs).unwrap_or(i32::MAX),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Seconds(u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
    }
}
