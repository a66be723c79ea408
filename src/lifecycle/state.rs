/*!
 * Lifecycle State Machine
 *
 * Three-state lifecycle shared by every resource kind:
 * Created → Open → Closed. Carries no resource-specific logic.
 */

use crate::core::errors::{VixError, VixResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a wrapped native handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed, native resource not yet acquired
    Created,
    /// Native resource acquired and usable
    Open,
    /// Terminal
    Closed,
}

impl LifecycleState {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Open => "open",
            LifecycleState::Closed => "closed",
        }
    }

    /// Validate `self -> requested` and return the new state
    ///
    /// Every rejection is an internal error: callers never re-initialize,
    /// never open twice, and never close twice through this path.
    pub fn transition(self, requested: LifecycleState) -> VixResult<LifecycleState> {
        match requested {
            LifecycleState::Created => Err(VixError::internal(
                "should never enter CREATED after the creation phase",
            )),
            LifecycleState::Open if self != LifecycleState::Created => Err(VixError::internal(
                format!("should only enter OPEN from CREATED (current: {})", self),
            )),
            LifecycleState::Closed if self == LifecycleState::Closed => Err(VixError::internal(
                "cannot enter CLOSED, because already closed",
            )),
            _ => Ok(requested),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holder for one lifecycle state value
///
/// Construction is the only place the state is set without validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachine {
    current: LifecycleState,
}

impl StateMachine {
    #[inline]
    pub const fn new() -> Self {
        Self {
            current: LifecycleState::Created,
        }
    }

    #[inline]
    pub const fn current(&self) -> LifecycleState {
        self.current
    }

    /// Move to `requested`, leaving the state untouched on rejection
    pub fn transition(&mut self, requested: LifecycleState) -> VixResult<()> {
        self.current = self.current.transition(requested)?;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
