/*!
 * Close Reports
 * Outcome of tearing down one resource and everything beneath it
 */

use crate::core::errors::VixError;
use crate::core::types::{ResourceId, ResourceKind};
use serde::Serialize;
use std::fmt;

/// Which path is closing a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownMode {
    /// Explicit client close; failures are returned
    Direct,
    /// Parent is tearing down its children
    Cascade,
    /// Last client handle was dropped without a close
    Destructor,
}

impl TeardownMode {
    /// Failures on this path are logged and recorded instead of returned
    #[inline]
    pub fn suppresses_failures(self) -> bool {
        !matches!(self, TeardownMode::Direct)
    }
}

/// A teardown failure that was logged and recorded instead of returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuppressedFailure {
    pub resource: ResourceId,
    pub error: VixError,
}

/// Result of a close
#[derive(Debug, Clone, Serialize)]
pub struct CloseReport {
    pub resource: ResourceId,
    pub kind: ResourceKind,
    /// Descendants closed by the cascade
    pub children_closed: usize,
    pub suppressed: Vec<SuppressedFailure>,
    pub duration_micros: u64,
}

impl CloseReport {
    pub fn new(resource: ResourceId, kind: ResourceKind) -> Self {
        Self {
            resource,
            kind,
            children_closed: 0,
            suppressed: Vec::new(),
            duration_micros: 0,
        }
    }

    /// Every native release in the teardown succeeded
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.suppressed.is_empty()
    }

    pub(crate) fn record(&mut self, resource: ResourceId, error: VixError) {
        self.suppressed.push(SuppressedFailure { resource, error });
    }
}

impl fmt::Display for CloseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} close: {} children closed, {} suppressed failures, took {}μs",
            self.kind,
            self.resource,
            self.children_closed,
            self.suppressed.len(),
            self.duration_micros
        )
    }
}
