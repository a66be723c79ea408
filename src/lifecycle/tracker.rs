/*!
 * Child Tracker
 *
 * Per-parent LIFO collection of open children. Nodes are plain ids, with
 * the head kept at the end of the backing vector, so a cascade interrupted
 * halfway can never lose the nodes it has not reached yet.
 *
 * The parent holds the execution lock for every operation.
 */

use crate::core::errors::{VixError, VixResult};
use crate::core::limits::TRACKER_INITIAL_CAPACITY;
use std::fmt;

/// Cascade release stopped at a child that could not be released
///
/// The failed child is still the head of the tracker and everything behind
/// it is still tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeInterrupted<T, E> {
    /// Child whose release failed
    pub child: T,
    pub error: E,
    /// Children released before the failure
    pub released: usize,
    /// Children still tracked, the failed one included
    pub remaining: usize,
}

impl<T: fmt::Display, E: fmt::Display> fmt::Display for CascadeInterrupted<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cascade release stopped at child {} after {} released, {} remaining: {}",
            self.child, self.released, self.remaining, self.error
        )
    }
}

/// LIFO collection of children owned by one parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildTracker<T> {
    // head is the last element
    nodes: Vec<T>,
}

impl<T: Copy + Eq + fmt::Display> ChildTracker<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(TRACKER_INITIAL_CAPACITY),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Most recently added child
    #[inline]
    pub fn head(&self) -> Option<T> {
        self.nodes.last().copied()
    }

    #[inline]
    pub fn contains(&self, child: T) -> bool {
        self.nodes.contains(&child)
    }

    /// Children from head (newest) to tail (oldest)
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.nodes.iter().rev().copied()
    }

    /// Make `child` the new head
    #[inline]
    pub fn add(&mut self, child: T) {
        self.nodes.push(child);
    }

    /// Unlink `child` by identity
    ///
    /// A missing child is an internal error when `require_found` is set;
    /// otherwise it is ignored. Returns whether a node was unlinked.
    pub fn remove(&mut self, child: T, require_found: bool) -> VixResult<bool> {
        match self.nodes.iter().rposition(|node| *node == child) {
            Some(pos) => {
                self.nodes.remove(pos);
                Ok(true)
            }
            None if require_found => Err(VixError::internal(format!(
                "child {} was not in its parent's tracker",
                child
            ))),
            None => Ok(false),
        }
    }

    /// Drop the head node without releasing it
    ///
    /// Used after an interrupted cascade when the caller gives up on the
    /// failed child and wants to continue with the rest.
    pub fn discard_head(&mut self) -> Option<T> {
        self.nodes.pop()
    }

    /// Release every child head-to-tail
    ///
    /// `release` is the child's release-without-unlink: it must not touch
    /// this tracker. Each node is dropped only after its child released
    /// successfully. On failure the walk stops and the failed node plus the
    /// unprocessed remainder stay tracked, so the cascade can be retried.
    pub fn release_all<E, F>(&mut self, mut release: F) -> Result<usize, CascadeInterrupted<T, E>>
    where
        F: FnMut(T) -> Result<(), E>,
    {
        let mut released = 0;

        while let Some(child) = self.head() {
            match release(child) {
                Ok(()) => {
                    self.nodes.pop();
                    released += 1;
                }
                Err(error) => {
                    return Err(CascadeInterrupted {
                        child,
                        error,
                        released,
                        remaining: self.nodes.len(),
                    });
                }
            }
        }

        Ok(released)
    }
}

impl<T: Copy + Eq + fmt::Display> Default for ChildTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}
