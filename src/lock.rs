//! # Lock
//!
//! Process-wide lock over address ranges.
//!
//! Patching is not reentrant: two threads writing overlapping ranges can interleave their protection
//! changes and leave a page writable or half-written. Protection is per page, so every patch takes a
//! [`RangeLock`] on the whole pages it touches, which blocks only while another patch holds one of them.

use std::ops::Range;
use std::sync::{Condvar, Mutex, MutexGuard};

use lazy_static::lazy_static;
use log::trace;

/// Set of currently held ranges, plus a condvar signalled whenever one is released
pub struct RangeLock {
    /// Held ranges
    held: Mutex<Vec<Range<usize>>>,
    /// Notified on release
    released: Condvar,
}

lazy_static! {
    static ref PATCH_LOCK: RangeLock = RangeLock::new();
}

/// Returns the lock shared by every patch in this process
pub fn global() -> &'static RangeLock {
    &PATCH_LOCK
}

/// Whether two half-open ranges share at least one address. Empty ranges share none.
fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    !a.is_empty() && !b.is_empty() && a.start < b.end && b.start < a.end
}

impl RangeLock {
    /// Creates an empty lock. Most callers want [`global`] instead.
    pub fn new() -> Self {
        Self {
            held: Mutex::new(Vec::new()),
            released: Condvar::new(),
        }
    }

    /// Locks the held set. The set stays consistent even if a holder panicked, so poisoning is ignored.
    fn held(&self) -> MutexGuard<'_, Vec<Range<usize>>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Blocks until no held range overlaps `range`, then holds it until the guard is dropped.
    ///
    /// Empty ranges never conflict. Acquiring a range that overlaps one already held by the current
    /// thread deadlocks.
    pub fn acquire(&self, range: Range<usize>) -> RangeLockGuard<'_> {
        let mut held = self.held();
        while held.iter().any(|r| overlaps(r, &range)) {
            trace!("waiting for {:#x}..{:#x}", range.start, range.end);
            held = self
                .released
                .wait(held)
                .unwrap_or_else(|e| e.into_inner());
        }
        held.push(range.clone());
        RangeLockGuard { lock: self, range }
    }

    /// Holds `range` if nothing overlapping is held, otherwise returns `None` immediately.
    pub fn try_acquire(&self, range: Range<usize>) -> Option<RangeLockGuard<'_>> {
        let mut held = self.held();
        if held.iter().any(|r| overlaps(r, &range)) {
            return None;
        }
        held.push(range.clone());
        Some(RangeLockGuard { lock: self, range })
    }
}

impl Default for RangeLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a range of a [`RangeLock`]. Releases it when dropped.
pub struct RangeLockGuard<'a> {
    /// Lock the range is held in
    lock: &'a RangeLock,
    /// Range being held
    range: Range<usize>,
}

impl RangeLockGuard<'_> {
    /// The held range
    pub fn range(&self) -> &Range<usize> {
        &self.range
    }
}

impl Drop for RangeLockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.lock.held();
        if let Some(index) = held.iter().position(|r| *r == self.range) {
            held.swap_remove(index);
        }
        drop(held);
        self.lock.released.notify_all();
    }
}
