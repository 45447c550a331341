//! Options for [`install_with`](crate::patcher::mem::install_with) and [`ProtectionWrapper`](crate::patcher::mem::ProtectionWrapper)

use std::time::Duration;

/// Default pause after a patch lands
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1);

/// Tunables for the protect-and-write sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// How long to sleep after execute permission is restored.
    ///
    /// Gives other threads that were mid-fetch inside the patched bytes a chance to move on. This is a
    /// heuristic, not a guarantee. `Duration::ZERO` skips the sleep.
    pub settle_delay: Duration,
    /// Hold the process-wide [`RangeLock`](crate::lock::RangeLock) for the target's pages while patching
    pub lock: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            lock: true,
        }
    }
}

impl InstallOptions {
    /// Creates the default options: 1ms settle delay, range locking on
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the settle delay
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Skips the range lock. The caller becomes responsible for serializing overlapping patches.
    pub fn without_lock(mut self) -> Self {
        self.lock = false;
        self
    }
}
