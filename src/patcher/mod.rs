//! # Patcher
//!
//! Write engines for patch targets. [`byte::BytePatcher`] does the raw copy and remembers what it overwrote;
//! [`mem::ProtectionWrapper`] runs any patcher inside the page protection sequence so it can write over code.

pub mod byte;
pub mod mem;

/// Writes bytes over a location and hands back a guard that can put the old bytes back.
///
/// # Safety
///
/// Implementors must write exactly `patch.len()` bytes at the target and nothing else, since
/// [`mem::ProtectionWrapper`] only unlocks the pages those bytes touch.
pub unsafe trait Patcher {
    /// Error raised when the patch cannot be applied. Use [`Infallible`](std::convert::Infallible) if it always applies.
    type Error;
    /// Restores the location when dropped.
    type Guard<'a>: PatchGuard + 'a
    where
        Self: 'a;

    /// Overwrites `target` with `patch`.
    ///
    /// # Safety
    ///
    /// `target` must be valid for `patch.len()` bytes, and writable unless the patcher changes protections itself
    unsafe fn patch<'a>(
        &'a self,
        target: *mut u8,
        patch: &[u8],
    ) -> Result<Self::Guard<'a>, Self::Error>;
}

/// Active patch. Dropping it writes the saved bytes back.
///
/// Guards produced through a [`mem::ProtectionWrapper`] restore through the same protect-and-write sequence
/// that applied them, and abort the process if the pages cannot be made executable again.
///
/// # Safety
///
/// Dropping must fully restore the location, whether or not `restore` was called
pub unsafe trait PatchGuard: Sized {
    /// Restores now instead of at the end of scope
    fn restore(self) {
        // the work happens in `Drop`
    }
}
