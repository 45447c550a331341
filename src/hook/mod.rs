//! # Hook
//!
//! Redirects calls to one function into another by writing a jump over its first bytes.
//!
//! Hooks sit on top of a [`Patcher`](crate::patcher::Patcher); with a
//! [`ProtectionWrapper`](crate::patcher::mem::ProtectionWrapper) underneath, applying and removing a hook both
//! go through the page protection sequence.

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
pub mod jmphook;
pub mod set;

pub use set::HookSet;

/// Redirects execution from a source function to a destination
///
/// # Safety
///
/// Overwriting live code is inherently unsafe. Implementors must document how many bytes they write at the source.
pub unsafe trait Hook {
    /// Errors from the underlying patcher
    type Error;
    /// Removes the redirect when dropped
    type Guard<'a>: HookGuard + 'a
    where
        Self: 'a;

    /// Sends every later call of `source` to `destination`.
    ///
    /// # Safety
    ///
    /// - `destination` must be executable code with the same signature and calling convention as `source`
    /// - `source` must have room for the redirect without running into the next function
    /// - no thread may be executing the first bytes of `source` while the hook is applied or removed
    unsafe fn hook(
        &self,
        source: *const u8,
        destination: *const u8,
    ) -> Result<Self::Guard<'_>, Self::Error>;
}

/// Active redirect
///
/// # Safety
///
/// Dropping must put the source back exactly as it was, whether or not `unhook` was called
pub unsafe trait HookGuard: Sized {
    /// Removes the redirect now instead of at the end of scope
    fn unhook(self) {
        // the work happens in `Drop`
    }
}
