//! This module contains a byte patcher

use std::convert::Infallible;
use std::ptr;

use super::{PatchGuard, Patcher};

/// Patcher for overwriting memory with byte arrays, saving whatever was there first.
///
/// Performs no protection changes, so on its own it only works on memory that is already writable.
/// Wrap it in a [`ProtectionWrapper`](super::mem::ProtectionWrapper) to patch code.
/// This patcher never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytePatcher;
impl BytePatcher {
    /// Creates a new [`BytePatcher`]
    pub fn new() -> Self {
        Self::default()
    }
}
unsafe impl Patcher for BytePatcher {
    type Error = Infallible;
    type Guard<'a> = BytePatchGuard;

    unsafe fn patch<'a>(
        &'a self,
        location: *mut u8,
        patch: &[u8],
    ) -> Result<Self::Guard<'a>, Self::Error> {
        Ok(BytePatchGuard::patch(location, patch))
    }
}
/// Guard for byte-patches
///
/// See [`BytePatcher`].
#[derive(Debug)]
pub struct BytePatchGuard {
    /// Original data from `location`
    original: Vec<u8>,
    /// Location of the patch
    location: *mut u8,
}
impl BytePatchGuard {
    /// Patches a location, returning a guard for unpatching
    ///
    /// # Safety
    ///
    /// `location` must be valid for reads and writes of `patch.len()` bytes
    unsafe fn patch(location: *mut u8, patch: &[u8]) -> Self {
        // Safety: caller must pass in a `location` pointer that is valid for the full length of the patch
        let original = std::slice::from_raw_parts(location, patch.len()).to_vec();

        // Safety: caller must ensure that `location` is writable
        ptr::copy(patch.as_ptr(), location, patch.len());

        Self { original, location }
    }

    /// Bytes that were at the location before the patch
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// Location of the patch
    pub fn location(&self) -> *mut u8 {
        self.location
    }
}
unsafe impl PatchGuard for BytePatchGuard {}
impl Drop for BytePatchGuard {
    fn drop(&mut self) {
        // Safety: creator must pass in a `location` pointer that is valid and writable for the full length of the patch
        unsafe {
            ptr::copy(self.original.as_ptr(), self.location, self.original.len());
        }
    }
}
