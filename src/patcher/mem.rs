//! This module contains the patcher which flips page protections to write over executable code
//!
//! Every write runs the same sequence: make each touched page read+write, copy, make each page read+execute
//! again, flush the instruction cache, then sleep for the settle delay. Pages are never read+write+execute.

use std::convert::Infallible;
use std::error::Error as _;
use std::fmt::Debug;
use std::mem::{self, ManuallyDrop};
use std::{process, ptr, thread};

use log::{debug, error};

use crate::code::cache::flush_icache;
use crate::config::InstallOptions;
use crate::error::PatchError;
use crate::lock;
use crate::page::PageRange;
use crate::protect::{protect_pages, Access, Protector, SystemProtector};

use super::{PatchGuard, Patcher};

/// Copies `bytes` over the code at `target` using the OS protector and default [`InstallOptions`].
///
/// Restoring is the same call with a saved copy of the original bytes.
///
/// # Safety
///
/// * `target` must point at mapped, executable memory valid for `bytes.len()` bytes. This is not checked.
/// * No thread may be executing inside the target range.
/// * On [`PatchError::GrantExecute`] the target is patched but not executable: the process must not run it.
pub unsafe fn install(target: *mut u8, bytes: &[u8]) -> Result<(), PatchError> {
    install_with(&SystemProtector, &InstallOptions::default(), target, bytes)
}

/// [`install`] with an explicit protector and options.
///
/// # Safety
///
/// See [`install`].
pub unsafe fn install_with<R>(
    protector: &R,
    options: &InstallOptions,
    target: *mut u8,
    bytes: &[u8],
) -> Result<(), PatchError>
where
    R: Protector + ?Sized,
{
    sequence(protector, options, target, bytes.len(), || {
        ptr::copy(bytes.as_ptr(), target, bytes.len());
        Ok(())
    })
}

/// Runs `write` with every page of `[location, location + len)` made writable.
///
/// A failure to grant write access returns before `write` runs. If `write` itself fails the pages are made
/// executable again before its error is returned. If restoring execute access fails, the value `write`
/// produced is leaked rather than dropped, since dropping a patch guard would write to the now
/// unwritable target.
unsafe fn sequence<R, T, E>(
    protector: &R,
    options: &InstallOptions,
    location: *mut u8,
    len: usize,
    write: impl FnOnce() -> Result<T, E>,
) -> Result<T, PatchError<E>>
where
    R: Protector + ?Sized,
    E: Debug,
{
    if len == 0 {
        return write().map_err(PatchError::Patcher);
    }

    let start = location as usize;
    let pages = PageRange::new(start, len);

    // protection is per page, so two patches on one page must not interleave even if their bytes don't
    let _lock = options.lock.then(|| lock::global().acquire(pages.span()));

    debug!(
        "patching {} bytes at {:#x} across {} page(s)",
        len,
        start,
        pages.clone().count()
    );

    protect_pages(protector, pages.clone(), Access::ReadWrite)?;

    let written = match write() {
        Ok(written) => written,
        Err(e) => {
            if let Err(restore) = protect_pages(protector, pages, Access::ReadExecute) {
                error!(
                    "patch at {:#x} failed ({:?}) and execute access could not be restored",
                    start, e
                );
                return Err(restore);
            }
            return Err(PatchError::Patcher(e));
        }
    };

    if let Err(e) = protect_pages(protector, pages, Access::ReadExecute) {
        mem::forget(written);
        return Err(e);
    }

    flush_icache(location, len);

    if !options.settle_delay.is_zero() {
        thread::sleep(options.settle_delay);
    }

    Ok(written)
}

/// Logs a protection failure that cannot be returned to anyone and aborts.
fn fatal<E>(err: &PatchError<E>) -> !
where
    PatchError<E>: std::error::Error,
{
    match err.source() {
        Some(source) => error!("{}: {}; aborting", err, source),
        None => error!("{}; aborting", err),
    }
    process::abort()
}

/// This struct wraps patchers to allow them to write to memory that's normally unwritable.
/// It makes the target pages writable, triggers the patch, and makes them executable again.
/// Restoring through the returned guard goes through the same sequence.
///
/// # Safety
///
/// `ProtectionWrapper` relies on the size of the patch value to determine how many pages to change write permissions,
/// pairing `ProtectionWrapper` with a patcher that writes more memory than the size of the patch is undefined behavior.
///
/// Pages are always left read+execute afterwards, whatever they were before, so the target must be code.
///
/// Wrapping one `ProtectionWrapper` in another deadlocks on the range lock unless the inner one has locking disabled.
#[derive(Debug, Default)]
pub struct ProtectionWrapper<P: Patcher, R: Protector = SystemProtector> {
    /// Underlying patcher.
    patcher: P,
    /// Changes page protections
    protector: R,
    /// Settle delay and locking
    options: InstallOptions,
}
impl<P: Patcher> ProtectionWrapper<P> {
    /// Creates a new ProtectionWrapper using the OS protector and default options
    pub fn new(patcher: P) -> Self {
        Self::with_protector(patcher, SystemProtector)
    }
}
impl<P: Patcher, R: Protector> ProtectionWrapper<P, R> {
    /// Creates a new ProtectionWrapper that changes protections through `protector`
    pub fn with_protector(patcher: P, protector: R) -> Self {
        Self {
            patcher,
            protector,
            options: InstallOptions::default(),
        }
    }

    /// Replaces the options used for both patching and restoring
    pub fn options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }
}

unsafe impl<P, R> Patcher for ProtectionWrapper<P, R>
where
    P: Patcher,
    P::Error: Debug,
    R: Protector,
{
    type Error = PatchError<P::Error>;
    type Guard<'a> = ProtectionGuard<'a, P::Guard<'a>, R> where Self: 'a;

    unsafe fn patch<'a>(
        &'a self,
        location: *mut u8,
        patch: &[u8],
    ) -> Result<Self::Guard<'a>, Self::Error> {
        let guard = sequence(&self.protector, &self.options, location, patch.len(), || {
            self.patcher.patch(location, patch)
        })?;
        Ok(ProtectionGuard {
            guard: ManuallyDrop::new(guard),
            location,
            len: patch.len(),
            protector: &self.protector,
            options: self.options,
        })
    }
}

/// Permission guard for the underlying patch guard
///
/// Dropping it restores the original bytes through the protect-and-write sequence. If the protections
/// cannot be changed at that point there is nobody to report to, so the process is aborted.
pub struct ProtectionGuard<'a, G: PatchGuard, R: Protector> {
    /// Underlying patch guard for the wrapped patcher. Only taken out in our [`Drop::drop`] impl
    guard: ManuallyDrop<G>,
    /// Location of the patch
    location: *mut u8,
    /// Length of the patch
    len: usize,
    /// Protector used to patch, reused to restore
    protector: &'a R,
    /// Options used to patch, reused to restore
    options: InstallOptions,
}
impl<G: PatchGuard, R: Protector> ProtectionGuard<'_, G, R> {
    /// Get the underlying patch guard in case info is needed
    pub fn inner(&self) -> &G {
        &self.guard
    }
}
unsafe impl<G: PatchGuard, R: Protector> PatchGuard for ProtectionGuard<'_, G, R> {}

impl<G: PatchGuard, R: Protector> Drop for ProtectionGuard<'_, G, R> {
    fn drop(&mut self) {
        // Safety: `drop` runs once and nothing touches `self.guard` afterwards
        let guard = unsafe { ManuallyDrop::take(&mut self.guard) };
        // Safety: the same range was made writable and executable when the patch was applied
        let result = unsafe {
            sequence::<_, _, Infallible>(self.protector, &self.options, self.location, self.len, || {
                guard.restore();
                Ok(())
            })
        };
        if let Err(e) = result {
            fatal(&e);
        }
    }
}
