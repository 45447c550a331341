//! # Protect
//!
//! Page protection changes, behind a trait so the OS call can be swapped out.

use log::trace;
use region::Protection;

use crate::error::PatchError;
use crate::page::PageRange;

/// The two protection states a patch target moves between.
///
/// There is no read+write+execute variant: a page is either being written or being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Readable and writable, not executable
    ReadWrite,
    /// Readable and executable, not writable
    ReadExecute,
}

impl Access {
    /// `region` protection flags for this access
    pub fn protection(self) -> Protection {
        match self {
            Access::ReadWrite => Protection::READ_WRITE,
            Access::ReadExecute => Protection::READ_EXECUTE,
        }
    }
}

/// Changes the protection of a single page
///
/// # Safety
///
/// Implementations change the protection of live memory. Revoking execute permission on a page that
/// another thread is running will crash it.
pub unsafe trait Protector {
    /// Applies `access` to the page starting at `page`.
    ///
    /// # Safety
    ///
    /// `page` must be page-aligned and mapped in this process.
    unsafe fn protect(&self, page: usize, page_size: usize, access: Access)
        -> Result<(), region::Error>;
}

/// [`Protector`] backed by the operating system (`mprotect` on unix).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProtector;

unsafe impl Protector for SystemProtector {
    unsafe fn protect(
        &self,
        page: usize,
        page_size: usize,
        access: Access,
    ) -> Result<(), region::Error> {
        region::protect(page as *const u8, page_size, access.protection())
    }
}

unsafe impl<R: Protector + ?Sized> Protector for &R {
    unsafe fn protect(
        &self,
        page: usize,
        page_size: usize,
        access: Access,
    ) -> Result<(), region::Error> {
        (**self).protect(page, page_size, access)
    }
}

/// Applies `access` to every page in `pages`, stopping at the first failure.
///
/// Pages changed before the failing one are left as they are.
///
/// # Safety
///
/// Every page in `pages` must be mapped in this process.
pub unsafe fn protect_pages<R, E>(
    protector: &R,
    pages: PageRange,
    access: Access,
) -> Result<(), PatchError<E>>
where
    R: Protector + ?Sized,
{
    let page_size = pages.page_size();
    for page in pages {
        trace!("protecting page {:#x} as {:?}", page, access);
        if let Err(source) = protector.protect(page, page_size, access) {
            return Err(match access {
                Access::ReadWrite => PatchError::GrantWrite { page, source },
                Access::ReadExecute => PatchError::GrantExecute { page, source },
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;

    use super::*;

    /// Records every call and fails the `fail_at`th one
    struct Recorder {
        calls: RefCell<Vec<(usize, Access)>>,
        fail_at: Option<usize>,
    }

    unsafe impl Protector for Recorder {
        unsafe fn protect(
            &self,
            page: usize,
            _page_size: usize,
            access: Access,
        ) -> Result<(), region::Error> {
            let mut calls = self.calls.borrow_mut();
            calls.push((page, access));
            if Some(calls.len() - 1) == self.fail_at {
                return Err(region::Error::SystemCall(io::Error::from(
                    io::ErrorKind::PermissionDenied,
                )));
            }
            Ok(())
        }
    }

    #[test]
    /// Each page in the range gets exactly one call, in order
    fn test_protect_all_pages() {
        let recorder = Recorder {
            calls: RefCell::new(Vec::new()),
            fail_at: None,
        };
        let pages = PageRange::with_page_size(0x1ffc, 8, 0x1000);

        unsafe { protect_pages::<_, ()>(&recorder, pages, Access::ReadWrite).unwrap() };

        assert_eq!(
            *recorder.calls.borrow(),
            [(0x1000, Access::ReadWrite), (0x2000, Access::ReadWrite)]
        );
    }

    #[test]
    /// The first failure stops the walk and reports the page and direction
    fn test_stops_at_failure() {
        let recorder = Recorder {
            calls: RefCell::new(Vec::new()),
            fail_at: Some(1),
        };
        let pages = PageRange::with_page_size(0x1000, 0x3000, 0x1000);

        let err = unsafe { protect_pages::<_, ()>(&recorder, pages, Access::ReadExecute) }
            .unwrap_err();

        assert!(matches!(err, PatchError::GrantExecute { page: 0x2000, .. }));
        assert!(!err.is_recoverable());
        assert_eq!(recorder.calls.borrow().len(), 2);
    }

    #[test]
    /// Access never maps to writable and executable at once
    fn test_access_flags() {
        for access in [Access::ReadWrite, Access::ReadExecute] {
            let flags = access.protection();
            assert!(flags.contains(Protection::READ));
            assert!(!flags.contains(Protection::WRITE | Protection::EXECUTE));
        }
    }
}
