//! Errors raised while patching

use std::convert::Infallible;

use thiserror::Error;

/// Errors from the protect-and-write sequence
///
/// Both protection variants carry the untranslated error from the OS layer. Neither is recoverable: a
/// failed write grant may already have left earlier pages writable, and a failed execute grant leaves the
/// target patched but not runnable.
#[derive(Debug, Error)]
pub enum PatchError<E = Infallible> {
    /// Making a page writable failed. Nothing was copied.
    #[error("failed to make page {page:#x} writable")]
    GrantWrite {
        /// Start of the page that failed
        page: usize,
        /// Error from the OS layer
        #[source]
        source: region::Error,
    },
    /// Restoring execute permission on a page failed after the bytes were written
    #[error("failed to make page {page:#x} executable again")]
    GrantExecute {
        /// Start of the page that failed
        page: usize,
        /// Error from the OS layer
        #[source]
        source: region::Error,
    },
    /// Custom error type from the underlying patcher
    #[error("{0}")]
    Patcher(E),
}

impl<E> PatchError<E> {
    /// Page whose protection change failed, if this is a protection error
    pub fn page(&self) -> Option<usize> {
        match self {
            Self::GrantWrite { page, .. } | Self::GrantExecute { page, .. } => Some(*page),
            Self::Patcher(_) => None,
        }
    }

    /// Whether the process can keep running the patched code after this error.
    ///
    /// Protection failures never are; only the wrapped patcher's own errors might be.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Patcher(_))
    }
}
