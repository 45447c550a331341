//! # Page
//!
//! Page-boundary arithmetic for patch targets.
//!
//! Protection can only be changed a whole page at a time, so before writing `len` bytes at `address`
//! we need every page the half-open range `[address, address + len)` touches.

use std::iter::FusedIterator;
use std::ops::Range;

/// Returns the operating system's page size.
///
/// The value is queried from the OS once and cached by `region`.
pub fn page_size() -> usize {
    region::page::size()
}

/// Rounds `address` down to the start of its page.
///
/// `page_size` must be a power of two.
pub fn page_floor(address: usize, page_size: usize) -> usize {
    address & !(page_size - 1)
}

/// Number of bytes from `address` to the end of its page.
///
/// Writing at most this many bytes at `address` touches a single page.
pub fn writable_capacity(address: usize) -> usize {
    let size = page_size();
    size - (address - page_floor(address, size))
}

/// Number of pages touched by `len` bytes starting at `address`.
pub fn pages_spanned(address: usize, len: usize) -> usize {
    PageRange::new(address, len).count()
}

/// Lazy iterator over the start addresses of every page touched by `[address, address + len)`.
///
/// Starts at the page containing `address` and advances one page at a time while the page start is
/// strictly below `address + len`. The end is computed with saturating arithmetic, so a range that
/// would run past the top of the address space stops at the last page instead of wrapping.
#[derive(Debug, Clone)]
pub struct PageRange {
    /// Start of the next page to yield
    current: usize,
    /// Exclusive end of the target range
    end: usize,
    /// Distance between pages
    page_size: usize,
    /// Set once `current` can no longer advance without overflowing
    done: bool,
}

impl PageRange {
    /// Creates a range over the pages touched by `len` bytes at `address`, using the OS page size.
    pub fn new(address: usize, len: usize) -> Self {
        Self::with_page_size(address, len, page_size())
    }

    /// Creates a range using an explicit `page_size`, which must be a non-zero power of two.
    pub fn with_page_size(address: usize, len: usize, page_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two());
        Self {
            current: page_floor(address, page_size),
            end: address.saturating_add(len),
            page_size,
            done: len == 0,
        }
    }

    /// Page size this range steps by
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Page-aligned address range covering every page still to be yielded.
    ///
    /// Two patches whose spans are disjoint never change the protection of the same page. The end
    /// saturates at the top of the address space. Empty when there are no pages left.
    pub fn span(&self) -> Range<usize> {
        if self.done || self.current >= self.end {
            return self.current..self.current;
        }
        let last = page_floor(self.end - 1, self.page_size);
        self.current..last.saturating_add(self.page_size)
    }
}

impl Iterator for PageRange {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current >= self.end {
            return None;
        }

        let page = self.current;
        match self.current.checked_add(self.page_size) {
            Some(next) => self.current = next,
            None => self.done = true,
        }
        Some(page)
    }
}

impl FusedIterator for PageRange {}
