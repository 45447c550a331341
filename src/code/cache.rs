//! Instruction cache maintenance after code is rewritten

/// Makes freshly written instructions in `[addr, addr + len)` visible to instruction fetch.
///
/// x86-64 keeps its instruction cache coherent with data writes, so this is a no-op there. AArch64 does not,
/// and needs the data cache cleaned and the instruction cache invalidated for the range.
///
/// # Safety
///
/// `addr` must point to at least `len` bytes of mapped memory.
#[inline]
pub unsafe fn flush_icache(addr: *mut u8, len: usize) {
    #[cfg(all(target_arch = "aarch64", target_os = "macos"))]
    {
        extern "C" {
            fn sys_icache_invalidate(start: *mut core::ffi::c_void, len: usize);
        }
        sys_icache_invalidate(addr.cast(), len);
    }

    #[cfg(all(target_arch = "aarch64", not(target_os = "macos")))]
    {
        extern "C" {
            fn __clear_cache(start: *mut core::ffi::c_void, end: *mut core::ffi::c_void);
        }
        __clear_cache(addr.cast(), addr.add(len).cast());
    }

    #[cfg(not(target_arch = "aarch64"))]
    {
        let _ = (addr, len);
    }
}
