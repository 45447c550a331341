//! # Jump Hook
//!
//! This hook type overwrites the start of a function with an absolute jump to its replacement

use log::debug;

use crate::code::jmp_abs;
use crate::patcher::byte::BytePatcher;
use crate::patcher::mem::ProtectionWrapper;
use crate::patcher::{PatchGuard, Patcher};

use super::{Hook, HookGuard};

/// Simple jmp hook
pub struct JmpHook<P> {
    /// Underlying patcher to be used to hook
    patcher: P,
}
impl<P: Patcher> JmpHook<P> {
    /// Creates a new jmp hook
    pub fn new(patcher: P) -> Self {
        Self { patcher }
    }
}
impl Default for JmpHook<ProtectionWrapper<BytePatcher>> {
    /// Jump hook that writes through the OS protector with default options
    fn default() -> Self {
        Self::new(ProtectionWrapper::new(BytePatcher::new()))
    }
}
unsafe impl<P: Patcher> Hook for JmpHook<P> {
    type Error = P::Error;
    type Guard<'a> = JmpHookGuard<P::Guard<'a>>
    where
        Self: 'a;

    unsafe fn hook(
        &self,
        source: *const u8,
        destination: *const u8,
    ) -> Result<Self::Guard<'_>, Self::Error> {
        debug!("redirecting {:p} to {:p}", source, destination);
        // patch with an absolute jmp to the destination
        let patch = self
            .patcher
            .patch(source as _, &jmp_abs(destination as _))?;

        Ok(JmpHookGuard::new(patch))
    }
}

/// Guard for jmp hooks
pub struct JmpHookGuard<G: PatchGuard> {
    /// Underlying patch guard that we're wrapping
    guard: G,
}
impl<G: PatchGuard> JmpHookGuard<G> {
    /// Creates a new jmp hook guard that wraps `guard`
    fn new(guard: G) -> Self {
        Self { guard }
    }
    /// Get the underlying patch guard in case info is needed
    pub fn patch(&self) -> &G {
        &self.guard
    }
}
unsafe impl<G: PatchGuard> HookGuard for JmpHookGuard<G> {}

#[cfg(test)]
pub(crate) mod tests {
    use std::mem;
    use std::time::Duration;

    use region::Protection;

    use super::*;
    use crate::config::InstallOptions;
    use crate::page::page_size;
    use crate::patcher::mem::install;

    /// `mov eax, 1; ret`
    #[cfg(target_arch = "x86_64")]
    const RETURN_ONE: &[u8] = &[0xb8, 0x01, 0x00, 0x00, 0x00, 0xc3];
    /// `mov w0, #1; ret`
    #[cfg(target_arch = "aarch64")]
    const RETURN_ONE: &[u8] = &[0x20, 0x00, 0x80, 0x52, 0xc0, 0x03, 0x5f, 0xd6];

    /// Signature of every test function
    pub(crate) type Func = extern "C" fn() -> i32;

    pub(crate) extern "C" fn forty_two() -> i32 {
        42
    }

    pub(crate) extern "C" fn seven() -> i32 {
        7
    }

    /// Allocates an executable page holding a function that returns 1
    pub(crate) fn return_one() -> region::Allocation {
        let memory = region::alloc(page_size(), Protection::READ_EXECUTE).unwrap();
        unsafe { install(memory.as_ptr::<u8>() as *mut u8, RETURN_ONE).unwrap() };
        memory
    }

    pub(crate) fn call(memory: &region::Allocation) -> i32 {
        let func: Func = unsafe { mem::transmute(memory.as_ptr::<u8>()) };
        func()
    }

    pub(crate) fn hook() -> JmpHook<ProtectionWrapper<BytePatcher>> {
        JmpHook::new(
            ProtectionWrapper::new(BytePatcher::new())
                .options(InstallOptions::new().with_settle_delay(Duration::ZERO)),
        )
    }

    #[test]
    /// Calls are redirected while the guard lives and go back to the original afterwards
    fn test_redirect() {
        let memory = return_one();
        assert_eq!(call(&memory), 1);

        let hook = hook();
        let guard = unsafe { hook.hook(memory.as_ptr(), forty_two as *const u8) }.unwrap();
        assert_eq!(call(&memory), 42);
        assert_eq!(guard.patch().inner().original()[..RETURN_ONE.len()], *RETURN_ONE);

        guard.unhook();
        assert_eq!(call(&memory), 1);
    }

    #[test]
    /// The default hook goes through the OS protector
    fn test_default() {
        let memory = return_one();
        let hook: JmpHook<ProtectionWrapper<BytePatcher>> = JmpHook::default();
        {
            let _guard = unsafe { hook.hook(memory.as_ptr(), seven as *const u8) }.unwrap();
            assert_eq!(call(&memory), 7);
        }
        assert_eq!(call(&memory), 1);
    }
}
