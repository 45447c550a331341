//! # Hook Set
//!
//! Keeps any number of active hooks alive and tears them all down at once.

use log::debug;

use super::{Hook, HookGuard};

/// Any guard, type-erased so guards of different hooks can share one list
trait Erased {}
impl<T> Erased for T {}

/// Collection of active hook guards.
///
/// Guards are released in the reverse order they were added, so stacking several hooks on the same source
/// unwinds back to the original code. Dropping the set resets it.
#[derive(Default)]
pub struct HookSet<'a> {
    /// Active guards, oldest first
    guards: Vec<Box<dyn Erased + 'a>>,
}

impl<'a> HookSet<'a> {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks `source` to `destination` with `hook` and keeps the guard.
    ///
    /// # Safety
    ///
    /// Same as [`Hook::hook`].
    pub unsafe fn apply<H: Hook>(
        &mut self,
        hook: &'a H,
        source: *const u8,
        destination: *const u8,
    ) -> Result<&mut Self, H::Error> {
        let guard = hook.hook(source, destination)?;
        self.guards.push(Box::new(guard));
        Ok(self)
    }

    /// Takes ownership of an already active guard
    pub fn push<G: HookGuard + 'a>(&mut self, guard: G) -> &mut Self {
        self.guards.push(Box::new(guard));
        self
    }

    /// Number of active hooks
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Whether no hooks are active
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Unhooks everything, newest first
    pub fn reset(&mut self) {
        if !self.guards.is_empty() {
            debug!("resetting {} hook(s)", self.guards.len());
        }
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

impl Drop for HookSet<'_> {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(all(test, any(target_arch = "x86_64", target_arch = "aarch64")))]
mod tests {
    use crate::hook::jmphook::tests::{call, forty_two, hook, return_one, seven};
    use crate::hook::Hook;

    use super::HookSet;

    #[test]
    /// Stacked hooks on one function unwind to the original on reset
    fn test_stacked_reset() {
        let memory = return_one();
        let hook = hook();
        let mut set = HookSet::new();

        unsafe {
            set.apply(&hook, memory.as_ptr(), forty_two as *const u8)
                .unwrap()
                .apply(&hook, memory.as_ptr(), seven as *const u8)
                .unwrap();
        }
        assert_eq!(set.len(), 2);
        assert_eq!(call(&memory), 7);

        set.reset();
        assert!(set.is_empty());
        assert_eq!(call(&memory), 1);
    }

    #[test]
    /// Dropping the set unhooks every function it holds
    fn test_drop_resets() {
        let first = return_one();
        let second = return_one();
        let hook = hook();
        {
            let mut set = HookSet::new();
            let guard = unsafe { hook.hook(first.as_ptr(), forty_two as *const u8) }.unwrap();
            set.push(guard);
            unsafe { set.apply(&hook, second.as_ptr(), seven as *const u8) }.unwrap();

            assert_eq!(call(&first), 42);
            assert_eq!(call(&second), 7);
        }
        assert_eq!(call(&first), 1);
        assert_eq!(call(&second), 1);
    }
}
