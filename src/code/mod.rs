//! # Code
//!
//! Pre-encoded instruction sequences to write over a patch target.
//!
//! The patching engine never looks at what it writes; these helpers only build the bytes.

pub mod aarch64;
pub mod cache;
pub mod x64;

/// Length of [`jmp_abs`] on the host architecture
#[cfg(target_arch = "x86_64")]
pub const JMP_ABS_LEN: usize = x64::JMP_ABS_LEN;
/// Length of [`jmp_abs`] on the host architecture
#[cfg(target_arch = "aarch64")]
pub const JMP_ABS_LEN: usize = aarch64::JMP_ABS_LEN;

/// Absolute jump to `target`, encoded for the host architecture
#[cfg(target_arch = "x86_64")]
pub fn jmp_abs(target: usize) -> [u8; JMP_ABS_LEN] {
    x64::jmp_abs(target)
}

/// Absolute jump to `target`, encoded for the host architecture
#[cfg(target_arch = "aarch64")]
pub fn jmp_abs(target: usize) -> [u8; JMP_ABS_LEN] {
    aarch64::jmp_abs(target)
}
