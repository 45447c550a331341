//! AArch64 encodings

/// `ldr x16, #8`
const LDR_X16_LIT8: u32 = 0x5800_0050;
/// `br x16`
const BR_X16: u32 = 0xd61f_0200;

/// Length of [`jmp_abs`]
pub const JMP_ABS_LEN: usize = 16;

/// Generates an absolute jump to a specified address and returns bytecode
///
/// Loads the destination from the literal after the branch into `x16`, the intra-procedure-call scratch
/// register, and branches to it.
pub fn jmp_abs(target: usize) -> [u8; JMP_ABS_LEN] {
    let mut code = [0; JMP_ABS_LEN];
    code[..4].copy_from_slice(&LDR_X16_LIT8.to_le_bytes());
    code[4..8].copy_from_slice(&BR_X16.to_le_bytes());
    code[8..].copy_from_slice(&(target as u64).to_le_bytes());
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jmp_abs() {
        assert_eq!(
            jmp_abs(0x0000_7f00_dead_beef),
            [
                0x50, 0x00, 0x00, 0x58, 0x00, 0x02, 0x1f, 0xd6, 0xef, 0xbe, 0xad, 0xde, 0x00, 0x7f,
                0x00, 0x00
            ]
        );
    }
}
