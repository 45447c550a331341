//! x86-64 encodings

/// Opcode and ModRM for `jmp [rip + 0]`, followed by a zero displacement
const JMP_RIP: [u8; 6] = [0xff, 0x25, 0x00, 0x00, 0x00, 0x00];

/// Length of [`jmp_abs`]
pub const JMP_ABS_LEN: usize = JMP_RIP.len() + 8;

/// Generates an absolute jump to a specified address and returns bytecode
///
/// `jmp [rip + 0]` reads the destination from the 8 bytes immediately after it, so no register is clobbered.
pub fn jmp_abs(target: usize) -> [u8; JMP_ABS_LEN] {
    let mut code = [0; JMP_ABS_LEN];
    code[..JMP_RIP.len()].copy_from_slice(&JMP_RIP);
    code[JMP_RIP.len()..].copy_from_slice(&(target as u64).to_le_bytes());
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jmp_abs() {
        assert_eq!(
            jmp_abs(0x1122_3344_5566_7788),
            [
                0xff, 0x25, 0x00, 0x00, 0x00, 0x00, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11
            ]
        );
    }
}
