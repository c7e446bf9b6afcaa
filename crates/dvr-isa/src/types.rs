//! Core types for the RISC-V encodings the engine understands.

use std::fmt::Debug;

/// Marker type for RV32.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rv32;

/// Marker type for RV64.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rv64;

/// XLEN-dependent decoding and arithmetic parameters.
///
/// Shadow values are always carried as `u64`; `truncate` narrows a result
/// to the register width so RV32 chains wrap the way the hardware does.
pub trait Xlen: Copy + Clone + Send + Sync + Default + Debug + 'static {
    /// XLEN value (32 or 64).
    const VALUE: u8;

    /// Shift amount mask (0x1F for RV32, 0x3F for RV64).
    const SHIFT_MASK: u8;

    /// Narrow a 64-bit value to register width.
    fn truncate(val: u64) -> u64;
}

impl Xlen for Rv32 {
    const VALUE: u8 = 32;
    const SHIFT_MASK: u8 = 0x1F;

    #[inline]
    fn truncate(val: u64) -> u64 {
        val & 0xFFFF_FFFF
    }
}

impl Xlen for Rv64 {
    const VALUE: u8 = 64;
    const SHIFT_MASK: u8 = 0x3F;

    #[inline]
    fn truncate(val: u64) -> u64 {
        val
    }
}

pub const REG_ZERO: u8 = 0;
pub const REG_SP: u8 = 2;

/// Get register ABI name.
pub const fn reg_name(reg: u8) -> &'static str {
    match reg {
        0 => "zero",
        1 => "ra",
        2 => "sp",
        3 => "gp",
        4 => "tp",
        5 => "t0",
        6 => "t1",
        7 => "t2",
        8 => "s0",
        9 => "s1",
        10 => "a0",
        11 => "a1",
        12 => "a2",
        13 => "a3",
        14 => "a4",
        15 => "a5",
        16 => "a6",
        17 => "a7",
        18 => "s2",
        19 => "s3",
        20 => "s4",
        21 => "s5",
        22 => "s6",
        23 => "s7",
        24 => "s8",
        25 => "s9",
        26 => "s10",
        27 => "s11",
        28 => "t3",
        29 => "t4",
        30 => "t5",
        31 => "t6",
        _ => "??",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xlen_rv32() {
        assert_eq!(Rv32::VALUE, 32);
        assert_eq!(Rv32::SHIFT_MASK, 0x1F);
        assert_eq!(Rv32::truncate(0x1_0000_0004), 4);
    }

    #[test]
    fn test_xlen_rv64() {
        assert_eq!(Rv64::VALUE, 64);
        assert_eq!(Rv64::SHIFT_MASK, 0x3F);
        assert_eq!(Rv64::truncate(0x1_0000_0004), 0x1_0000_0004);
    }

    #[test]
    fn test_reg_name() {
        assert_eq!(reg_name(REG_ZERO), "zero");
        assert_eq!(reg_name(REG_SP), "sp");
        assert_eq!(reg_name(10), "a0");
        assert_eq!(reg_name(32), "??");
    }
}
