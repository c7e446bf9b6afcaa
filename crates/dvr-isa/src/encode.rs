//! Bit-field extraction for standard and compressed RISC-V encodings.

/// Length in bytes of the instruction whose first byte is `low`.
///
/// Bits [1:0] != 0b11 marks a 16-bit compressed encoding.
#[inline]
pub const fn instr_len(low: u8) -> usize {
    if low & 0x03 == 0x03 { 4 } else { 2 }
}

/// Decode I-type immediate (bits [31:20] sign-extended).
#[inline]
pub const fn decode_i_imm(instr: u32) -> i32 {
    (instr as i32) >> 20
}

/// Decode the shift amount of an immediate shift (bits [25:20]).
#[inline]
pub const fn decode_shamt(instr: u32) -> u8 {
    ((instr >> 20) & 0x3F) as u8
}

/// Extract rd field (bits [11:7]).
#[inline]
pub const fn decode_rd(instr: u32) -> u8 {
    ((instr >> 7) & 0x1F) as u8
}

/// Extract rs1 field (bits [19:15]).
#[inline]
pub const fn decode_rs1(instr: u32) -> u8 {
    ((instr >> 15) & 0x1F) as u8
}

/// Extract rs2 field (bits [24:20]).
#[inline]
pub const fn decode_rs2(instr: u32) -> u8 {
    ((instr >> 20) & 0x1F) as u8
}

/// Extract funct3 field (bits [14:12]).
#[inline]
pub const fn decode_funct3(instr: u32) -> u8 {
    ((instr >> 12) & 0x7) as u8
}

/// Extract funct7 field (bits [31:25]).
#[inline]
pub const fn decode_funct7(instr: u32) -> u8 {
    ((instr >> 25) & 0x7F) as u8
}

/// Extract opcode field (bits [6:0]).
#[inline]
pub const fn decode_opcode(instr: u32) -> u8 {
    (instr & 0x7F) as u8
}

// ===== Compressed =====

/// Quadrant (bits [1:0]) of a compressed instruction.
#[inline]
pub const fn c_quadrant(instr: u16) -> u8 {
    (instr & 0x3) as u8
}

/// funct3 (bits [15:13]) of a compressed instruction.
#[inline]
pub const fn c_funct3(instr: u16) -> u8 {
    ((instr >> 13) & 0x7) as u8
}

/// Full rd/rs1 field (bits [11:7]).
#[inline]
pub const fn c_rd(instr: u16) -> u8 {
    ((instr >> 7) & 0x1F) as u8
}

/// Full rs2 field (bits [6:2]).
#[inline]
pub const fn c_rs2(instr: u16) -> u8 {
    ((instr >> 2) & 0x1F) as u8
}

/// Popular-register rd' field (bits [4:2]) mapped to x8..x15.
#[inline]
pub const fn c_rd_prime(instr: u16) -> u8 {
    ((instr >> 2) & 0x7) as u8 + 8
}

/// Popular-register rs1' field (bits [9:7]) mapped to x8..x15.
#[inline]
pub const fn c_rs1_prime(instr: u16) -> u8 {
    ((instr >> 7) & 0x7) as u8 + 8
}

/// CI-format 6-bit signed immediate.
#[inline]
pub const fn decode_ci_imm(instr: u16) -> i8 {
    let imm = (((instr >> 2) & 0x1F) | (((instr >> 12) & 0x1) << 5)) as u8;
    ((imm as i8) << 2) >> 2
}

/// CI-format shift amount (bit 12 is shamt[5]).
#[inline]
pub const fn decode_ci_shamt(instr: u16) -> u8 {
    (((instr >> 2) & 0x1F) | (((instr >> 12) & 0x1) << 5)) as u8
}

/// C.LW offset.
#[inline]
pub const fn decode_cl_lw_offset(instr: u16) -> u8 {
    ((((instr >> 6) & 0x1) << 2) | (((instr >> 10) & 0x7) << 3) | (((instr >> 5) & 0x1) << 6)) as u8
}

/// C.LD offset.
#[inline]
pub const fn decode_cl_ld_offset(instr: u16) -> u8 {
    ((((instr >> 10) & 0x7) << 3) | (((instr >> 5) & 0x3) << 6)) as u8
}

/// C.LWSP offset.
#[inline]
pub const fn decode_ci_lwsp_offset(instr: u16) -> u8 {
    ((((instr >> 4) & 0x7) << 2) | (((instr >> 12) & 0x1) << 5) | (((instr >> 2) & 0x3) << 6)) as u8
}

/// C.LDSP offset.
#[inline]
pub const fn decode_ci_ldsp_offset(instr: u16) -> u16 {
    (((instr >> 5) & 0x3) << 3) | (((instr >> 12) & 0x1) << 5) | (((instr >> 2) & 0x7) << 6)
}
