//! Raw-encoding classification.

use thiserror::Error;

use crate::{
    Xlen, c_funct3, c_quadrant, c_rd, c_rd_prime, c_rs1_prime, c_rs2, decode_ci_imm,
    decode_ci_ldsp_offset, decode_ci_lwsp_offset, decode_ci_shamt, decode_cl_ld_offset,
    decode_cl_lw_offset, decode_funct3, decode_funct7, decode_i_imm, decode_opcode, decode_rd,
    decode_rs1, decode_rs2, decode_shamt, instr_len, REG_SP, REG_ZERO,
};

/// Decode failures. Only truncated input is an error; an unknown but
/// complete encoding decodes to [`OpKind::Unrecognized`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty instruction buffer")]
    Empty,
    #[error("truncated instruction: have {have} bytes, need {need}")]
    Truncated { have: usize, need: usize },
}

/// Second operand of a chain operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Constant encoded in the instruction.
    Imm(i64),
    /// Value carried by an architectural source register.
    Reg(u8),
}

/// Operation family as seen by the taint engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// `value << amount`.
    ShiftLeft(Operand),
    /// `value + operand`. Register moves decode as `Add(Imm(0))`.
    Add(Operand),
    /// Memory load; the effective address is `base + offset`.
    LoadAddress { offset: i64, width: u8 },
    /// Anything else. Replays as identity.
    Unrecognized,
}

impl OpKind {
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// One classified instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedOp {
    pub kind: OpKind,
    pub mnemonic: &'static str,
    /// Raw encoding, zero-extended for compressed instructions.
    pub raw: u32,
    /// Instruction size in bytes (2 for compressed, 4 for normal).
    pub size: u8,
    pub rd: Option<u8>,
    pub rs1: Option<u8>,
    pub rs2: Option<u8>,
}

impl DecodedOp {
    const fn new(kind: OpKind, mnemonic: &'static str, raw: u32, size: u8) -> Self {
        Self {
            kind,
            mnemonic,
            raw,
            size,
            rd: None,
            rs1: None,
            rs2: None,
        }
    }

    const fn regs(mut self, rd: Option<u8>, rs1: Option<u8>, rs2: Option<u8>) -> Self {
        self.rd = rd;
        self.rs1 = rs1;
        self.rs2 = rs2;
        self
    }

    const fn unrecognized(raw: u32, size: u8) -> Self {
        Self::new(OpKind::Unrecognized, "unknown", raw, size)
    }
}

/// Classify the instruction at the start of `bytes` (little-endian).
pub fn decode<X: Xlen>(bytes: &[u8]) -> Result<DecodedOp, DecodeError> {
    let Some(&low) = bytes.first() else {
        return Err(DecodeError::Empty);
    };
    let need = instr_len(low);
    if bytes.len() < need {
        return Err(DecodeError::Truncated {
            have: bytes.len(),
            need,
        });
    }

    if need == 2 {
        Ok(decode_compressed::<X>(u16::from_le_bytes([bytes[0], bytes[1]])))
    } else {
        Ok(decode_32bit::<X>(u32::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ])))
    }
}

/// Classify a raw encoding already read from memory. The low 16 bits are
/// used alone when they mark a compressed instruction.
pub fn decode_raw<X: Xlen>(raw: u32) -> DecodedOp {
    if instr_len(raw as u8) == 2 {
        decode_compressed::<X>(raw as u16)
    } else {
        decode_32bit::<X>(raw)
    }
}

fn decode_32bit<X: Xlen>(instr: u32) -> DecodedOp {
    let opcode = decode_opcode(instr);
    let funct3 = decode_funct3(instr);
    let funct7 = decode_funct7(instr);
    let rd = decode_rd(instr);
    let rs1 = decode_rs1(instr);
    let rs2 = decode_rs2(instr);

    let op = match opcode {
        0x03 => {
            let (mnemonic, width) = match funct3 {
                0 => ("lb", 1),
                1 => ("lh", 2),
                2 => ("lw", 4),
                3 if X::VALUE == 64 => ("ld", 8),
                4 => ("lbu", 1),
                5 => ("lhu", 2),
                6 if X::VALUE == 64 => ("lwu", 4),
                _ => return DecodedOp::unrecognized(instr, 4),
            };
            let offset = i64::from(decode_i_imm(instr));
            DecodedOp::new(OpKind::LoadAddress { offset, width }, mnemonic, instr, 4)
                .regs(Some(rd), Some(rs1), None)
        }
        0x13 => match funct3 {
            0 => {
                let imm = i64::from(decode_i_imm(instr));
                DecodedOp::new(OpKind::Add(Operand::Imm(imm)), "addi", instr, 4)
                    .regs(Some(rd), Some(rs1), None)
            }
            // RV64 uses bit 25 as shamt[5]; RV32 requires it clear.
            1 if funct7 >> 1 == 0 && (X::VALUE == 64 || funct7 == 0) => {
                let shamt = decode_shamt(instr) & X::SHIFT_MASK;
                DecodedOp::new(
                    OpKind::ShiftLeft(Operand::Imm(i64::from(shamt))),
                    "slli",
                    instr,
                    4,
                )
                .regs(Some(rd), Some(rs1), None)
            }
            _ => DecodedOp::unrecognized(instr, 4),
        },
        0x33 => match (funct7, funct3) {
            (0x00, 0) => DecodedOp::new(OpKind::Add(Operand::Reg(rs2)), "add", instr, 4)
                .regs(Some(rd), Some(rs1), Some(rs2)),
            (0x00, 1) => DecodedOp::new(OpKind::ShiftLeft(Operand::Reg(rs2)), "sll", instr, 4)
                .regs(Some(rd), Some(rs1), Some(rs2)),
            _ => DecodedOp::unrecognized(instr, 4),
        },
        _ => DecodedOp::unrecognized(instr, 4),
    };

    // Writes to x0 are discarded, so they cannot carry a value forward.
    if op.kind.is_recognized()
        && !matches!(op.kind, OpKind::LoadAddress { .. })
        && rd == REG_ZERO
    {
        return DecodedOp::unrecognized(instr, 4);
    }
    op
}

fn decode_compressed<X: Xlen>(instr: u16) -> DecodedOp {
    let raw = u32::from(instr);
    match (c_quadrant(instr), c_funct3(instr)) {
        (0b00, 0b010) => {
            let offset = i64::from(decode_cl_lw_offset(instr));
            DecodedOp::new(OpKind::LoadAddress { offset, width: 4 }, "c.lw", raw, 2).regs(
                Some(c_rd_prime(instr)),
                Some(c_rs1_prime(instr)),
                None,
            )
        }
        (0b00, 0b011) if X::VALUE == 64 => {
            let offset = i64::from(decode_cl_ld_offset(instr));
            DecodedOp::new(OpKind::LoadAddress { offset, width: 8 }, "c.ld", raw, 2).regs(
                Some(c_rd_prime(instr)),
                Some(c_rs1_prime(instr)),
                None,
            )
        }
        (0b01, 0b000) => {
            let rd = c_rd(instr);
            let imm = i64::from(decode_ci_imm(instr));
            if rd == REG_ZERO {
                // c.nop
                return DecodedOp::unrecognized(raw, 2);
            }
            DecodedOp::new(OpKind::Add(Operand::Imm(imm)), "c.addi", raw, 2)
                .regs(Some(rd), Some(rd), None)
        }
        (0b10, 0b000) => {
            let rd = c_rd(instr);
            let shamt = decode_ci_shamt(instr);
            if rd == REG_ZERO || (X::VALUE == 32 && shamt & 0x20 != 0) {
                return DecodedOp::unrecognized(raw, 2);
            }
            DecodedOp::new(
                OpKind::ShiftLeft(Operand::Imm(i64::from(shamt))),
                "c.slli",
                raw,
                2,
            )
            .regs(Some(rd), Some(rd), None)
        }
        (0b10, 0b010) => {
            let rd = c_rd(instr);
            if rd == REG_ZERO {
                return DecodedOp::unrecognized(raw, 2);
            }
            let offset = i64::from(decode_ci_lwsp_offset(instr));
            DecodedOp::new(OpKind::LoadAddress { offset, width: 4 }, "c.lwsp", raw, 2)
                .regs(Some(rd), Some(REG_SP), None)
        }
        (0b10, 0b011) if X::VALUE == 64 => {
            let rd = c_rd(instr);
            if rd == REG_ZERO {
                return DecodedOp::unrecognized(raw, 2);
            }
            let offset = i64::from(decode_ci_ldsp_offset(instr));
            DecodedOp::new(OpKind::LoadAddress { offset, width: 8 }, "c.ldsp", raw, 2)
                .regs(Some(rd), Some(REG_SP), None)
        }
        (0b10, 0b100) => {
            let bit12 = (instr >> 12) & 0x1;
            let rd = c_rd(instr);
            let rs2 = c_rs2(instr);
            match (bit12, rd, rs2) {
                // c.jr / c.jalr / c.ebreak
                (_, _, 0) | (_, 0, _) => DecodedOp::unrecognized(raw, 2),
                (0, _, _) => DecodedOp::new(OpKind::Add(Operand::Imm(0)), "c.mv", raw, 2)
                    .regs(Some(rd), None, Some(rs2)),
                _ => DecodedOp::new(OpKind::Add(Operand::Reg(rs2)), "c.add", raw, 2)
                    .regs(Some(rd), Some(rd), Some(rs2)),
            }
        }
        _ => DecodedOp::unrecognized(raw, 2),
    }
}
