//! Human-readable renderings used in trace output.

use std::fmt;

use crate::{
    DecodedOp, OpKind, Operand, decode_funct3, decode_funct7, decode_i_imm, decode_opcode,
    decode_rd, decode_rs1, decode_rs2, reg_name,
};

/// Standard 32-bit fields of a raw encoding, extracted without
/// interpretation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstrFields {
    pub raw: u32,
    pub opcode: u8,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u8,
    pub funct7: u8,
    pub imm: i32,
}

impl InstrFields {
    pub const fn extract(raw: u32) -> Self {
        Self {
            raw,
            opcode: decode_opcode(raw),
            rd: decode_rd(raw),
            rs1: decode_rs1(raw),
            rs2: decode_rs2(raw),
            funct3: decode_funct3(raw),
            funct7: decode_funct7(raw),
            imm: decode_i_imm(raw),
        }
    }

    /// Encoding format implied by the opcode.
    pub const fn format(&self) -> &'static str {
        match self.opcode {
            0x33 | 0x3B => "R",
            0x03 | 0x13 | 0x1B | 0x67 | 0x73 => "I",
            0x23 => "S",
            0x63 => "B",
            0x37 | 0x17 => "U",
            0x6F => "J",
            _ => "?",
        }
    }
}

impl fmt::Display for InstrFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "raw={:#010x} type={} opcode={:#04x} rd={} rs1={} rs2={} funct3={:#x} funct7={:#x} imm={}",
            self.raw,
            self.format(),
            self.opcode,
            reg_name(self.rd),
            reg_name(self.rs1),
            reg_name(self.rs2),
            self.funct3,
            self.funct7,
            self.imm,
        )
    }
}

fn reg(r: Option<u8>) -> &'static str {
    r.map_or("?", reg_name)
}

/// Assembly-like text for a classified instruction.
pub fn format_op(op: &DecodedOp) -> String {
    match op.kind {
        OpKind::ShiftLeft(Operand::Imm(amount)) | OpKind::Add(Operand::Imm(amount))
            if op.rs1.is_some() =>
        {
            format!("{} {}, {}, {}", op.mnemonic, reg(op.rd), reg(op.rs1), amount)
        }
        OpKind::ShiftLeft(Operand::Reg(src)) | OpKind::Add(Operand::Reg(src)) => {
            format!(
                "{} {}, {}, {}",
                op.mnemonic,
                reg(op.rd),
                reg(op.rs1),
                reg_name(src)
            )
        }
        OpKind::ShiftLeft(Operand::Imm(_)) | OpKind::Add(Operand::Imm(_)) => {
            format!("{} {}, {}", op.mnemonic, reg(op.rd), reg(op.rs2))
        }
        OpKind::LoadAddress { offset, .. } => {
            format!("{} {}, {}({})", op.mnemonic, reg(op.rd), offset, reg(op.rs1))
        }
        OpKind::Unrecognized => format!("unknown {:#010x}", op.raw),
    }
}
