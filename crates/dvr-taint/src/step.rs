//! Recorded arithmetic steps of a dependency chain.

use std::fmt;

use dvr_isa::{OpKind, Operand, Xlen};

use crate::Hex;

/// Operation family of a compute step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepKind {
    ShiftLeft,
    Add,
    LoadAddress,
    Unrecognized,
}

impl StepKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShiftLeft => "shl",
            Self::Add => "add",
            Self::LoadAddress => "lea",
            Self::Unrecognized => "unknown",
        }
    }

    /// Apply the operation to a running chain value.
    pub fn apply<X: Xlen>(self, value: u64, operand2: u64) -> u64 {
        match self {
            Self::ShiftLeft => {
                let amount = u32::from(operand2 as u8 & X::SHIFT_MASK);
                X::truncate(value << amount)
            }
            Self::Add | Self::LoadAddress => X::truncate(value.wrapping_add(operand2)),
            Self::Unrecognized => value,
        }
    }
}

/// Map a decoded operation onto a step kind and its captured second operand.
///
/// `tainted_src` is the source operand index carrying the chain value and
/// `other_value` reads the remaining register operand when the encoding
/// names one. A shift whose *amount* is the chain value is not replayable
/// and resolves to `Unrecognized`.
pub fn resolve(
    kind: OpKind,
    tainted_src: usize,
    other_value: impl FnOnce() -> u64,
) -> (StepKind, u64) {
    match kind {
        OpKind::ShiftLeft(Operand::Imm(amount)) => (StepKind::ShiftLeft, amount as u64),
        OpKind::ShiftLeft(Operand::Reg(_)) if tainted_src == 0 => {
            (StepKind::ShiftLeft, other_value())
        }
        OpKind::Add(Operand::Imm(imm)) => (StepKind::Add, imm as u64),
        OpKind::Add(Operand::Reg(_)) => (StepKind::Add, other_value()),
        OpKind::LoadAddress { offset, .. } => (StepKind::LoadAddress, offset as u64),
        OpKind::ShiftLeft(Operand::Reg(_)) | OpKind::Unrecognized => (StepKind::Unrecognized, 0),
    }
}

/// One decoded arithmetic operation of a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputeStep {
    pub pc: u64,
    pub kind: StepKind,
    /// Chain value flowing in.
    pub operand1: u64,
    /// Constant captured when the instruction was decoded.
    pub operand2: u64,
    pub result: u64,
    pub description: String,
}

impl ComputeStep {
    pub fn new(pc: u64, kind: StepKind, operand1: u64, operand2: u64, result: u64) -> Self {
        Self {
            pc,
            kind,
            operand1,
            operand2,
            result,
            description: describe(kind, operand2),
        }
    }
}

impl fmt::Display for ComputeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} src={} op2={} -> {} ({})",
            Hex(self.pc),
            self.kind.name(),
            Hex(self.operand1),
            Hex(self.operand2),
            Hex(self.result),
            self.description
        )
    }
}

fn describe(kind: StepKind, operand2: u64) -> String {
    match kind {
        StepKind::ShiftLeft => format!("left shift by {operand2}"),
        StepKind::Add => format!("add offset {operand2:#x}"),
        StepKind::LoadAddress => format!("load from base + {}", operand2 as i64),
        StepKind::Unrecognized => "pass-through".to_string(),
    }
}
