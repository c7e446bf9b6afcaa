use thiserror::Error;

/// Taint engine errors.
///
/// None of these abort the simulation: `mark` reports the first two to its
/// caller, the rest are logged where they occur and the engine carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaintError {
    #[error("invalid register p{index}: scoreboard tracks {num_regs} physical registers")]
    InvalidRegister { index: usize, num_regs: usize },
    #[error("PC {0:#x} is not a stride load site")]
    NotAStrideSite(u64),
    #[error("unrecognized operation {raw:#010x} at PC {pc:#x}")]
    UnrecognizedOperation { pc: u64, raw: u32 },
    #[error("branch predictor state unavailable at PC {0:#x}")]
    PredictorUnavailable(u64),
}

/// Raised by an instruction handle that cannot report its prediction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("branch prediction not available")]
pub struct PredictorUnavailable;

pub type Result<T> = std::result::Result<T, TaintError>;
