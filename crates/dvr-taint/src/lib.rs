//! Taint tracking and dependency-chain recovery for an out-of-order core.
//!
//! A stride load seeds a taint session. Execute-stage propagation follows
//! the loaded value through renamed registers until a load consumes it; the
//! chain of PCs in between, plus the arithmetic captured at writeback, can
//! then be replayed for any future stride value to predict the dependent
//! load's address.

mod branch;
mod chain;
mod config;
mod context;
mod error;
mod replay;
mod scoreboard;
mod session;
mod stats;
mod step;
mod store;

use std::fmt;

pub use branch::{branch_operand, check_branch_instruction};
pub use chain::CompletedChain;
pub use config::{DEFAULT_NUM_PHYS_REGS, DEFAULT_ORIGIN_VALUE, ScoreboardConfig};
pub use context::{CpuContext, DynInst, NullContext, PhysRegId, RegClass};
pub use error::{PredictorUnavailable, Result, TaintError};
pub use replay::{Replay, StepValue, replay, replay_in_place};
pub use scoreboard::TaintScoreboard;
pub use session::{ActiveSession, Session};
pub use stats::TaintStats;
pub use step::{ComputeStep, StepKind, resolve};
pub use store::TaintStore;

pub use dvr_isa::{Rv32, Rv64, Xlen};

/// Formats an address or value as `0x..` in log fields.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Hex(pub u64);

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
