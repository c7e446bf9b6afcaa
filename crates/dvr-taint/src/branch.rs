//! Branch-target queries on in-flight instructions.

use tracing::{debug, trace};

use crate::{DynInst, Hex, TaintError};

/// Predicted-taken target of a direct control instruction.
///
/// Returns 0 when the branch is predicted not taken, the instruction is not
/// a direct control transfer, or the predictor cannot answer.
pub fn check_branch_instruction<I: DynInst + ?Sized>(inst: &I) -> u64 {
    if !inst.is_direct_ctrl() {
        return 0;
    }

    let pc = inst.pc();
    let prediction = inst
        .predicted_taken()
        .and_then(|taken| taken.then(|| inst.predicted_target()).transpose());

    match prediction {
        Ok(Some(target)) => {
            trace!(pc = %Hex(pc), target = %Hex(target), "branch predicted taken");
            target
        }
        Ok(None) => {
            trace!(pc = %Hex(pc), "branch predicted not taken");
            0
        }
        Err(_) => {
            debug!(error = %TaintError::PredictorUnavailable(pc), "no branch target");
            0
        }
    }
}

/// Value of source operand `index` of a branch, or 0 when unreadable.
pub fn branch_operand<I: DynInst + ?Sized>(inst: &I, index: usize) -> u64 {
    inst.src_value(index).unwrap_or(0)
}
