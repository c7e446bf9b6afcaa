//! Replay of recorded chain arithmetic for a new origin value.

use dvr_isa::Xlen;

use crate::{ComputeStep, StepKind};

/// Value flowing through one step during a replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepValue {
    pub pc: u64,
    pub kind: StepKind,
    pub input: u64,
    pub output: u64,
}

/// Result of a non-destructive replay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Replay {
    pub final_value: u64,
    pub steps: Vec<StepValue>,
}

/// Recompute `steps` in order starting from `init`, leaving them untouched.
pub fn replay<X: Xlen>(steps: &[ComputeStep], init: u64) -> Replay {
    let mut current = init;
    let steps = steps
        .iter()
        .map(|step| {
            let input = current;
            current = step.kind.apply::<X>(input, step.operand2);
            StepValue {
                pc: step.pc,
                kind: step.kind,
                input,
                output: current,
            }
        })
        .collect();
    Replay {
        final_value: current,
        steps,
    }
}

/// Recompute `steps` from `init`, overwriting each step's `operand1` and
/// `result` with the replayed values. Returns the final value.
pub fn replay_in_place<X: Xlen>(steps: &mut [ComputeStep], init: u64) -> u64 {
    steps.iter_mut().fold(init, |current, step| {
        step.operand1 = current;
        step.result = step.kind.apply::<X>(current, step.operand2);
        step.result
    })
}
