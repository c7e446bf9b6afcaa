//! Completed dependency chains and their step ledgers.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{ComputeStep, Hex};

/// Dependency chain from a stride load to the load whose address it feeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedChain {
    /// Stride load PC.
    pub base_pc: u64,
    /// Dependent access PC.
    pub indirect_pc: u64,
    /// Every participating PC in position order.
    pub chain_pcs: Vec<u64>,
}

impl CompletedChain {
    pub fn contains(&self, pc: u64) -> bool {
        self.chain_pcs.contains(&pc)
    }

    /// Position of `pc` within the chain.
    pub fn position(&self, pc: u64) -> Option<usize> {
        self.chain_pcs.iter().position(|&p| p == pc)
    }

    pub fn last_pc(&self) -> Option<u64> {
        self.chain_pcs.last().copied()
    }
}

impl fmt::Display for CompletedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "base {} -> indirect {} [",
            Hex(self.base_pc),
            Hex(self.indirect_pc)
        )?;
        for (i, pc) in self.chain_pcs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", Hex(*pc))?;
        }
        f.write_str("]")
    }
}

/// Writeback-captured steps for one base PC, indexed by chain position.
#[derive(Clone, Debug, Default)]
pub(crate) struct PositionalLedger {
    slots: Vec<Option<ComputeStep>>,
    /// Source operand index that carried the taint, per chain PC.
    taint_src: FxHashMap<u64, usize>,
}

impl PositionalLedger {
    fn write(&mut self, position: usize, step: ComputeStep) {
        // A PC keeps one slot even if an active chain's positions shifted.
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i != position && slot.as_ref().is_some_and(|s| s.pc == step.pc) {
                *slot = None;
            }
        }
        if self.slots.len() <= position {
            self.slots.resize(position + 1, None);
        }
        self.slots[position] = Some(step);
    }

    /// Populated slots whose PC belongs to `order`. Steps left by an
    /// abandoned session for PCs outside the current chain do not count.
    fn populated_in(&self, order: &[u64]) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|s| order.contains(&s.pc))
            .count()
    }

    fn relayout(&mut self, chain: &CompletedChain) {
        let steps: Vec<ComputeStep> = self.slots.drain(..).flatten().collect();
        for step in steps {
            if let Some(position) = chain.position(step.pc) {
                self.write(position, step);
            }
        }
    }
}

/// Deduplicated steps for one base PC, ordered by chain position.
#[derive(Clone, Debug, Default)]
pub(crate) struct FinalizedSteps {
    pub(crate) steps: Vec<ComputeStep>,
    complete: bool,
}

impl FinalizedSteps {
    /// Insert keeping position order. Returns false if `step.pc` is present.
    fn merge(&mut self, step: ComputeStep, order: &[u64]) -> bool {
        if self.steps.iter().any(|s| s.pc == step.pc) {
            return false;
        }
        let position_of = |pc: u64| order.iter().position(|&p| p == pc).unwrap_or(usize::MAX);
        let position = position_of(step.pc);
        let idx = self.steps.partition_point(|s| position_of(s.pc) < position);
        self.steps.insert(idx, step);
        true
    }
}

/// Chain storage shared by the execute and writeback streams.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChainRecorder {
    chains: Vec<CompletedChain>,
    by_base: FxHashMap<u64, usize>,
    finished: FxHashSet<u64>,
    /// Chain PC -> base PC of the earliest chain containing it.
    pc_index: FxHashMap<u64, u64>,
    ledgers: FxHashMap<u64, PositionalLedger>,
    finalized: FxHashMap<u64, FinalizedSteps>,
    max_chains: Option<usize>,
}

impl ChainRecorder {
    /// A bound of zero is treated as unbounded.
    pub(crate) fn new(max_chains: Option<usize>) -> Self {
        Self {
            max_chains: max_chains.filter(|&max| max > 0),
            ..Default::default()
        }
    }

    pub(crate) fn chains(&self) -> &[CompletedChain] {
        &self.chains
    }

    pub(crate) fn chain(&self, base_pc: u64) -> Option<&CompletedChain> {
        self.by_base.get(&base_pc).map(|&idx| &self.chains[idx])
    }

    /// Finalized chain containing `pc`, if any.
    pub(crate) fn chain_for_pc(&self, pc: u64) -> Option<&CompletedChain> {
        self.pc_index.get(&pc).and_then(|base| self.chain(*base))
    }

    pub(crate) fn is_finished(&self, base_pc: u64) -> bool {
        self.finished.contains(&base_pc)
    }

    /// Store a completed chain and mark its origin finished. Returns the
    /// base PCs evicted to honour the retention bound.
    pub(crate) fn finish(&mut self, chain: CompletedChain) -> Vec<u64> {
        let base_pc = chain.base_pc;
        if self.by_base.contains_key(&base_pc) {
            self.forget(base_pc);
        }

        for &pc in &chain.chain_pcs {
            self.pc_index.entry(pc).or_insert(base_pc);
        }
        // The finalized view is rebuilt from the positional ledger so only
        // this chain's PCs survive, in chain order.
        let steps: Vec<ComputeStep> = self
            .ledgers
            .get_mut(&base_pc)
            .map(|ledger| {
                ledger.relayout(&chain);
                ledger.slots.iter().flatten().cloned().collect()
            })
            .unwrap_or_default();
        if steps.is_empty() {
            self.finalized.remove(&base_pc);
        } else {
            let complete = chain
                .last_pc()
                .is_some_and(|last| steps.iter().any(|s| s.pc == last));
            self.finalized
                .insert(base_pc, FinalizedSteps { steps, complete });
        }

        self.finished.insert(base_pc);
        self.by_base.insert(base_pc, self.chains.len());
        self.chains.push(chain);

        let mut evicted = Vec::new();
        if let Some(max) = self.max_chains {
            while self.chains.len() > max {
                let oldest = self.chains[0].base_pc;
                self.forget(oldest);
                evicted.push(oldest);
            }
        }
        evicted
    }

    /// Drop a chain, its ledgers and its finished mark.
    pub(crate) fn forget(&mut self, base_pc: u64) -> bool {
        let had_chain = self.by_base.contains_key(&base_pc);
        self.chains.retain(|c| c.base_pc != base_pc);
        self.by_base = self
            .chains
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.base_pc, idx))
            .collect();
        self.pc_index.retain(|_, base| *base != base_pc);
        // PCs shared with surviving chains fall back to the earliest of them.
        for chain in &self.chains {
            for &pc in &chain.chain_pcs {
                self.pc_index.entry(pc).or_insert(chain.base_pc);
            }
        }
        self.ledgers.remove(&base_pc);
        self.finalized.remove(&base_pc);
        self.finished.remove(&base_pc) || had_chain
    }

    /// A session for `base_pc` is starting. Finalized steps of an unfinished
    /// base belonged to an abandoned session and are dropped; its positional
    /// ledger is kept for PCs the new session may share.
    pub(crate) fn begin(&mut self, base_pc: u64) {
        if !self.is_finished(base_pc) {
            self.finalized.remove(&base_pc);
        }
    }

    /// Forget every chain so all origins can be learned again.
    pub(crate) fn reset_finished(&mut self) {
        *self = Self::new(self.max_chains);
    }

    pub(crate) fn note_taint_src(&mut self, base_pc: u64, pc: u64, src_idx: usize) {
        self.ledgers
            .entry(base_pc)
            .or_default()
            .taint_src
            .insert(pc, src_idx);
    }

    pub(crate) fn taint_src(&self, base_pc: u64, pc: u64) -> Option<usize> {
        self.ledgers
            .get(&base_pc)
            .and_then(|l| l.taint_src.get(&pc).copied())
    }

    /// Number of positions holding a step for `base_pc` whose PC is in
    /// `order`.
    pub(crate) fn populated(&self, base_pc: u64, order: &[u64]) -> usize {
        self.ledgers
            .get(&base_pc)
            .map_or(0, |l| l.populated_in(order))
    }

    /// Record a writeback-captured step in both ledgers.
    ///
    /// `order` is the chain's PC order; `finalized` says whether it belongs
    /// to a completed chain (only then can the step sequence complete).
    pub(crate) fn record_step(
        &mut self,
        base_pc: u64,
        position: usize,
        step: ComputeStep,
        order: &[u64],
        finalized: bool,
    ) -> bool {
        let pc = step.pc;
        self.ledgers
            .entry(base_pc)
            .or_default()
            .write(position, step.clone());

        let steps = self.finalized.entry(base_pc).or_default();
        let inserted = steps.merge(step, order);
        if finalized && order.last() == Some(&pc) {
            steps.complete = true;
        }
        inserted
    }

    pub(crate) fn steps(&self, base_pc: u64) -> Option<&[ComputeStep]> {
        self.finalized.get(&base_pc).map(|f| f.steps.as_slice())
    }

    pub(crate) fn steps_mut(&mut self, base_pc: u64) -> Option<&mut [ComputeStep]> {
        self.finalized
            .get_mut(&base_pc)
            .map(|f| f.steps.as_mut_slice())
    }

    pub(crate) fn is_complete(&self, base_pc: u64) -> bool {
        self.finalized.get(&base_pc).is_some_and(|f| f.complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StepKind;

    fn chain(base: u64, pcs: &[u64]) -> CompletedChain {
        CompletedChain {
            base_pc: base,
            indirect_pc: *pcs.last().unwrap(),
            chain_pcs: pcs.to_vec(),
        }
    }

    fn step(pc: u64) -> ComputeStep {
        ComputeStep::new(pc, StepKind::Add, 0, 1, 1)
    }

    #[test]
    fn test_finish_marks_and_indexes() {
        let mut recorder = ChainRecorder::new(None);
        recorder.finish(chain(0x1000, &[0x1000, 0x1004, 0x1008]));
        assert!(recorder.is_finished(0x1000));
        assert_eq!(recorder.chain_for_pc(0x1004).unwrap().base_pc, 0x1000);
        assert!(recorder.chain_for_pc(0x2000).is_none());
    }

    #[test]
    fn test_earliest_chain_owns_shared_pc() {
        let mut recorder = ChainRecorder::new(None);
        recorder.finish(chain(0x1000, &[0x1000, 0x1100]));
        recorder.finish(chain(0x2000, &[0x1100, 0x2000]));
        assert_eq!(recorder.chain_for_pc(0x1100).unwrap().base_pc, 0x1000);

        recorder.forget(0x1000);
        assert_eq!(recorder.chain_for_pc(0x1100).unwrap().base_pc, 0x2000);
    }

    #[test]
    fn test_merge_orders_by_position() {
        let order = [0x1000, 0x1004, 0x1008, 0x100C];
        let mut recorder = ChainRecorder::new(None);
        recorder.finish(chain(0x1000, &order));
        for (pos, pc) in [(3, 0x100C), (1, 0x1004), (2, 0x1008), (1, 0x1004)] {
            recorder.record_step(0x1000, pos, step(pc), &order, true);
        }
        let pcs: Vec<u64> = recorder.steps(0x1000).unwrap().iter().map(|s| s.pc).collect();
        assert_eq!(pcs, vec![0x1004, 0x1008, 0x100C]);
        assert_eq!(recorder.populated(0x1000, &order), 3);
        assert!(recorder.is_complete(0x1000));
    }

    #[test]
    fn test_shifted_position_keeps_one_slot() {
        let mut recorder = ChainRecorder::new(None);
        // Active chain {0x1000, 0x1008}: 0x1008 sits at position 1.
        recorder.record_step(0x1000, 1, step(0x1008), &[0x1000, 0x1008], false);
        // 0x1004 joins and pushes 0x1008 to position 2.
        let order = [0x1000, 0x1004, 0x1008];
        recorder.record_step(0x1000, 2, step(0x1008), &order, false);
        assert_eq!(recorder.populated(0x1000, &order), 1);

        recorder.finish(chain(0x1000, &order));
        assert_eq!(recorder.populated(0x1000, &order), 1);
        assert!(recorder.is_complete(0x1000));
    }

    #[test]
    fn test_retention_bound() {
        let mut recorder = ChainRecorder::new(Some(2));
        assert!(recorder.finish(chain(0x1000, &[0x1000, 0x1004])).is_empty());
        assert!(recorder.finish(chain(0x2000, &[0x2000, 0x2004])).is_empty());
        assert_eq!(recorder.finish(chain(0x3000, &[0x3000, 0x3004])), vec![0x1000]);

        assert!(!recorder.is_finished(0x1000));
        assert!(recorder.chain(0x1000).is_none());
        assert!(recorder.chain_for_pc(0x1004).is_none());
        assert_eq!(recorder.chain(0x3000).unwrap().indirect_pc, 0x3004);
        assert_eq!(recorder.chains().len(), 2);
    }

    #[test]
    fn test_abandoned_session_steps_dropped_at_finish() {
        let mut recorder = ChainRecorder::new(None);
        recorder.begin(0x1000);
        recorder.record_step(0x1000, 1, step(0x1004), &[0x1000, 0x1004], false);
        recorder.record_step(0x1000, 2, step(0x1010), &[0x1000, 0x1004, 0x1010], false);

        // Restart: 0x1010 is not part of the new chain.
        recorder.begin(0x1000);
        assert!(recorder.steps(0x1000).is_none());
        let order = [0x1000, 0x1004, 0x1008, 0x100C];
        assert_eq!(recorder.populated(0x1000, &order), 1);
        recorder.record_step(0x1000, 2, step(0x1008), &order[..3], false);

        recorder.finish(chain(0x1000, &order));
        let pcs: Vec<u64> = recorder.steps(0x1000).unwrap().iter().map(|s| s.pc).collect();
        assert_eq!(pcs, vec![0x1004, 0x1008]);
        assert_eq!(recorder.populated(0x1000, &order), 2);
        assert!(!recorder.is_complete(0x1000));
    }

    #[test]
    fn test_zero_bound_is_unbounded() {
        let mut recorder = ChainRecorder::new(Some(0));
        assert!(recorder.finish(chain(0x1000, &[0x1000, 0x1004])).is_empty());
        assert!(recorder.is_finished(0x1000));
        assert_eq!(recorder.chains().len(), 1);
    }

    #[test]
    fn test_display() {
        let c = chain(0x1000, &[0x1000, 0x1004]);
        assert_eq!(c.to_string(), "base 0x1000 -> indirect 0x1004 [0x1000, 0x1004]");
    }
}
