//! Taint scoreboard: mark, propagate, finalize and replay.

use std::marker::PhantomData;

use dvr_isa::disasm::{InstrFields, format_op};
use dvr_isa::{DecodedOp, OpKind, Xlen, decode};
use tracing::{debug, info, trace, trace_span, warn};

use crate::chain::ChainRecorder;
use crate::replay::{Replay, replay, replay_in_place};
use crate::{
    CompletedChain, ComputeStep, CpuContext, DynInst, Hex, NullContext, PhysRegId, Result,
    ScoreboardConfig, Session, StepKind, TaintError, TaintStats, TaintStore, resolve,
};

/// Tracks values derived from a stride load through the physical register
/// file and reconstructs the arithmetic feeding the dependent load.
///
/// Two streams drive it: [`propagate`](Self::propagate) in program order at
/// execute, and [`decode_chain_operands`](Self::decode_chain_operands) in
/// completion order at writeback. Their relative order is unconstrained.
pub struct TaintScoreboard<X: Xlen, C: CpuContext = NullContext> {
    config: ScoreboardConfig,
    ctx: C,
    store: TaintStore,
    session: Session,
    /// Steps computed by `propagate` for the current or most recent session.
    session_steps: Vec<ComputeStep>,
    /// `session_steps` holds a replay of the previous session and is
    /// replaced once the current session records its first step.
    replayed_steps: bool,
    recorder: ChainRecorder,
    propagations: u64,
    detected_patterns: u64,
    _marker: PhantomData<X>,
}

impl<X: Xlen> TaintScoreboard<X, NullContext> {
    /// Scoreboard with no core attached.
    pub fn new(config: ScoreboardConfig) -> Self {
        Self::with_context(config, NullContext)
    }
}

impl<X: Xlen, C: CpuContext> TaintScoreboard<X, C> {
    pub fn with_context(config: ScoreboardConfig, ctx: C) -> Self {
        Self {
            store: TaintStore::new(config.phys_regs()),
            recorder: ChainRecorder::new(config.max_chains),
            config,
            ctx,
            session: Session::Idle,
            session_steps: Vec::new(),
            replayed_steps: false,
            propagations: 0,
            detected_patterns: 0,
            _marker: PhantomData,
        }
    }

    pub const fn config(&self) -> &ScoreboardConfig {
        &self.config
    }

    pub const fn context(&self) -> &C {
        &self.ctx
    }

    pub const fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    // ===== Taint store =====

    /// Taint `reg` with `origin_value` and start a session rooted at `pc`.
    ///
    /// Any active session is discarded.
    pub fn mark(&mut self, reg: PhysRegId, pc: u64, origin_value: u64) -> Result<()> {
        let slot = self.check_origin(reg, pc)?;
        self.start_session(slot, reg, pc, origin_value);
        self.session_steps.clear();
        self.replayed_steps = false;
        Ok(())
    }

    /// Like [`mark`](Self::mark), taking the origin value from the load/store
    /// queue. A fresh vector value is first replayed through the most recent
    /// session ledger, which keeps the replayed values until the new session
    /// records its first step.
    pub fn mark_from_context(&mut self, reg: PhysRegId, pc: u64) -> Result<()> {
        let slot = self.check_origin(reg, pc)?;
        let origin_value = match self.ctx.latest_vector_load_value() {
            Some(value) => {
                let address = self.recompute(value);
                debug!(
                    value = %Hex(value),
                    address = %Hex(address),
                    "replayed session steps with vector load value"
                );
                self.replayed_steps = true;
                value
            }
            None => {
                self.session_steps.clear();
                self.replayed_steps = false;
                self.config.default_origin_value
            }
        };
        self.start_session(slot, reg, pc, origin_value);
        Ok(())
    }

    fn check_origin(&self, reg: PhysRegId, pc: u64) -> Result<usize> {
        let slot = self.store.slot(reg).inspect_err(|err| {
            warn!(%err, "cannot taint register");
        })?;
        if !self.ctx.is_stride_pc(pc) {
            let err = TaintError::NotAStrideSite(pc);
            warn!(%err, "cannot taint register");
            return Err(err);
        }
        Ok(slot)
    }

    fn start_session(&mut self, slot: usize, reg: PhysRegId, pc: u64, origin_value: u64) {
        self.store.seed(slot, origin_value);
        self.session.start(pc);
        self.recorder.begin(pc);
        debug!(
            reg = %reg,
            pc = %Hex(pc),
            value = %Hex(origin_value),
            "tainted register from stride load"
        );
    }

    /// Taint state of `reg`; false when out of range.
    pub fn is_tainted(&self, reg: PhysRegId) -> bool {
        self.store.is_tainted(Some(reg))
    }

    /// Shadow value of `reg` while it is tainted.
    pub fn shadow_value(&self, reg: PhysRegId) -> Option<u64> {
        self.is_tainted(reg).then(|| self.store.shadow(reg.index))
    }

    /// Clear every taint bit and discard the active session. Chains and
    /// step ledgers are kept.
    pub fn clear_all(&mut self) {
        self.store.clear_all();
        self.session = Session::Idle;
    }

    // ===== Propagation =====

    /// Advance the active session by one instruction (execute stage,
    /// program order).
    pub fn propagate<I: DynInst + ?Sized>(&mut self, inst: &I) {
        let Some(origin_pc) = self.session.active().map(|s| s.origin_pc()) else {
            return;
        };
        if self.recorder.is_finished(origin_pc) {
            trace!(origin = %Hex(origin_pc), "origin already has a chain, dropping session");
            self.session = Session::Idle;
            return;
        }

        let pc = inst.pc();
        let tainted_src = self.find_tainted_src(inst);
        let dest = (inst.num_dest_regs() > 0)
            .then(|| inst.dest_reg(0))
            .flatten()
            .filter(|reg| self.store.contains(*reg));

        let Some((src_idx, src)) = tainted_src else {
            if let Some(dst) = dest.filter(|reg| self.store.is_tainted(Some(*reg))) {
                self.store.clear(dst.index);
                trace!(pc = %Hex(pc), reg = %dst, "overwritten, taint cleared");
            }
            return;
        };

        let op = self.decode_inst(pc, inst);
        trace!(pc = %Hex(pc), src = %src, op = %format_op(&op), "tainted source");
        if let Some(session) = self.session.active_mut() {
            session.insert(pc);
        }
        self.recorder.note_taint_src(origin_pc, pc, src_idx);

        let src_value = self.store.shadow(src.index);
        let (kind, operand2) = resolve(op.kind, src_idx, || self.shadow_operand(inst, src_idx));
        let result = kind.apply::<X>(src_value, operand2);
        let step = ComputeStep::new(pc, kind, src_value, operand2, result);
        trace!(step = %step, "compute step");

        if let Some(dst) = dest {
            self.store.set_tainted(dst.index);
            self.store.set_shadow(dst.index, result);
            self.propagations += 1;
            trace!(pc = %Hex(pc), from = %src, to = %dst, "propagated taint");
        }
        if std::mem::take(&mut self.replayed_steps) {
            self.session_steps.clear();
        }
        self.session_steps.push(step);

        if inst.is_load() {
            self.finish_session(pc, result);
        }
    }

    fn find_tainted_src<I: DynInst + ?Sized>(&self, inst: &I) -> Option<(usize, PhysRegId)> {
        (0..inst.num_src_regs()).find_map(|idx| {
            inst.src_reg(idx)
                .filter(|reg| self.store.is_tainted(Some(*reg)))
                .map(|reg| (idx, reg))
        })
    }

    /// Value of the first source operand other than `src_idx`: its shadow
    /// value if tainted, else the value the instruction read.
    fn shadow_operand<I: DynInst + ?Sized>(&self, inst: &I, src_idx: usize) -> u64 {
        (0..inst.num_src_regs())
            .filter(|&idx| idx != src_idx)
            .find_map(|idx| {
                let reg = inst.src_reg(idx)?;
                if self.store.is_tainted(Some(reg)) {
                    Some(self.store.shadow(reg.index))
                } else {
                    inst.src_value(idx)
                }
            })
            .unwrap_or(0)
    }

    fn decode_inst<I: DynInst + ?Sized>(&self, pc: u64, inst: &I) -> DecodedOp {
        let bytes = inst.raw_bytes();
        match decode::<X>(bytes) {
            Ok(op) => {
                if op.size == 4 {
                    trace!(pc = %Hex(pc), fields = %InstrFields::extract(op.raw), "decoded");
                }
                op
            }
            Err(err) => {
                debug!(pc = %Hex(pc), %err, "undecodable instruction");
                decode_fallback(bytes)
            }
        }
    }

    fn finish_session(&mut self, indirect_pc: u64, address: u64) {
        let Some(session) = self.session.take() else {
            return;
        };
        let chain = session.into_chain(indirect_pc);
        info!(
            base = %Hex(chain.base_pc),
            indirect = %Hex(indirect_pc),
            len = chain.chain_pcs.len(),
            address = %Hex(address),
            "detected indirect memory access pattern"
        );

        self.detected_patterns += 1;
        for evicted in self.recorder.finish(chain) {
            debug!(base = %Hex(evicted), "evicted dependency chain");
        }
        self.clear_all();
        self.log_dependency_chains();
    }

    // ===== Writeback =====

    /// Capture operands of a chain instruction at writeback.
    ///
    /// `pc` must belong to the active session or to a finalized chain,
    /// otherwise the call is ignored. Arrival order is free; steps end up
    /// ordered by chain position with one entry per PC.
    pub fn decode_chain_operands<I: DynInst + ?Sized>(&mut self, pc: u64, inst: &I) {
        let _span = trace_span!("decode_chain_operands", pc = %Hex(pc)).entered();

        let (base_pc, order, finalized) = if let Some(session) =
            self.session.active().filter(|s| s.contains(pc))
        {
            (session.origin_pc(), session.order(), false)
        } else if let Some(chain) = self.recorder.chain_for_pc(pc) {
            (chain.base_pc, chain.chain_pcs.clone(), true)
        } else {
            return;
        };

        // The origin load produces the chain input; it is not a step.
        if pc == base_pc {
            return;
        }
        let step_bearing = order.len().saturating_sub(1);
        if self.recorder.populated(base_pc, &order) >= step_bearing {
            trace!(base = %Hex(base_pc), "chain already fully captured");
            return;
        }

        let op = self.decode_inst(pc, inst);
        let src_idx = self.recorder.taint_src(base_pc, pc).unwrap_or(0);
        let (kind, operand2) = resolve(op.kind, src_idx, || writeback_operand(inst, src_idx));
        if kind == StepKind::Unrecognized {
            let err = TaintError::UnrecognizedOperation { pc, raw: op.raw };
            debug!(%err, "no compute step recorded");
            return;
        }
        let Some(position) = order.iter().position(|&p| p == pc) else {
            return;
        };

        let operand1 = inst.src_value(src_idx).unwrap_or(0);
        let result = kind.apply::<X>(operand1, operand2);
        let step = ComputeStep::new(pc, kind, operand1, operand2, result);
        trace!(position, step = %step, "captured chain step");

        if !self.recorder.record_step(base_pc, position, step, &order, finalized) {
            trace!("step already finalized");
        }
        if self.recorder.is_complete(base_pc) {
            debug!(base = %Hex(base_pc), "compute steps complete");
        }
    }

    // ===== Replay =====

    /// Replay the finalized steps of `base_pc` from `init`, overwriting the
    /// stored operands and results. Unknown chains return `init`.
    pub fn recompute_steps_for_pc(&mut self, base_pc: u64, init: u64) -> u64 {
        let Some(steps) = self.recorder.steps_mut(base_pc) else {
            return init;
        };
        let value = replay_in_place::<X>(steps, init);
        for step in steps.iter() {
            trace!(step = %step, "recomputed");
        }
        value
    }

    /// Replay the most recent session's steps from `init` in place.
    pub fn recompute(&mut self, init: u64) -> u64 {
        let value = replay_in_place::<X>(&mut self.session_steps, init);
        for step in &self.session_steps {
            trace!(step = %step, "recomputed session step");
        }
        value
    }

    /// Replay the finalized steps of `base_pc` without touching them.
    pub fn replay_steps_for_pc(&self, base_pc: u64, init: u64) -> Replay {
        self.recorder
            .steps(base_pc)
            .map_or_else(|| replay::<X>(&[], init), |steps| replay::<X>(steps, init))
    }

    // ===== Queries =====

    pub fn dependency_chains(&self) -> &[CompletedChain] {
        self.recorder.chains()
    }

    pub fn dependency_chain(&self, base_pc: u64) -> Option<&CompletedChain> {
        self.recorder.chain(base_pc)
    }

    /// Finalized steps of `base_pc` in chain order.
    pub fn compute_steps(&self, base_pc: u64) -> Option<&[ComputeStep]> {
        self.recorder.steps(base_pc)
    }

    /// Whether the finalized steps of `base_pc` reached the chain's last PC.
    pub fn compute_steps_complete(&self, base_pc: u64) -> bool {
        self.recorder.is_complete(base_pc)
    }

    /// Steps recorded by `propagate` for the current or last session, or
    /// their replay by `mark_from_context` until the new session records a
    /// step.
    pub fn session_steps(&self) -> &[ComputeStep] {
        &self.session_steps
    }

    pub fn has_completed_pattern(&self, base_pc: u64) -> bool {
        self.recorder.is_finished(base_pc)
    }

    pub fn has_found_dependent(&self, base_pc: u64) -> bool {
        self.has_completed_pattern(base_pc)
    }

    /// Forget the chain learned for `base_pc` so it can be learned again.
    pub fn forget_pattern(&mut self, base_pc: u64) -> bool {
        self.recorder.forget(base_pc)
    }

    /// Forget every learned chain and its steps.
    pub fn reset_finished(&mut self) {
        self.recorder.reset_finished();
    }

    pub fn stride_value(&self, pc: u64) -> i64 {
        self.ctx.stride_value(pc)
    }

    pub const fn stats(&self) -> TaintStats {
        TaintStats {
            tainted_regs: self.store.tainted_count(),
            propagations: self.propagations,
            detected_patterns: self.detected_patterns,
        }
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            tainted_regs = stats.tainted_regs,
            propagations = stats.propagations,
            detected_patterns = stats.detected_patterns,
            "taint scoreboard statistics"
        );
    }

    pub fn log_dependency_chains(&self) {
        let chains = self.dependency_chains();
        if chains.is_empty() {
            debug!("no dependency chains found yet");
            return;
        }
        for (i, chain) in chains.iter().enumerate() {
            debug!(index = i + 1, chain = %chain, "dependency chain");
        }
    }
}

/// Second operand as read by the instruction at writeback, falling back to
/// operand 1 when no other source is readable.
fn writeback_operand<I: DynInst + ?Sized>(inst: &I, src_idx: usize) -> u64 {
    (0..inst.num_src_regs())
        .filter(|&idx| idx != src_idx)
        .find_map(|idx| inst.src_value(idx))
        .or_else(|| inst.src_value(1))
        .unwrap_or(0)
}

fn decode_fallback(bytes: &[u8]) -> DecodedOp {
    let mut raw = [0u8; 4];
    let len = bytes.len().min(4);
    raw[..len].copy_from_slice(&bytes[..len]);
    DecodedOp {
        kind: OpKind::Unrecognized,
        mnemonic: "unknown",
        raw: u32::from_le_bytes(raw),
        size: 0,
        rd: None,
        rs1: None,
        rs2: None,
    }
}
