use std::collections::{HashMap, HashSet};

use dvr_taint::{CpuContext, DynInst, PhysRegId, PredictorUnavailable};
use tracing_subscriber::EnvFilter;

/// Stride load PC used by the reference chain.
pub const ORIGIN_PC: u64 = 0x1000;
pub const ORIGIN_VALUE: u64 = 0x0A82;

/// `slli a1, a0, 2`
pub const SLLI_A1_A0_2: u32 = 0x0025_1593;
/// `add a2, a1, a3`
pub const ADD_A2_A1_A3: u32 = 0x00d5_8633;
/// `lw a4, 0(a2)`
pub const LW_A4_0_A2: u32 = 0x0006_2703;
/// `addi a0, a5, 1`
pub const ADDI_A0_A5_1: u32 = 0x0017_8513;
/// `xor a1, a0, a3`
pub const XOR_A1_A0_A3: u32 = 0x00d5_45b3;
/// `c.slli a0, 2`
pub const C_SLLI_A0_2: u32 = 0x050a;
/// `c.lw a0, 4(a1)`
pub const C_LW_A0_4_A1: u32 = 0x41c8;
/// `beq a0, a1, 8`
pub const BEQ_A0_A1_8: u32 = 0x00b5_0463;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-flight instruction with fixed operand values.
#[derive(Clone, Debug, Default)]
pub struct MockInst {
    pub pc: u64,
    pub bytes: Vec<u8>,
    pub srcs: Vec<(Option<PhysRegId>, Option<u64>)>,
    pub dests: Vec<Option<PhysRegId>>,
    pub load: bool,
    pub direct_ctrl: bool,
    pub prediction: Option<(bool, u64)>,
}

impl MockInst {
    /// Compressed encodings (low bits != 0b11) keep only two bytes.
    pub fn new(pc: u64, raw: u32) -> Self {
        let len = if raw & 0b11 == 0b11 { 4 } else { 2 };
        Self {
            pc,
            bytes: raw.to_le_bytes()[..len].to_vec(),
            ..Default::default()
        }
    }

    pub fn src(mut self, reg: usize, value: u64) -> Self {
        self.srcs.push((Some(PhysRegId::int(reg)), Some(value)));
        self
    }

    /// Source handle whose value cannot be read.
    pub fn src_unread(mut self, reg: usize) -> Self {
        self.srcs.push((Some(PhysRegId::int(reg)), None));
        self
    }

    pub fn dest(mut self, reg: usize) -> Self {
        self.dests.push(Some(PhysRegId::int(reg)));
        self
    }

    pub fn load(mut self) -> Self {
        self.load = true;
        self
    }

    pub fn branch(mut self, prediction: Option<(bool, u64)>) -> Self {
        self.direct_ctrl = true;
        self.prediction = prediction;
        self
    }
}

impl DynInst for MockInst {
    fn pc(&self) -> u64 {
        self.pc
    }

    fn num_src_regs(&self) -> usize {
        self.srcs.len()
    }

    fn src_reg(&self, idx: usize) -> Option<PhysRegId> {
        self.srcs.get(idx).and_then(|(reg, _)| *reg)
    }

    fn num_dest_regs(&self) -> usize {
        self.dests.len()
    }

    fn dest_reg(&self, idx: usize) -> Option<PhysRegId> {
        self.dests.get(idx).copied().flatten()
    }

    fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn src_value(&self, idx: usize) -> Option<u64> {
        self.srcs.get(idx).and_then(|(_, value)| *value)
    }

    fn is_load(&self) -> bool {
        self.load
    }

    fn is_direct_ctrl(&self) -> bool {
        self.direct_ctrl
    }

    fn predicted_taken(&self) -> Result<bool, PredictorUnavailable> {
        self.prediction.map(|(taken, _)| taken).ok_or(PredictorUnavailable)
    }

    fn predicted_target(&self) -> Result<u64, PredictorUnavailable> {
        self.prediction
            .map(|(_, target)| target)
            .ok_or(PredictorUnavailable)
    }
}

/// Core model with a fixed set of stride load sites.
#[derive(Clone, Debug, Default)]
pub struct MockCpu {
    pub stride_pcs: HashSet<u64>,
    pub strides: HashMap<u64, i64>,
    pub vector_value: Option<u64>,
}

impl MockCpu {
    pub fn with_stride(mut self, pc: u64, stride: i64) -> Self {
        self.stride_pcs.insert(pc);
        self.strides.insert(pc, stride);
        self
    }
}

impl CpuContext for MockCpu {
    fn is_stride_pc(&self, pc: u64) -> bool {
        self.stride_pcs.contains(&pc)
    }

    fn latest_vector_load_value(&self) -> Option<u64> {
        self.vector_value
    }

    fn stride_value(&self, pc: u64) -> i64 {
        self.strides.get(&pc).copied().unwrap_or(0)
    }
}

/// Reference chain at execute: `a0` (p10) is the stride load result,
/// `a3` (p13) holds 0x10.
///
/// ```text
/// 0x1004  slli a1, a0, 2     p11 <- p10
/// 0x1008  add  a2, a1, a3    p12 <- p11, p13
/// 0x100c  lw   a4, 0(a2)     p14 <- p12
/// ```
pub fn reference_chain() -> [MockInst; 3] {
    [
        MockInst::new(0x1004, SLLI_A1_A0_2).src(10, ORIGIN_VALUE).dest(11),
        MockInst::new(0x1008, ADD_A2_A1_A3)
            .src(11, 0x2A08)
            .src(13, 0x10)
            .dest(12),
        MockInst::new(0x100C, LW_A4_0_A2).src(12, 0x2A18).dest(14).load(),
    ]
}
