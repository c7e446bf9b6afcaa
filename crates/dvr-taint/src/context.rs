//! Interfaces the scoreboard consumes from the surrounding core model.

use std::fmt;

use crate::PredictorUnavailable;

/// Register file a physical register belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RegClass {
    #[default]
    Int,
    Float,
    Vector,
    Misc,
}

impl RegClass {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Vector => "vector",
            Self::Misc => "misc",
        }
    }
}

/// Renamed physical register identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysRegId {
    pub class: RegClass,
    pub index: usize,
}

impl PhysRegId {
    pub const fn new(class: RegClass, index: usize) -> Self {
        Self { class, index }
    }

    pub const fn int(index: usize) -> Self {
        Self::new(RegClass::Int, index)
    }
}

impl fmt::Display for PhysRegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:p{}", self.class.name(), self.index)
    }
}

/// Core-side queries: stride classification and load/store queue values.
pub trait CpuContext {
    /// Whether `pc` is a load site with a predictable stride.
    fn is_stride_pc(&self, pc: u64) -> bool;

    /// Most recent vectorized load result, if any.
    fn latest_vector_load_value(&self) -> Option<u64>;

    /// Stride metadata recorded for `pc` (0 when unknown).
    fn stride_value(&self, pc: u64) -> i64;
}

/// Context used when no core is attached: every PC qualifies and no
/// vector values exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullContext;

impl CpuContext for NullContext {
    fn is_stride_pc(&self, _pc: u64) -> bool {
        true
    }

    fn latest_vector_load_value(&self) -> Option<u64> {
        None
    }

    fn stride_value(&self, _pc: u64) -> i64 {
        0
    }
}

/// An in-flight instruction as observed by the scoreboard.
///
/// Register accessors return `None` for absent handles; the scoreboard
/// ignores those operands.
pub trait DynInst {
    fn pc(&self) -> u64;

    fn num_src_regs(&self) -> usize;

    fn src_reg(&self, idx: usize) -> Option<PhysRegId>;

    fn num_dest_regs(&self) -> usize;

    fn dest_reg(&self, idx: usize) -> Option<PhysRegId>;

    /// Raw little-endian encoding of the instruction.
    fn raw_bytes(&self) -> &[u8];

    /// Current value of source operand `idx`, when readable.
    fn src_value(&self, idx: usize) -> Option<u64>;

    fn is_load(&self) -> bool;

    fn is_direct_ctrl(&self) -> bool {
        false
    }

    fn predicted_taken(&self) -> Result<bool, PredictorUnavailable> {
        Err(PredictorUnavailable)
    }

    fn predicted_target(&self) -> Result<u64, PredictorUnavailable> {
        Err(PredictorUnavailable)
    }
}
