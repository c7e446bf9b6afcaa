use std::fmt;

/// Scoreboard counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaintStats {
    /// Registers seeded by `mark` since the taint table was last cleared.
    pub tainted_regs: usize,
    /// Destination registers tainted by propagation.
    pub propagations: u64,
    /// Dependent accesses found (chains completed).
    pub detected_patterns: u64,
}

impl fmt::Display for TaintStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Taint scoreboard statistics:")?;
        writeln!(f, "  Tainted registers: {}", self.tainted_regs)?;
        writeln!(f, "  Taint propagations: {}", self.propagations)?;
        write!(f, "  Detected patterns: {}", self.detected_patterns)
    }
}
