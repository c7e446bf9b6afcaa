//! Scoreboard configuration.

/// Physical register count used when none is configured.
pub const DEFAULT_NUM_PHYS_REGS: usize = 256;

/// Origin value used when the load/store queue has no vector load result.
pub const DEFAULT_ORIGIN_VALUE: u64 = 0x0A82;

/// Taint scoreboard configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreboardConfig {
    /// Number of physical register slots.
    pub num_phys_regs: usize,
    /// Origin value for `mark_from_context` when no vector load value exists.
    pub default_origin_value: u64,
    /// Completed chains to retain (oldest evicted first). `None` keeps all.
    pub max_chains: Option<usize>,
}

impl Default for ScoreboardConfig {
    fn default() -> Self {
        Self {
            num_phys_regs: DEFAULT_NUM_PHYS_REGS,
            default_origin_value: DEFAULT_ORIGIN_VALUE,
            max_chains: None,
        }
    }
}

impl ScoreboardConfig {
    /// Create config for `num_phys_regs` registers. Zero selects the default.
    pub fn new(num_phys_regs: usize) -> Self {
        let num_phys_regs = if num_phys_regs == 0 {
            DEFAULT_NUM_PHYS_REGS
        } else {
            num_phys_regs
        };
        Self {
            num_phys_regs,
            ..Default::default()
        }
    }

    /// Register slots to allocate. A zero count selects the default.
    pub const fn phys_regs(&self) -> usize {
        if self.num_phys_regs == 0 {
            DEFAULT_NUM_PHYS_REGS
        } else {
            self.num_phys_regs
        }
    }

    /// Set the fallback origin value.
    pub const fn with_default_origin_value(mut self, value: u64) -> Self {
        self.default_origin_value = value;
        self
    }

    /// Bound the number of retained chains. Zero keeps all.
    pub const fn with_max_chains(mut self, max_chains: usize) -> Self {
        self.max_chains = if max_chains == 0 {
            None
        } else {
            Some(max_chains)
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_regs_selects_default() {
        assert_eq!(ScoreboardConfig::new(0).num_phys_regs, DEFAULT_NUM_PHYS_REGS);
        assert_eq!(ScoreboardConfig::new(64).num_phys_regs, 64);

        let literal = ScoreboardConfig {
            num_phys_regs: 0,
            ..Default::default()
        };
        assert_eq!(literal.phys_regs(), DEFAULT_NUM_PHYS_REGS);
        assert_eq!(ScoreboardConfig::new(64).phys_regs(), 64);
    }

    #[test]
    fn test_zero_max_chains_is_unbounded() {
        assert_eq!(ScoreboardConfig::default().with_max_chains(0).max_chains, None);
    }

    #[test]
    fn test_builders() {
        let config = ScoreboardConfig::new(128)
            .with_default_origin_value(7)
            .with_max_chains(4);
        assert_eq!(config.default_origin_value, 7);
        assert_eq!(config.max_chains, Some(4));
    }
}
