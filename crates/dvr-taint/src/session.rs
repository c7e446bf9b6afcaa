//! The (at most one) active taint session.

use std::collections::BTreeSet;

use crate::CompletedChain;

/// Propagation state for one origin load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveSession {
    origin_pc: u64,
    chain_pcs: BTreeSet<u64>,
}

impl ActiveSession {
    pub fn new(origin_pc: u64) -> Self {
        Self {
            origin_pc,
            chain_pcs: BTreeSet::from([origin_pc]),
        }
    }

    pub const fn origin_pc(&self) -> u64 {
        self.origin_pc
    }

    pub fn contains(&self, pc: u64) -> bool {
        self.chain_pcs.contains(&pc)
    }

    /// Add `pc` to the chain. Returns false if it was already present.
    pub fn insert(&mut self, pc: u64) -> bool {
        self.chain_pcs.insert(pc)
    }

    pub fn len(&self) -> usize {
        self.chain_pcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain_pcs.is_empty()
    }

    /// Chain PCs in position order (ascending PC).
    pub fn order(&self) -> Vec<u64> {
        self.chain_pcs.iter().copied().collect()
    }

    pub fn into_chain(self, indirect_pc: u64) -> CompletedChain {
        let mut chain_pcs = self.chain_pcs;
        chain_pcs.insert(indirect_pc);
        CompletedChain {
            base_pc: self.origin_pc,
            indirect_pc,
            chain_pcs: chain_pcs.into_iter().collect(),
        }
    }
}

/// Session slot: idle, or exactly one active session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Idle,
    Active(ActiveSession),
}

impl Session {
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub const fn active(&self) -> Option<&ActiveSession> {
        match self {
            Self::Active(session) => Some(session),
            Self::Idle => None,
        }
    }

    pub const fn active_mut(&mut self) -> Option<&mut ActiveSession> {
        match self {
            Self::Active(session) => Some(session),
            Self::Idle => None,
        }
    }

    /// Replace any current session with a fresh one rooted at `origin_pc`.
    pub fn start(&mut self, origin_pc: u64) {
        *self = Self::Active(ActiveSession::new(origin_pc));
    }

    /// End the session, returning it if one was active.
    pub fn take(&mut self) -> Option<ActiveSession> {
        match std::mem::take(self) {
            Self::Active(session) => Some(session),
            Self::Idle => None,
        }
    }
}
