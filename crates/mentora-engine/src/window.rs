//! Bounded rolling log of dialogue turns.

use std::collections::VecDeque;

use mentora_core::turns::{EvictionPolicy, Role, Turn};

/// Ordered turns, oldest first, capped at a fixed size.
///
/// Under [`EvictionPolicy::PreserveInitialContext`] a context turn appended
/// to an empty window is pinned: it counts toward the cap but eviction skips
/// it. Role alternation is not enforced.
#[derive(Clone, Debug)]
pub struct ContextWindow {
    turns: VecDeque<Turn>,
    cap: usize,
    policy: EvictionPolicy,
    pinned: bool,
}

impl ContextWindow {
    pub fn new(cap: usize, policy: EvictionPolicy) -> Self {
        // A pinned turn needs at least one more slot to be useful.
        let floor = match policy {
            EvictionPolicy::StrictCap => 1,
            EvictionPolicy::PreserveInitialContext => 2,
        };
        let cap = cap.max(floor);
        Self {
            turns: VecDeque::with_capacity(cap),
            cap,
            policy,
            pinned: false,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        if self.turns.is_empty()
            && turn.role == Role::Context
            && self.policy == EvictionPolicy::PreserveInitialContext
        {
            self.pinned = true;
        }
        self.turns.push_back(turn);
        while self.turns.len() > self.cap {
            if self.pinned {
                let _ = self.turns.remove(1);
            } else {
                let _ = self.turns.pop_front();
            }
        }
    }

    /// Ordered copy of the current turns.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}
