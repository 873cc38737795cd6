//! Per-scorer rolling window of scored batches.

use shared_types::ScorerId;
use std::collections::{HashMap, VecDeque};

use super::ScoredOutcome;

#[derive(Debug)]
pub struct RollingWindows {
    capacity: usize,
    windows: HashMap<ScorerId, VecDeque<ScoredOutcome>>,
}

impl RollingWindows {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, scorer: &ScorerId, outcomes: impl IntoIterator<Item = ScoredOutcome>) {
        let window = self.windows.entry(scorer.clone()).or_default();
        for outcome in outcomes {
            if window.len() == self.capacity {
                window.pop_front();
            }
            window.push_back(outcome);
        }
    }

    /// The scorer's window, only once it holds `capacity` entries.
    pub fn full_window(&self, scorer: &ScorerId) -> Option<Vec<ScoredOutcome>> {
        self.windows
            .get(scorer)
            .filter(|w| w.len() == self.capacity)
            .map(|w| w.iter().copied().collect())
    }

    pub fn len_of(&self, scorer: &ScorerId) -> usize {
        self.windows.get(scorer).map_or(0, VecDeque::len)
    }
}
