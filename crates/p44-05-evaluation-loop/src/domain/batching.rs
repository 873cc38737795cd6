//! Staging samples into single-type batches and batches into chunks.

use serde::{Deserialize, Serialize};
use shared_types::{EvalSample, HandType};
use std::collections::VecDeque;
use tracing::warn;

/// Samples sharing one dominant hand type. Never split across chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalBatch {
    pub hand_type: HandType,
    pub samples: Vec<EvalSample>,
}

impl EvalBatch {
    /// Ground truth: 1 for bots, 0 for humans.
    pub fn label(&self) -> u8 {
        self.hand_type.label()
    }
}

/// Exactly N batches, the unit dispatched to a scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalChunk {
    pub batches: Vec<EvalBatch>,
}

impl EvalChunk {
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn sample_ids(&self) -> Vec<String> {
        self.batches
            .iter()
            .flat_map(|b| b.samples.iter().map(|s| s.sample_id.clone()))
            .collect()
    }

    pub fn has_type(&self, hand_type: HandType) -> bool {
        self.batches.iter().any(|b| b.hand_type == hand_type)
    }

    /// Any batch holds fewer than `samples_per_batch` samples.
    pub fn has_short_batch(&self, samples_per_batch: usize) -> bool {
        self.batches.iter().any(|b| b.samples.len() < samples_per_batch)
    }
}

/// Holds partial batches per type and full batches waiting for dispatch.
///
/// Pending batches survive across cycles; nothing here is dropped unless it
/// is handed out in a chunk.
#[derive(Debug)]
pub struct BatchStager {
    samples_per_batch: usize,
    staged_human: Vec<EvalSample>,
    staged_bot: Vec<EvalSample>,
    pending: VecDeque<EvalBatch>,
}

impl BatchStager {
    pub fn new(samples_per_batch: usize) -> Self {
        Self {
            samples_per_batch: samples_per_batch.max(1),
            staged_human: Vec::new(),
            staged_bot: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn staged_mut(&mut self, hand_type: HandType) -> &mut Vec<EvalSample> {
        match hand_type {
            HandType::Human => &mut self.staged_human,
            HandType::Bot => &mut self.staged_bot,
        }
    }

    /// Stage samples; every `samples_per_batch` of one type becomes a batch.
    pub fn stage(&mut self, samples: Vec<EvalSample>) {
        for sample in samples {
            let Some(hand_type) = sample.dominant_hand_type() else {
                warn!(sample_id = %sample.sample_id, "Dropping untagged sample");
                continue;
            };
            let per_batch = self.samples_per_batch;
            let staged = self.staged_mut(hand_type);
            staged.push(sample);
            if staged.len() >= per_batch {
                let samples = std::mem::take(staged);
                self.pending.push_back(EvalBatch { hand_type, samples });
            }
        }
    }

    /// Turn partial batches into under-sized ones.
    pub fn flush_leftovers(&mut self) -> usize {
        let mut flushed = 0;
        for hand_type in [HandType::Human, HandType::Bot] {
            let samples = std::mem::take(self.staged_mut(hand_type));
            if !samples.is_empty() {
                self.pending.push_back(EvalBatch { hand_type, samples });
                flushed += 1;
            }
        }
        flushed
    }

    /// Flush leftovers and take `n` batches without the mix requirement.
    ///
    /// When even that falls short, the flushed samples go back to staging so
    /// an under-sized batch never waits in `pending` for a later full cycle.
    pub fn take_degraded_chunk(&mut self, n: usize) -> (usize, Option<EvalChunk>) {
        let flushed = self.flush_leftovers();
        if let Some(chunk) = self.take_chunk(n, false) {
            return (flushed, Some(chunk));
        }
        for _ in 0..flushed {
            if let Some(batch) = self.pending.pop_back() {
                let staged = self.staged_mut(batch.hand_type);
                let mut samples = batch.samples;
                samples.append(staged);
                *staged = samples;
            }
        }
        (flushed, None)
    }

    pub fn samples_per_batch(&self) -> usize {
        self.samples_per_batch
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn staged_len(&self) -> usize {
        self.staged_human.len() + self.staged_bot.len()
    }

    pub fn has_pending(&self, hand_type: HandType) -> bool {
        self.pending.iter().any(|b| b.hand_type == hand_type)
    }

    pub fn is_ready(&self, n: usize, require_mixed: bool) -> bool {
        self.pending.len() >= n
            && (!require_mixed
                || n < 2
                || (self.has_pending(HandType::Human) && self.has_pending(HandType::Bot)))
    }

    /// Samples to ask for so the next chunk can be completed.
    pub fn samples_wanted(&self, n: usize, require_mixed: bool) -> usize {
        let batches = n.saturating_sub(self.pending.len());
        let mut wanted = (batches * self.samples_per_batch).saturating_sub(self.staged_len());
        if require_mixed && n >= 2 {
            for hand_type in [HandType::Human, HandType::Bot] {
                if !self.has_pending(hand_type) {
                    wanted = wanted.max(self.samples_per_batch);
                }
            }
        }
        wanted.max(1)
    }

    /// Remove exactly `n` batches, oldest first. With `require_mixed`, the
    /// oldest batch of a missing type replaces the newest pick.
    pub fn take_chunk(&mut self, n: usize, require_mixed: bool) -> Option<EvalChunk> {
        if n == 0 || !self.is_ready(n, require_mixed) {
            return None;
        }
        let mut picks: Vec<usize> = (0..n).collect();
        if require_mixed && n >= 2 {
            let has = |t: HandType| picks.iter().any(|&i| self.pending[i].hand_type == t);
            let missing = match (has(HandType::Human), has(HandType::Bot)) {
                (true, false) => Some(HandType::Bot),
                (false, true) => Some(HandType::Human),
                _ => None,
            };
            if let Some(missing) = missing {
                let replacement = (n..self.pending.len()).find(|&i| self.pending[i].hand_type == missing)?;
                picks[n - 1] = replacement;
            }
        }

        // Remove from the back so earlier indices stay valid.
        let mut removed: Vec<(usize, EvalBatch)> = Vec::with_capacity(n);
        let mut order = picks.clone();
        order.sort_unstable_by(|a, b| b.cmp(a));
        for i in order {
            if let Some(batch) = self.pending.remove(i) {
                removed.push((i, batch));
            }
        }
        removed.sort_by_key(|(i, _)| *i);
        Some(EvalChunk {
            batches: removed.into_iter().map(|(_, b)| b).collect(),
        })
    }

    /// Put an undispatched chunk back at the front, preserving its order.
    pub fn restore(&mut self, chunk: EvalChunk) {
        for batch in chunk.batches.into_iter().rev() {
            self.pending.push_front(batch);
        }
    }
}
