//! The consume-once store.
//!
//! Plain data with `&mut self` operations; the actor in [`crate::actor`]
//! owns the only instance, which makes every call a critical section.
//!
//! Unconsumed samples are kept in arrival order keyed by an ingest sequence
//! number, so reservation is FIFO and a displaced pick can be removed in
//! O(log n).
//!
//! A payload is dropped as soon as its sample is reserved; from then on only
//! the consumed marker remembers the id.

use shared_types::{EvalSample, HandType, Timestamp};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{error, warn};

use super::{BufferStats, ConsumedMarker, Reservation};
use crate::error::{DataIntegrityError, EvalBufferError, EvalBufferResult};

#[derive(Debug, Default)]
pub struct EvalBuffer {
    samples: HashMap<String, EvalSample>,
    unconsumed: BTreeMap<u64, String>,
    consumed: HashMap<String, ConsumedMarker>,
    evaluated: HashSet<String>,
    next_seq: u64,
    poisoned: Option<String>,
}

fn hand_type(sample: &EvalSample) -> Option<HandType> {
    sample.dominant_hand_type()
}

impl EvalBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Add samples in order. The whole call is rejected if any sample is
    /// invalid or its id is already known.
    pub fn ingest(&mut self, samples: Vec<EvalSample>) -> EvalBufferResult<usize> {
        let mut incoming = HashSet::with_capacity(samples.len());
        for sample in &samples {
            if sample.sample_id.trim().is_empty() {
                return Err(EvalBufferError::Validation("sample_id is empty".into()));
            }
            if sample.population_tags.is_empty() {
                return Err(EvalBufferError::Validation(format!(
                    "sample {} has no population tags",
                    sample.sample_id
                )));
            }
            if self.samples.contains_key(&sample.sample_id)
                || self.consumed.contains_key(&sample.sample_id)
                || !incoming.insert(sample.sample_id.as_str())
            {
                error!(sample_id = %sample.sample_id, "Duplicate sample ingested");
                return Err(DataIntegrityError::DuplicateSample(sample.sample_id.clone()).into());
            }
        }

        let count = samples.len();
        for sample in samples {
            self.unconsumed.insert(self.next_seq, sample.sample_id.clone());
            self.next_seq += 1;
            self.samples.insert(sample.sample_id.clone(), sample);
        }
        Ok(count)
    }

    /// Take up to `limit` unconsumed samples, oldest first, and mark them
    /// consumed.
    ///
    /// With `require_mixed`, if the oldest `limit` samples share one hand
    /// type, the oldest sample of the other type replaces the newest pick.
    pub fn reserve(
        &mut self,
        limit: usize,
        require_mixed: bool,
        now: Timestamp,
    ) -> EvalBufferResult<Reservation> {
        if let Some(reason) = &self.poisoned {
            return Err(DataIntegrityError::Poisoned(reason.clone()).into());
        }
        if limit == 0 {
            return Ok(Reservation::default());
        }

        let mut picks: Vec<u64> = self.unconsumed.keys().take(limit).copied().collect();
        if require_mixed && picks.len() >= 2 {
            self.mix_in_missing_type(&mut picks);
        }

        for seq in &picks {
            let id = &self.unconsumed[seq];
            if self.consumed.contains_key(id) {
                let reason = format!("double consumption of {id}");
                error!(sample_id = %id, "Consumed marker collision; poisoning buffer");
                self.poisoned = Some(reason);
                return Err(DataIntegrityError::DoubleConsumption(id.clone()).into());
            }
        }

        let mut samples = Vec::with_capacity(picks.len());
        for seq in picks {
            let Some(id) = self.unconsumed.remove(&seq) else {
                continue;
            };
            self.consumed.insert(
                id.clone(),
                ConsumedMarker {
                    sample_id: id.clone(),
                    consumed_at: now,
                },
            );
            if let Some(sample) = self.samples.remove(&id) {
                samples.push(sample);
            }
        }

        let mixed = samples.iter().any(|s| hand_type(s) == Some(HandType::Human))
            && samples.iter().any(|s| hand_type(s) == Some(HandType::Bot));
        Ok(Reservation { samples, mixed })
    }

    fn type_of_seq(&self, seq: &u64) -> Option<HandType> {
        self.unconsumed
            .get(seq)
            .and_then(|id| self.samples.get(id))
            .and_then(hand_type)
    }

    fn mix_in_missing_type(&self, picks: &mut [u64]) {
        let has = |t: HandType| picks.iter().any(|seq| self.type_of_seq(seq) == Some(t));
        let missing = match (has(HandType::Human), has(HandType::Bot)) {
            (true, false) => HandType::Bot,
            (false, true) => HandType::Human,
            _ => return,
        };
        let Some(&last) = picks.last() else {
            return;
        };
        let replacement = self
            .unconsumed
            .range(last + 1..)
            .map(|(seq, _)| *seq)
            .find(|seq| self.type_of_seq(seq) == Some(missing));
        if let (Some(seq), Some(slot)) = (replacement, picks.last_mut()) {
            *slot = seq;
        }
    }

    /// Record that consumed samples went through scoring. Returns how many
    /// were newly marked.
    pub fn mark_evaluated(&mut self, ids: &[String]) -> usize {
        let mut marked = 0;
        for id in ids {
            if !self.consumed.contains_key(id) {
                warn!(sample_id = %id, "Ignoring evaluation mark for unknown or unreserved sample");
                continue;
            }
            if self.evaluated.insert(id.clone()) {
                marked += 1;
            }
        }
        marked
    }

    pub fn marker(&self, sample_id: &str) -> Option<&ConsumedMarker> {
        self.consumed.get(sample_id)
    }

    /// Payloads still held, i.e. samples not yet reserved.
    pub fn resident_payloads(&self) -> usize {
        self.samples.len()
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            total: self.unconsumed.len() + self.consumed.len(),
            unconsumed: self.unconsumed.len(),
            consumed: self.consumed.len(),
            evaluated: self.evaluated.len(),
            poisoned: self.is_poisoned(),
        }
    }

    /// Re-queue an already consumed id. Only reachable from tests, to drive
    /// the marker collision path.
    #[cfg(test)]
    pub(crate) fn requeue_consumed_for_test(&mut self, sample_id: &str) {
        self.unconsumed.insert(self.next_seq, sample_id.to_string());
        self.next_seq += 1;
    }
}
