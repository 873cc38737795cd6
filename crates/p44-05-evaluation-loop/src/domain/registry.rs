//! Known scorers and per-cycle selection.

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared_types::ScorerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerEndpoint {
    pub id: ScorerId,
    pub endpoint: String,
    #[serde(default = "serving_default")]
    pub serving: bool,
}

fn serving_default() -> bool {
    true
}

#[derive(Debug, Default)]
pub struct ScorerRegistry {
    scorers: RwLock<Vec<ScorerEndpoint>>,
}

impl ScorerRegistry {
    pub fn new(scorers: Vec<ScorerEndpoint>) -> Self {
        let registry = Self::default();
        for scorer in scorers {
            registry.upsert(scorer);
        }
        registry
    }

    /// Insert or replace by id.
    pub fn upsert(&self, scorer: ScorerEndpoint) {
        let mut scorers = self.scorers.write();
        match scorers.iter_mut().find(|s| s.id == scorer.id) {
            Some(existing) => *existing = scorer,
            None => scorers.push(scorer),
        }
    }

    pub fn set_serving(&self, id: &ScorerId, serving: bool) -> bool {
        let mut scorers = self.scorers.write();
        match scorers.iter_mut().find(|s| &s.id == id) {
            Some(s) => {
                s.serving = serving;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.scorers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.read().is_empty()
    }

    /// Explicit ids win when any of them are registered. Otherwise a random
    /// sample of up to `sample_size` serving scorers.
    pub fn select<R: Rng + ?Sized>(
        &self,
        explicit: &[ScorerId],
        sample_size: usize,
        rng: &mut R,
    ) -> Vec<ScorerEndpoint> {
        let scorers = self.scorers.read();
        if !explicit.is_empty() {
            let mut picked: Vec<ScorerEndpoint> = Vec::new();
            for id in explicit {
                if picked.iter().any(|p| &p.id == id) {
                    continue;
                }
                if let Some(s) = scorers.iter().find(|s| &s.id == id) {
                    picked.push(s.clone());
                }
            }
            if !picked.is_empty() {
                return picked;
            }
        }

        let serving: Vec<&ScorerEndpoint> = scorers.iter().filter(|s| s.serving).collect();
        if serving.len() <= sample_size {
            return serving.into_iter().cloned().collect();
        }
        serving
            .choose_multiple(rng, sample_size)
            .map(|s| (*s).clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scorer(id: &str, serving: bool) -> ScorerEndpoint {
        ScorerEndpoint {
            id: ScorerId::from(id),
            endpoint: format!("http://{id}.test"),
            serving,
        }
    }

    fn ids(picked: &[ScorerEndpoint]) -> Vec<String> {
        picked.iter().map(|s| s.id.0.clone()).collect()
    }

    #[test]
    fn test_explicit_list_has_priority() {
        let registry = ScorerRegistry::new(vec![scorer("m1", true), scorer("m2", true), scorer("m3", false)]);
        let mut rng = StdRng::seed_from_u64(7);
        let explicit = [ScorerId::from("m3"), ScorerId::from("ghost"), ScorerId::from("m3")];
        assert_eq!(ids(&registry.select(&explicit, 20, &mut rng)), vec!["m3"]);

        // Nothing registered from the list: fall back to sampling
        let picked = registry.select(&[ScorerId::from("ghost")], 20, &mut rng);
        assert_eq!(ids(&picked), vec!["m1", "m2"]);
    }

    #[test]
    fn test_random_sample_is_bounded_and_unique() {
        let registry = ScorerRegistry::new((0..50).map(|i| scorer(&format!("m{i}"), true)).collect());
        let mut rng = StdRng::seed_from_u64(1);
        let picked = registry.select(&[], 20, &mut rng);
        assert_eq!(picked.len(), 20);
        let mut unique = ids(&picked);
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn test_upsert_and_serving_toggle() {
        let registry = ScorerRegistry::new(vec![scorer("m1", true)]);
        registry.upsert(scorer("m1", true));
        assert_eq!(registry.len(), 1);
        assert!(registry.set_serving(&ScorerId::from("m1"), false));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(registry.select(&[], 5, &mut rng).is_empty());
        assert!(!registry.set_serving(&ScorerId::from("nope"), false));
    }
}
