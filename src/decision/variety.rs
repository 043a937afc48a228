use std::collections::{BTreeMap, HashMap};

use rand::Rng;

use crate::config::VarietyParams;
use crate::types::ContentCategory;

const EXPOSURE_DECAY: f64 = 0.95;
const OPTIMAL_EXPOSURE: f64 = 0.5;
const UNDER_EXPOSED_FALLOFF: f64 = 1.0;
const OVER_EXPOSED_FALLOFF: f64 = 2.0;

/// Per-category exposure tracker with an epsilon-greedy recommender.
///
/// Novelty peaks at the half-exposed point and falls off faster on the
/// over-exposed side, so recently hammered categories drop out of the
/// recommendation quickly while untouched ones stay attractive.
#[derive(Debug, Clone)]
pub struct ContentVarietyOptimizer {
    params: VarietyParams,
    exposure: HashMap<ContentCategory, f64>,
}

impl ContentVarietyOptimizer {
    pub fn new(params: VarietyParams) -> Self {
        let exposure = ContentCategory::ALL
            .iter()
            .map(|category| (*category, 0.0))
            .collect();
        Self { params, exposure }
    }

    /// Raises the target category and decays every other one.
    pub fn update_content_exposure(&mut self, category: ContentCategory, amount: f64) {
        let amount = amount.max(0.0);
        for (entry_category, exposure) in self.exposure.iter_mut() {
            if *entry_category == category {
                *exposure = (*exposure + amount).min(1.0);
            } else {
                *exposure *= EXPOSURE_DECAY;
            }
        }
    }

    /// Configured per-event exposure increment.
    pub fn exposure_step(&self) -> f64 {
        self.params.exposure_step
    }

    pub fn exposure(&self, category: ContentCategory) -> f64 {
        self.exposure.get(&category).copied().unwrap_or(0.0)
    }

    /// Peaked novelty curve centered on the optimally stimulated exposure.
    pub fn calculate_content_novelty(&self, category: ContentCategory) -> f64 {
        let exposure = self.exposure(category);
        let distance = exposure - OPTIMAL_EXPOSURE;
        let falloff = if exposure <= OPTIMAL_EXPOSURE {
            UNDER_EXPOSED_FALLOFF
        } else {
            OVER_EXPOSED_FALLOFF
        };
        (-falloff * distance * distance).exp()
    }

    /// True when the recommender should ignore novelty and pick uniformly.
    pub fn should_exploit_or_explore<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.random::<f64>() < self.params.exploration_epsilon
    }

    /// Highest-novelty category. Ties resolve to the first category in
    /// declaration order.
    pub fn recommend_content(&self) -> ContentCategory {
        let mut best = ContentCategory::ALL[0];
        let mut best_novelty = f64::NEG_INFINITY;
        for category in ContentCategory::ALL {
            let novelty = self.calculate_content_novelty(category);
            if novelty > best_novelty {
                best = category;
                best_novelty = novelty;
            }
        }
        best
    }

    /// Greedy recommendation with an epsilon-probability uniform override.
    pub fn recommend_with_exploration<R: Rng + ?Sized>(&self, rng: &mut R) -> ContentCategory {
        if self.should_exploit_or_explore(rng) {
            let index = rng.random_range(0..ContentCategory::ALL.len());
            return ContentCategory::ALL[index];
        }
        self.recommend_content()
    }

    /// Exposure table keyed by category label, in stable order.
    pub fn exposure_map(&self) -> BTreeMap<String, f64> {
        ContentCategory::ALL
            .iter()
            .map(|category| (category.as_str().to_string(), self.exposure(*category)))
            .collect()
    }

    pub fn reset(&mut self) {
        for exposure in self.exposure.values_mut() {
            *exposure = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn optimizer_with_epsilon(epsilon: f64) -> ContentVarietyOptimizer {
        ContentVarietyOptimizer::new(VarietyParams {
            exploration_epsilon: epsilon,
            ..VarietyParams::default()
        })
    }

    #[test]
    fn test_exposure_caps_and_decays() {
        let mut optimizer = optimizer_with_epsilon(0.0);
        optimizer.update_content_exposure(ContentCategory::Exploration, 0.5);
        optimizer.update_content_exposure(ContentCategory::Combat, 0.2);
        assert!((optimizer.exposure(ContentCategory::Combat) - 0.2).abs() < 1e-9);
        // Non-target decayed once.
        assert!((optimizer.exposure(ContentCategory::Exploration) - 0.475).abs() < 1e-9);

        for _ in 0..30 {
            optimizer.update_content_exposure(ContentCategory::Combat, 0.2);
        }
        assert_eq!(optimizer.exposure(ContentCategory::Combat), 1.0);
    }

    #[test]
    fn test_novelty_peaks_at_half_exposure() {
        let mut optimizer = optimizer_with_epsilon(0.0);
        optimizer.update_content_exposure(ContentCategory::Puzzle, 0.5);
        assert!((optimizer.calculate_content_novelty(ContentCategory::Puzzle) - 1.0).abs() < 1e-9);

        // Same distance from the peak scores worse on the over-exposed side.
        let mut under = optimizer_with_epsilon(0.0);
        under.update_content_exposure(ContentCategory::Puzzle, 0.2);
        let mut over = optimizer_with_epsilon(0.0);
        over.update_content_exposure(ContentCategory::Puzzle, 0.8);
        let under_novelty = under.calculate_content_novelty(ContentCategory::Puzzle);
        let over_novelty = over.calculate_content_novelty(ContentCategory::Puzzle);
        assert!(under_novelty < 1.0);
        assert!(over_novelty < under_novelty);
    }

    #[test]
    fn test_novelty_decreases_away_from_peak() {
        let optimizer = optimizer_with_epsilon(0.0);
        let novelty_at = |exposure: f64| {
            let mut o = optimizer.clone();
            o.update_content_exposure(ContentCategory::Social, exposure);
            o.calculate_content_novelty(ContentCategory::Social)
        };
        let mut previous = novelty_at(0.5);
        for exposure in [0.6, 0.7, 0.8, 0.9, 1.0] {
            let n = novelty_at(exposure);
            assert!(n < previous);
            previous = n;
        }
        previous = novelty_at(0.5);
        for exposure in [0.4, 0.3, 0.2, 0.1, 0.0] {
            let n = novelty_at(exposure);
            assert!(n < previous);
            previous = n;
        }
    }

    #[test]
    fn test_recommendation_avoids_hammered_category() {
        let mut optimizer = optimizer_with_epsilon(0.0);
        optimizer.update_content_exposure(ContentCategory::Combat, 1.0);
        let recommended = optimizer.recommend_content();
        assert_ne!(recommended, ContentCategory::Combat);
        // Remaining categories tie at zero exposure; declaration order wins.
        assert_eq!(recommended, ContentCategory::Exploration);
    }

    #[test]
    fn test_full_epsilon_explores_uniformly() {
        let mut optimizer = optimizer_with_epsilon(1.0);
        optimizer.update_content_exposure(ContentCategory::Combat, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(optimizer.recommend_with_exploration(&mut rng));
        }
        // Uniform draws reach every category, including the hammered one.
        assert_eq!(seen.len(), ContentCategory::ALL.len());
    }

    #[test]
    fn test_zero_epsilon_never_explores() {
        let optimizer = optimizer_with_epsilon(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            assert!(!optimizer.should_exploit_or_explore(&mut rng));
            assert_eq!(
                optimizer.recommend_with_exploration(&mut rng),
                optimizer.recommend_content()
            );
        }
    }

    #[test]
    fn test_exposures_stay_in_unit_interval() {
        let mut optimizer = optimizer_with_epsilon(0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        for _ in 0..500 {
            let index = rng.random_range(0..ContentCategory::ALL.len());
            let amount = rng.random::<f64>() * 0.5;
            optimizer.update_content_exposure(ContentCategory::ALL[index], amount);
            for category in ContentCategory::ALL {
                let e = optimizer.exposure(category);
                assert!((0.0..=1.0).contains(&e));
            }
        }
    }

    #[test]
    fn test_exposure_map_is_complete() {
        let optimizer = optimizer_with_epsilon(0.0);
        let map = optimizer.exposure_map();
        assert_eq!(map.len(), 6);
        assert!(map.contains_key("combat"));
        assert!(map.contains_key("crafting"));
    }
}
