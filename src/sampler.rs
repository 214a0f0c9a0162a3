use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

use crate::types::{MAX_NUMBER, MIN_NUMBER, NUMBERS_PER_SET, Recommendation, RecommendationSet};

/// Set count used when a caller asks for zero, a negative or a non-numeric amount.
pub const DEFAULT_SET_COUNT: usize = 5;

/// Price of one ticket line in won.
pub const PRICE_PER_SET: u64 = 1000;

/// Map a caller-supplied set count onto a usable one.
pub fn normalize_set_count(requested: Option<i64>) -> usize {
    match requested {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_SET_COUNT,
    }
}

/// Uniform 6-of-45 sampler.
///
/// Each set is built by rejection: uniform draws over 1..=45 are kept until six
/// distinct values are collected, which makes every combination equally
/// likely. Sets share nothing with each other.
pub struct RecommendationSampler<R> {
    rng: R,
}

impl RecommendationSampler<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RecommendationSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn draw_ball(&mut self) -> u8 {
        self.rng.gen_range(MIN_NUMBER..=MAX_NUMBER)
    }

    pub fn sample_set(&mut self) -> RecommendationSet {
        let mut picked = BTreeSet::new();
        while picked.len() < NUMBERS_PER_SET {
            picked.insert(self.draw_ball());
        }

        let mut numbers = [0u8; NUMBERS_PER_SET];
        for (slot, n) in numbers.iter_mut().zip(picked) {
            *slot = n;
        }
        RecommendationSet { numbers }
    }

    /// `set_count` of zero falls back to [`DEFAULT_SET_COUNT`].
    pub fn generate(&mut self, set_count: usize) -> Vec<RecommendationSet> {
        let count = if set_count == 0 { DEFAULT_SET_COUNT } else { set_count };
        (0..count).map(|_| self.sample_set()).collect()
    }

    pub fn recommend(&mut self, set_count: usize, latest_draw_number: u32) -> Recommendation {
        let sets = self.generate(set_count);
        Recommendation {
            total_cost: PRICE_PER_SET * sets.len() as u64,
            sets,
            latest_draw_number,
            issued_at: Local::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn assert_valid(set: &RecommendationSet) {
        let n = &set.numbers;
        assert!(n.iter().all(|&x| (1..=45).contains(&x)), "out of range: {:?}", n);
        assert!(n.windows(2).all(|w| w[0] < w[1]), "not strictly ascending: {:?}", n);
    }

    #[test]
    fn generate_returns_requested_number_of_valid_sets() {
        let mut sampler = RecommendationSampler::seeded(7);
        for k in [1, 5, 10] {
            let sets = sampler.generate(k);
            assert_eq!(sets.len(), k);
            sets.iter().for_each(assert_valid);
        }
    }

    #[test]
    fn zero_sets_fall_back_to_default() {
        let mut sampler = RecommendationSampler::seeded(1);
        assert_eq!(sampler.generate(0).len(), DEFAULT_SET_COUNT);
    }

    #[test]
    fn normalize_handles_non_positive_and_missing() {
        assert_eq!(normalize_set_count(Some(3)), 3);
        assert_eq!(normalize_set_count(Some(0)), DEFAULT_SET_COUNT);
        assert_eq!(normalize_set_count(Some(-4)), DEFAULT_SET_COUNT);
        assert_eq!(normalize_set_count(None), DEFAULT_SET_COUNT);
    }

    #[test]
    fn seeded_sampler_is_reproducible() {
        let first = RecommendationSampler::seeded(2024).generate(2);
        let second = RecommendationSampler::seeded(2024).generate(2);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        first.iter().for_each(assert_valid);
    }

    #[test]
    fn single_draws_are_roughly_uniform() {
        let mut sampler = RecommendationSampler::seeded(42);
        let mut counts = [0u32; 46];
        for _ in 0..10_000 {
            counts[sampler.draw_ball() as usize] += 1;
        }
        assert_eq!(counts[0], 0);
        // expected ~222 per value, stddev ~15
        for (value, &count) in counts.iter().enumerate().skip(1) {
            assert!(
                (140..=310).contains(&count),
                "value {} drawn {} times",
                value,
                count
            );
        }
    }

    /// Replays a fixed list of `next_u32` values, cycling when exhausted.
    struct ScriptedRng {
        values: Vec<u32>,
        pos: usize,
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            let v = self.values[self.pos % self.values.len()];
            self.pos += 1;
            v
        }

        fn next_u64(&mut self) -> u64 {
            (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32())
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(4) {
                let bytes = self.next_u32().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    /// A `u32` in the middle of the bucket `gen_range(1..=45)` maps to ball `k + 1`.
    fn ball_value(k: u32) -> u32 {
        k * (u32::MAX / 45) + u32::MAX / 90
    }

    #[test]
    fn repeated_draws_are_rejected_until_six_distinct() {
        let mut rng = ScriptedRng {
            values: [0, 0, 0, 1, 1, 2, 3, 4, 5].into_iter().map(ball_value).collect(),
            pos: 0,
        };

        let set = RecommendationSampler::new(&mut rng).sample_set();

        assert_valid(&set);
        assert_eq!(set.numbers, [1, 2, 3, 4, 5, 6]);
        assert_eq!(rng.pos, 9);
    }

    #[test]
    fn heavily_repeating_source_still_yields_distinct_sets() {
        let mut rng = ScriptedRng {
            values: [44, 44, 44, 44, 0, 44, 0, 7, 7, 7, 21, 21, 30, 12]
                .into_iter()
                .map(ball_value)
                .collect(),
            pos: 0,
        };

        let sets = RecommendationSampler::new(&mut rng).generate(3);

        assert_eq!(sets.len(), 3);
        for set in &sets {
            assert_valid(set);
            assert_eq!(set.numbers, [1, 8, 13, 22, 31, 45]);
        }
    }

    #[test]
    fn recommendation_costs_one_thousand_per_set() {
        let rec = RecommendationSampler::seeded(3).recommend(4, 1100);
        assert_eq!(rec.sets.len(), 4);
        assert_eq!(rec.total_cost, 4000);
        assert_eq!(rec.latest_draw_number, 1100);
    }
}
