//! Value-based and uniformly random reductions. Pools are expected sorted by value.

use crate::solution::Solution;
use rand::Rng;

/// Keep the `target` best solutions.
pub(super) fn bests(pool: &mut Vec<Solution>, target: usize) {
    pool.truncate(target);
}

/// Keep `target` solutions picked uniformly at random; the best one is always kept when
/// `elitist`.
pub(super) fn random_uniform<R: Rng>(pool: &mut Vec<Solution>, target: usize, elitist: bool, rng: &mut R) {
    let n = pool.len();
    if n <= target {
        return;
    }
    for i in usize::from(elitist)..target {
        let choice = rng.gen_range(i..n);
        pool.swap(i, choice);
    }
    pool.truncate(target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn valued_pool(values: &[f64]) -> Vec<Solution> {
        values
            .iter()
            .map(|&value| Solution {
                facilities: Vec::new(),
                assignment: Vec::new(),
                value,
                terminal: false,
            })
            .collect()
    }

    #[test]
    fn test_bests_is_idempotent() {
        let mut pool = valued_pool(&[9.0, 7.0, 5.0, 3.0, 1.0]);
        bests(&mut pool, 3);
        let once: Vec<f64> = pool.iter().map(|s| s.value).collect();
        bests(&mut pool, 3);
        let twice: Vec<f64> = pool.iter().map(|s| s.value).collect();
        assert_eq!(once, vec![9.0, 7.0, 5.0]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_random_uniform_elitist_keeps_best() {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut pool = valued_pool(&[10.0, 8.0, 6.0, 4.0, 2.0, 0.0]);
            random_uniform(&mut pool, 3, true, &mut rng);
            assert_eq!(pool.len(), 3);
            assert_eq!(pool[0].value, 10.0);

            let mut values: Vec<f64> = pool.iter().map(|s| s.value).collect();
            values.dedup();
            assert_eq!(values.len(), 3);
        }
    }

    #[test]
    fn test_random_uniform_small_pool_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut pool = valued_pool(&[3.0, 2.0]);
        random_uniform(&mut pool, 5, false, &mut rng);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].value, 3.0);
    }
}
