//! Pool reduction strategies.

pub mod strategy;

mod diversity;
mod rank;
mod simple;
mod vision;

pub use strategy::{parse_strategies, Phase, ReductionMethod, ReductionStrategy};

use crate::dissimilarity::DissimilarityOracle;
use crate::instance::Problem;
use crate::parallel::WorkerPool;
use crate::precomp::RunPrecomp;
use crate::solution::{sort_by_value, Solution};
use rand::Rng;

/// Shared, read-only inputs of every reduction
pub struct ReductionContext<'a> {
    pub problem: &'a Problem,
    pub precomp: &'a RunPrecomp,
    pub workers: &'a WorkerPool,
}

impl<'a> ReductionContext<'a> {
    /// Sort `pool` by decreasing value and shrink it to the strategy target.
    pub fn reduce<R: Rng>(&self, strategy: &ReductionStrategy, pool: &mut Vec<Solution>, rng: &mut R) {
        sort_by_value(pool);
        if pool.len() <= strategy.target {
            return;
        }
        log::info!(
            "Reducing {} -> {} solutions, {}",
            pool.len(),
            strategy.target,
            strategy.description()
        );
        match strategy.method {
            ReductionMethod::Bests => simple::bests(pool, strategy.target),
            ReductionMethod::RandomUniform => simple::random_uniform(pool, strategy.target, strategy.elitist, rng),
            ReductionMethod::RandomRank => rank::random_rank(pool, strategy.target, strategy.elitist, rng),
            ReductionMethod::Sdbs | ReductionMethod::SdbsBests => {
                let oracle = DissimilarityOracle::new(self.problem, self.precomp, strategy.dissimilarity);
                diversity::diversity_starting(
                    &oracle,
                    self.workers,
                    pool,
                    strategy.target,
                    strategy.method == ReductionMethod::SdbsBests,
                );
            }
            ReductionMethod::VisionRange => {
                let oracle = DissimilarityOracle::new(self.problem, self.precomp, strategy.dissimilarity);
                let range = strategy.vision_range.unwrap_or(2 * strategy.target);
                vision::vision_range_reduction(&oracle, self.workers, pool, strategy.target, range);
            }
        }
    }

    /// Apply, in order, every strategy of the given phase.
    pub fn reduce_phase<R: Rng>(
        &self,
        strategies: &[ReductionStrategy],
        phase: Phase,
        pool: &mut Vec<Solution>,
        rng: &mut R,
    ) {
        for strategy in strategies.iter().filter(|s| s.phase == phase) {
            self.reduce(strategy, pool, rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::tests::create_costly_problem;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Ten distinct solutions of the costly problem
    fn ten_solutions(problem: &Problem) -> Vec<Solution> {
        (1u32..16)
            .map(|mask| {
                let mut sol = Solution::empty(problem);
                for f in 0..4 {
                    if mask & (1 << f) != 0 {
                        sol.add(problem, f);
                    }
                }
                sol
            })
            .take(10)
            .collect()
    }

    #[test]
    fn test_best_then_random_chain() {
        let problem = create_costly_problem();
        let workers = WorkerPool::new(2).unwrap();
        let precomp = RunPrecomp::new(&problem, &[], false, &workers);
        let ctx = ReductionContext {
            problem: &problem,
            precomp: &precomp,
            workers: &workers,
        };
        let strategies = parse_strategies(&["best:5", "rand:2"]).unwrap();

        let mut sorted = ten_solutions(&problem);
        sort_by_value(&mut sorted);
        let top5: Vec<Vec<usize>> = sorted[..5].iter().map(|s| s.facilities.clone()).collect();

        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut pool = ten_solutions(&problem);
            ctx.reduce_phase(&strategies, Phase::Construction, &mut pool, &mut rng);
            assert_eq!(pool.len(), 2);
            assert!(pool.iter().all(|s| top5.contains(&s.facilities)));
            assert!(!pool[0].same_facilities(&pool[1]));
        }
    }

    #[test]
    fn test_phase_filtering() {
        let problem = create_costly_problem();
        let workers = WorkerPool::new(2).unwrap();
        let precomp = RunPrecomp::new(&problem, &[], false, &workers);
        let ctx = ReductionContext {
            problem: &problem,
            precomp: &precomp,
            workers: &workers,
        };
        let strategies = parse_strategies(&["best:8", "_best:3"]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let mut pool = ten_solutions(&problem);
        ctx.reduce_phase(&strategies, Phase::Construction, &mut pool, &mut rng);
        assert_eq!(pool.len(), 8);
        ctx.reduce_phase(&strategies, Phase::Selection, &mut pool, &mut rng);
        assert_eq!(pool.len(), 3);
        assert!(pool[0].value >= pool[1].value && pool[1].value >= pool[2].value);
    }

    #[test]
    fn test_every_method_reaches_target() {
        let problem = create_costly_problem();
        let workers = WorkerPool::new(3).unwrap();
        let strategies = parse_strategies(&[
            "rank1:9",
            "sdbs:8:mgemin",
            "sdbs+:7:hausum",
            "vrh:6:automin:3",
            "vrh:5:indexval",
            "rand1:4",
        ])
        .unwrap();
        let modes = strategy::required_facility_distances(&strategies);
        let precomp = RunPrecomp::new(&problem, &modes, false, &workers);
        let ctx = ReductionContext {
            problem: &problem,
            precomp: &precomp,
            workers: &workers,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let mut pool = ten_solutions(&problem);
        for strategy in &strategies {
            ctx.reduce(strategy, &mut pool, &mut rng);
            assert_eq!(pool.len(), strategy.target, "{}", strategy);
        }
    }
}
