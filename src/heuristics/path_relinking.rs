//! Path relinking between elite solutions.
//!
//! For every pair of solutions of the pool, the better one walks toward the worse one
//! through the relinking local search, and the best solution met on the way is
//! harvested. New solutions are polished by the regular local search and reduced by the
//! selection-phase strategies; with [`PathRelinkingMode::UntilNoBetter`] they are then
//! relinked again for as long as the best value keeps improving.

use crate::config::{LocalSearchKind, PathRelinkingMode};
use crate::heuristics::local_search::{build_local_search, improve_pool, MoveRules};
use crate::instance::Problem;
use crate::parallel::WorkerPool;
use crate::precomp::RunPrecomp;
use crate::reduction::{Phase, ReductionContext, ReductionStrategy};
use crate::solution::{best_value, delete_repeated, sort_by_value, Solution};
use rand::Rng;
use std::collections::HashSet;
use std::time::Instant;

/// Result of a path-relinking run
#[derive(Debug, Clone)]
pub struct RelinkOutcome {
    /// Every solution seen, input pool included, sorted by decreasing value
    pub pool: Vec<Solution>,
    /// Solutions that were not in the input pool
    pub n_new: usize,
    pub rounds: usize,
    pub n_local_searches: usize,
    pub n_local_search_moves: usize,
    pub local_search_seconds: f64,
}

pub struct PathRelinking<'a> {
    pub problem: &'a Problem,
    pub precomp: &'a RunPrecomp,
    pub workers: &'a WorkerPool,
    pub mode: PathRelinkingMode,
    /// Search walking from one solution to the other
    pub relink_search: LocalSearchKind,
    /// Search applied to the relinked solutions
    pub local_search: LocalSearchKind,
    pub rules: MoveRules,
    /// Strategies applied to the relinked solutions before the next round
    pub strategies: &'a [ReductionStrategy],
}

impl<'a> PathRelinking<'a> {
    pub fn run<R: Rng>(&self, pool: Vec<Solution>, rng: &mut R) -> RelinkOutcome {
        let mut current = pool;
        delete_repeated(&mut current);
        let mut outcome = RelinkOutcome {
            pool: Vec::new(),
            n_new: 0,
            rounds: 0,
            n_local_searches: 0,
            n_local_search_moves: 0,
            local_search_seconds: 0.0,
        };
        if self.mode == PathRelinkingMode::Off || current.len() <= 1 {
            sort_by_value(&mut current);
            outcome.pool = current;
            return outcome;
        }

        let reducer = ReductionContext {
            problem: self.problem,
            precomp: self.precomp,
            workers: self.workers,
        };
        let mut known: HashSet<Vec<usize>> = current.iter().map(|s| s.facilities.clone()).collect();
        let mut harvested: Vec<Solution> = Vec::new();

        while current.len() > 1 {
            outcome.rounds += 1;
            sort_by_value(&mut current);
            let previous_best = best_value(&current).max(best_value(&harvested));

            let mut relinked = self.relink_pairs(&current, rng.gen());
            delete_repeated(&mut relinked);
            relinked.retain(|s| !known.contains(&s.facilities));

            if self.local_search != LocalSearchKind::None && !relinked.is_empty() {
                let start = Instant::now();
                outcome.n_local_search_moves += improve_pool(
                    self.problem,
                    self.precomp,
                    self.workers,
                    self.local_search,
                    self.rules,
                    &mut relinked,
                    rng.gen(),
                );
                outcome.n_local_searches += relinked.len();
                outcome.local_search_seconds += start.elapsed().as_secs_f64();
                delete_repeated(&mut relinked);
                relinked.retain(|s| !known.contains(&s.facilities));
            }
            log::info!(
                "Path relinking round {} found {} new solutions",
                outcome.rounds,
                relinked.len()
            );

            outcome.n_new += relinked.len();
            known.extend(relinked.iter().map(|s| s.facilities.clone()));
            harvested.append(&mut current);

            let improved = best_value(&relinked) > previous_best;
            reducer.reduce_phase(self.strategies, Phase::Selection, &mut relinked, rng);
            current = relinked;
            if self.mode == PathRelinkingMode::OneIteration || !improved {
                break;
            }
        }

        harvested.append(&mut current);
        delete_repeated(&mut harvested);
        sort_by_value(&mut harvested);
        outcome.pool = harvested;
        outcome
    }

    /// Relink every pair `(i, j)` with `i < j` of a pool sorted by value, from `i` toward `j`.
    fn relink_pairs(&self, sols: &[Solution], seed: u64) -> Vec<Solution> {
        let pairs: Vec<(usize, usize)> = (0..sols.len())
            .flat_map(|i| ((i + 1)..sols.len()).map(move |j| (i, j)))
            .collect();
        let kind = match self.relink_search {
            LocalSearchKind::None => LocalSearchKind::BestImprovement,
            kind => kind,
        };
        let n_facilities = self.problem.n_facilities();
        self.workers.map_round_robin_with(
            pairs.len(),
            |worker| build_local_search(kind, self.rules, n_facilities, seed.wrapping_add(worker as u64)),
            |searcher, k| {
                let (i, j) = pairs[k];
                let mut sol = sols[i].clone();
                if let Some(searcher) = searcher.as_mut() {
                    searcher.improve(self.problem, self.precomp, &mut sol, Some(&sols[j]));
                }
                sol
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::local_search::tests::{dominated_problem, solution_of};
    use crate::reduction::parse_strategies;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn relinker<'a>(
        problem: &'a Problem,
        precomp: &'a RunPrecomp,
        workers: &'a WorkerPool,
        mode: PathRelinkingMode,
        strategies: &'a [ReductionStrategy],
    ) -> PathRelinking<'a> {
        PathRelinking {
            problem,
            precomp,
            workers,
            mode,
            relink_search: LocalSearchKind::BestImprovement,
            local_search: LocalSearchKind::None,
            rules: MoveRules::default(),
            strategies,
        }
    }

    #[test]
    fn test_identical_solutions_yield_nothing() {
        let problem = dominated_problem();
        let workers = WorkerPool::new(2).unwrap();
        let precomp = RunPrecomp::new(&problem, &[], false, &workers);
        let pr = relinker(&problem, &precomp, &workers, PathRelinkingMode::UntilNoBetter, &[]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let sol = solution_of(&problem, &[0, 2]);
        let outcome = pr.run(vec![sol.clone(), sol], &mut rng);
        assert!(outcome.pool.len() <= 1);
        assert_eq!(outcome.n_new, 0);
        assert_eq!(outcome.rounds, 0);
    }

    #[test]
    fn test_relinking_harvests_intermediate_solutions() {
        let problem = dominated_problem();
        let workers = WorkerPool::new(2).unwrap();
        let precomp = RunPrecomp::new(&problem, &[], false, &workers);
        let pr = relinker(&problem, &precomp, &workers, PathRelinkingMode::OneIteration, &[]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let pool = vec![solution_of(&problem, &[0, 1]), solution_of(&problem, &[2, 3])];
        let outcome = pr.run(pool, &mut rng);

        assert_eq!(outcome.rounds, 1);
        assert!(outcome.n_new >= 1);
        assert_eq!(outcome.pool.len(), 2 + outcome.n_new);
        assert!(outcome.pool[0].value >= 45.0 - 1e-9);
        for pair in outcome.pool.windows(2) {
            assert!(pair[0].value >= pair[1].value);
            assert!(!pair[0].same_facilities(&pair[1]));
        }
        assert!(outcome.pool.iter().all(|s| s.check_integrity(&problem)));
    }

    #[test]
    fn test_until_no_better_with_local_search() {
        let problem = dominated_problem();
        let workers = WorkerPool::new(3).unwrap();
        let precomp = RunPrecomp::new(&problem, &[], true, &workers);
        let strategies = parse_strategies(&["_best:2"]).unwrap();
        let mut pr = relinker(&problem, &precomp, &workers, PathRelinkingMode::UntilNoBetter, &strategies);
        pr.local_search = LocalSearchKind::ResendeWerneck;
        pr.relink_search = LocalSearchKind::FirstImprovement;
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let pool = vec![
            solution_of(&problem, &[0, 4]),
            solution_of(&problem, &[1, 2]),
            solution_of(&problem, &[0, 1, 4]),
        ];
        let outcome = pr.run(pool, &mut rng);

        assert!(outcome.rounds >= 1);
        assert!(outcome.pool.len() >= 3);
        let mut sets: Vec<Vec<usize>> = outcome.pool.iter().map(|s| s.facilities.clone()).collect();
        sets.sort();
        sets.dedup();
        assert_eq!(sets.len(), outcome.pool.len());
    }
}
