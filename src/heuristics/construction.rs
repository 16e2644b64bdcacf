//! Restart driver: level-by-level construction of solution pools.
//!
//! Each restart starts from the empty solution and grows a pool one facility at a time.
//! Every level is pruned, reduced by the construction-phase strategies and expanded into
//! the next one; the solutions it held are then polished by local search and stored in
//! the restart selection. Once no level is left, the selection is reduced, optionally
//! relinked, and merged into the final pool shared by all restarts.

use crate::bnb::BranchAndBound;
use crate::config::{LocalSearchKind, PathRelinkingMode, RunConfig};
use crate::error::ConfigError;
use crate::expand::{expand_solutions, ExpansionParams};
use crate::heuristics::local_search::{improve_pool, MoveRules};
use crate::heuristics::path_relinking::PathRelinking;
use crate::instance::Problem;
use crate::parallel::WorkerPool;
use crate::precomp::RunPrecomp;
use crate::reduction::strategy::{first_construction_target, required_facility_distances, validate_targets};
use crate::reduction::{Phase, ReductionContext, ReductionStrategy};
use crate::solution::{best_value, delete_repeated, sort_by_value, Solution};
use crate::statistics::RunStatistics;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::Instant;

/// Output of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Best solutions found, by decreasing value, at most `target_sols` of them
    pub solutions: Vec<Solution>,
    pub statistics: RunStatistics,
}

/// Validate the configuration, then run every restart and return the final pool.
pub fn find_best_solutions(
    problem: &Problem,
    config: &RunConfig,
    strategies: &[ReductionStrategy],
) -> Result<RunResult, ConfigError> {
    config.validate()?;
    validate_targets(strategies)?;
    let workers = WorkerPool::new(config.n_threads)?;
    let precomp = RunPrecomp::new(
        problem,
        &required_facility_distances(strategies),
        config.needs_proximity_orderings(),
        &workers,
    );
    let driver = RestartDriver::new(problem, config, strategies, &precomp, &workers);
    Ok(driver.run())
}

struct RestartDriver<'a> {
    problem: &'a Problem,
    config: &'a RunConfig,
    strategies: &'a [ReductionStrategy],
    precomp: &'a RunPrecomp,
    workers: &'a WorkerPool,
    expansion: ExpansionParams,
    rules: MoveRules,
}

/// Mutable state of a run, owned by the driver thread
struct RunState {
    rng: ChaCha8Rng,
    bnb: BranchAndBound,
    statistics: RunStatistics,
    final_pool: Vec<Solution>,
}

impl<'a> RestartDriver<'a> {
    fn new(
        problem: &'a Problem,
        config: &'a RunConfig,
        strategies: &'a [ReductionStrategy],
        precomp: &'a RunPrecomp,
        workers: &'a WorkerPool,
    ) -> Self {
        let correction_target = config
            .branching_correction
            .then(|| first_construction_target(strategies).unwrap_or(config.target_sols));
        RestartDriver {
            problem,
            config,
            strategies,
            precomp,
            workers,
            expansion: ExpansionParams {
                filter: config.filter,
                branching: config.branching_factor,
                correction_target,
            },
            rules: MoveRules::from_config(config),
        }
    }

    fn reducer(&self) -> ReductionContext<'a> {
        ReductionContext {
            problem: self.problem,
            precomp: self.precomp,
            workers: self.workers,
        }
    }

    fn run(&self) -> RunResult {
        let mut state = RunState {
            rng: ChaCha8Rng::seed_from_u64(self.config.seed),
            bnb: BranchAndBound::new(self.precomp),
            statistics: RunStatistics::new(self.problem.n_facilities(), self.config.n_restarts),
            final_pool: Vec::new(),
        };
        for restart in 0..self.config.n_restarts {
            log::info!("== RESTART {}/{} ==", restart + 1, self.config.n_restarts);
            self.run_restart(restart, &mut state);
        }
        RunResult {
            solutions: state.final_pool,
            statistics: state.statistics,
        }
    }

    fn run_restart(&self, restart: usize, state: &mut RunState) {
        let start = Instant::now();
        let first_restart = restart == 0;
        let n_facilities = self.problem.n_facilities();
        let reducer = self.reducer();
        let mut restart_best = f64::NEG_INFINITY;
        let mut selection: Vec<Solution> = Vec::new();

        let mut pool = vec![Solution::empty(self.problem)];
        let mut csize = 0;
        while !pool.is_empty() {
            log::info!("Base has {} solutions of size {}", pool.len(), csize);
            if self.config.branch_and_bound {
                let before = pool.len();
                let pruned = state.bnb.prune(self.problem, self.precomp, &mut pool);
                if pruned > 0 {
                    log::info!("Pruned {} -> {} solutions by B&B", before, pool.len());
                }
            }
            if first_restart {
                state.statistics.record_level_size(csize, pool.len());
            }

            reducer.reduce_phase(self.strategies, Phase::Construction, &mut pool, &mut state.rng);
            if first_restart {
                state.statistics.record_level_size_after_reduction(csize, pool.len());
            }

            let expandable = csize < n_facilities
                && self.problem.size_restriction_maximum.map_or(true, |max| csize < max);
            let children = if expandable && !pool.is_empty() {
                log::info!("Expanding {} solutions", pool.len());
                expand_solutions(
                    self.problem,
                    self.precomp,
                    &mut pool,
                    &self.expansion,
                    &mut state.rng,
                    self.workers,
                )
            } else {
                for sol in pool.iter_mut() {
                    sol.terminal = true;
                }
                Vec::new()
            };

            if self.problem.size_allowed(csize) {
                self.store_level(pool, csize, first_restart, state, &mut restart_best, &mut selection);
            }
            pool = children;
            csize += 1;
        }
        if first_restart {
            state.statistics.firstr_n_iterations = csize;
        }
        state.statistics.total_n_iterations += csize;

        delete_repeated(&mut selection);
        reducer.reduce_phase(self.strategies, Phase::Selection, &mut selection, &mut state.rng);
        if !self.config.local_search_before_select {
            self.local_search(&mut selection, state);
            delete_repeated(&mut selection);
        }
        restart_best = restart_best.max(best_value(&selection));

        if self.config.path_relinking != PathRelinkingMode::Off {
            selection = self.path_relinking(selection, state);
            restart_best = restart_best.max(best_value(&selection));
        }

        self.merge_into_final(selection, state);
        let seconds = start.elapsed().as_secs_f64();
        state.statistics.record_restart(restart, seconds, restart_best);
        log::info!(
            "Restart {} done in {:.3}s, best value {}",
            restart + 1,
            seconds,
            restart_best
        );
    }

    /// Polish the solutions of a finished level and move them into the selection.
    fn store_level(
        &self,
        pool: Vec<Solution>,
        csize: usize,
        first_restart: bool,
        state: &mut RunState,
        restart_best: &mut f64,
        selection: &mut Vec<Solution>,
    ) {
        let mut pool = pool;
        if self.config.local_search_before_select {
            if self.config.select_only_terminal {
                let (mut terminals, others): (Vec<Solution>, Vec<Solution>) =
                    pool.into_iter().partition(|s| s.terminal);
                self.local_search(&mut terminals, state);
                terminals.extend(others);
                pool = terminals;
            } else {
                self.local_search(&mut pool, state);
            }
        }

        let before = pool.len();
        delete_repeated(&mut pool);
        if pool.len() < before {
            log::info!("Reduced {} solutions to {} local optima", before, pool.len());
        }
        if first_restart {
            state.statistics.record_local_optima(csize, pool.len());
        }
        *restart_best = restart_best.max(best_value(&pool));

        if self.config.select_only_terminal {
            selection.extend(pool.into_iter().filter(|s| s.terminal));
        } else {
            selection.extend(pool);
        }
    }

    fn local_search(&self, pool: &mut [Solution], state: &mut RunState) {
        if self.config.local_search == LocalSearchKind::None || pool.is_empty() {
            return;
        }
        log::info!("Performing LS on {} solutions", pool.len());
        let start = Instant::now();
        let n_moves = improve_pool(
            self.problem,
            self.precomp,
            self.workers,
            self.config.local_search,
            self.rules,
            pool,
            state.rng.gen(),
        );
        state
            .statistics
            .record_local_search(pool.len(), n_moves, start.elapsed().as_secs_f64());
    }

    fn path_relinking(&self, selection: Vec<Solution>, state: &mut RunState) -> Vec<Solution> {
        let start = Instant::now();
        let relinking = PathRelinking {
            problem: self.problem,
            precomp: self.precomp,
            workers: self.workers,
            mode: self.config.path_relinking,
            relink_search: self.config.local_search_pr,
            local_search: self.config.local_search,
            rules: self.rules,
            strategies: self.strategies,
        };
        let outcome = relinking.run(selection, &mut state.rng);
        log::info!(
            "Path relinking: {} new solutions in {} rounds",
            outcome.n_new,
            outcome.rounds
        );
        state.statistics.record_local_search(
            outcome.n_local_searches,
            outcome.n_local_search_moves,
            outcome.local_search_seconds,
        );
        state.statistics.n_path_relinking_solutions += outcome.n_new;
        state.statistics.path_relinking_seconds += start.elapsed().as_secs_f64();
        outcome.pool
    }

    /// Keep the best `target_sols` distinct solutions and raise the lower bound.
    fn merge_into_final(&self, selection: Vec<Solution>, state: &mut RunState) {
        state.final_pool.extend(selection);
        delete_repeated(&mut state.final_pool);
        sort_by_value(&mut state.final_pool);
        state.final_pool.truncate(self.config.target_sols);
        if let Some(best) = state.final_pool.first() {
            state.bnb.raise(best.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Filter;
    use crate::heuristics::local_search::tests::dominated_problem;
    use crate::reduction::parse_strategies;
    use crate::solution::tests::{create_costly_problem, create_test_problem};

    fn default_strategies() -> Vec<ReductionStrategy> {
        parse_strategies::<&str>(&[]).unwrap()
    }

    #[test]
    fn test_small_instance_best_pair() {
        let problem = create_test_problem();
        let config = RunConfig {
            n_threads: 2,
            ..Default::default()
        };
        let result = find_best_solutions(&problem, &config, &default_strategies()).unwrap();

        assert_eq!(result.solutions.len(), 1);
        assert_eq!(result.solutions[0].facilities, vec![0, 1]);
        assert!((result.solutions[0].value + 2.0).abs() < 1e-10);
        // levels 0, 1 and 2; nothing of size 3 beats its parents
        assert_eq!(result.statistics.firstr_n_iterations, 3);
    }

    #[test]
    fn test_no_facilities_returns_empty_solution() {
        let mut problem = Problem::new(0, 3);
        problem.unassigned_cost = 2.0;
        let config = RunConfig {
            n_threads: 2,
            target_sols: 5,
            ..Default::default()
        };
        let result = find_best_solutions(&problem, &config, &default_strategies()).unwrap();

        assert_eq!(result.solutions.len(), 1);
        assert!(result.solutions[0].facilities.is_empty());
        assert!((result.solutions[0].value + 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_final_pool_is_distinct_and_sorted() {
        let problem = create_costly_problem();
        let strategies = parse_strategies(&["rand1:6", "sdbs+:4:pcd", "_best:5"]).unwrap();
        for kind in [
            LocalSearchKind::None,
            LocalSearchKind::FirstImprovement,
            LocalSearchKind::ResendeWerneck,
        ] {
            let config = RunConfig {
                n_threads: 3,
                n_restarts: 2,
                target_sols: 4,
                filter: Filter::NoFilter,
                local_search: kind,
                select_only_terminal: false,
                ..Default::default()
            };
            let result = find_best_solutions(&problem, &config, &strategies).unwrap();

            assert!(!result.solutions.is_empty() && result.solutions.len() <= 4);
            for pair in result.solutions.windows(2) {
                assert!(pair[0].value >= pair[1].value);
                assert!(!pair[0].same_facilities(&pair[1]));
            }
            assert!(result.solutions.iter().all(|s| s.check_integrity(&problem)));
            assert_eq!(result.statistics.restart_values.len(), 2);
            assert!(result.statistics.restart_times.iter().all(|t| *t >= 0.0));
            assert!((result.statistics.restart_values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                - result.solutions[0].value)
                .abs()
                < 1e-9);
        }
    }

    #[test]
    fn test_branch_and_bound_and_relinking_keep_the_optimum() {
        let problem = dominated_problem();
        let strategies = parse_strategies(&["rank1:8", "_best:6"]).unwrap();
        let config = RunConfig {
            n_threads: 2,
            target_sols: 3,
            branch_and_bound: true,
            local_search_before_select: false,
            path_relinking: PathRelinkingMode::UntilNoBetter,
            local_search_pr: LocalSearchKind::ResendeWerneck,
            ..Default::default()
        };
        let result = find_best_solutions(&problem, &config, &strategies).unwrap();

        assert_eq!(result.solutions[0].facilities, vec![0, 1, 2, 3]);
        assert!((result.solutions[0].value - 46.0).abs() < 1e-9);
    }

    #[test]
    fn test_size_restrictions_are_respected() {
        let mut problem = dominated_problem();
        problem.size_restriction_minimum = Some(2);
        problem.size_restriction_maximum = Some(2);
        let config = RunConfig {
            n_threads: 2,
            target_sols: 3,
            ..Default::default()
        };
        let result = find_best_solutions(&problem, &config, &default_strategies()).unwrap();

        assert!(!result.solutions.is_empty());
        assert!(result.solutions.iter().all(|s| s.size() == 2));
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let problem = create_test_problem();
        let config = RunConfig {
            n_threads: 0,
            ..Default::default()
        };
        assert!(matches!(
            find_best_solutions(&problem, &config, &default_strategies()),
            Err(ConfigError::NoThreads)
        ));

        let strategies = vec![
            ReductionStrategy::from_nomenclature("best:5").unwrap(),
            ReductionStrategy::from_nomenclature("best:10").unwrap(),
        ];
        assert!(matches!(
            find_best_solutions(&problem, &RunConfig::default(), &strategies),
            Err(ConfigError::NonDecreasingTargets { .. })
        ));
    }
}
