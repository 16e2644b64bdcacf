//! Branch-and-bound pruning of construction pools.

use crate::instance::Problem;
use crate::precomp::RunPrecomp;
use crate::solution::Solution;

/// Tracks the best value known so far and prunes partial solutions that cannot beat it.
#[derive(Debug, Clone, Copy)]
pub struct BranchAndBound {
    pub lower_bound: f64,
}

impl BranchAndBound {
    pub fn new(precomp: &RunPrecomp) -> Self {
        BranchAndBound {
            lower_bound: precomp.empty_value,
        }
    }

    pub fn raise(&mut self, value: f64) {
        if value > self.lower_bound {
            self.lower_bound = value;
        }
    }

    /// Raise the bound with the pool, then drop the members whose upper bound is below
    /// it. Returns the number of pruned solutions.
    pub fn prune(&mut self, problem: &Problem, precomp: &RunPrecomp, pool: &mut Vec<Solution>) -> usize {
        for sol in pool.iter() {
            self.raise(sol.value);
        }
        let before = pool.len();
        let lower_bound = self.lower_bound;
        pool.retain(|sol| sol.upper_bound(problem, precomp.client_optimal_gain) >= lower_bound);
        let pruned = before - pool.len();
        if pruned > 0 {
            log::debug!("Branch and bound pruned {} of {} solutions", pruned, before);
        }
        pruned
    }
}
