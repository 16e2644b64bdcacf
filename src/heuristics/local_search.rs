//! Local search improvement heuristics.
//!
//! Both algorithms explore the same neighborhood: open one facility, close one, or do
//! both at once. Each iteration applies the single best move found and the search stops
//! when none improves the solution. Given a target solution the search turns into a
//! path-relinking walk instead: only the facilities that differ from the target can move,
//! non-improving moves are accepted, and the best solution visited is kept.
//!
//! - [`WhitakerSearch`]: fast exchange with best or first improvement.
//! - [`ResendeWerneckSearch`]: incremental gain/loss/extra bookkeeping, only updating
//!   the clients a move affects.

use crate::config::{LocalSearchKind, RunConfig};
use crate::heuristics::moves::AvailableMoves;
use crate::heuristics::resende::ResendeWerneckSearch;
use crate::heuristics::whitaker::WhitakerSearch;
use crate::instance::Problem;
use crate::parallel::WorkerPool;
use crate::precomp::RunPrecomp;
use crate::solution::Solution;
use ordered_float::OrderedFloat;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve `solution` in place and return the number of moves applied.
    ///
    /// With a `target`, walk toward it and leave the best solution visited in `solution`.
    fn improve(
        &mut self,
        problem: &Problem,
        precomp: &RunPrecomp,
        solution: &mut Solution,
        target: Option<&Solution>,
    ) -> usize;

    fn name(&self) -> &str;
}

/// Which size-changing moves a local search may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRules {
    /// Allow closing a facility without opening another
    pub remove_movement: bool,
    /// Allow opening a facility without closing another
    pub add_movement: bool,
}

impl Default for MoveRules {
    fn default() -> Self {
        MoveRules {
            remove_movement: true,
            add_movement: true,
        }
    }
}

impl MoveRules {
    pub fn from_config(config: &RunConfig) -> Self {
        MoveRules {
            remove_movement: config.local_search_rem_movement,
            add_movement: config.local_search_add_movement,
        }
    }

    /// Whether a solution of `size` facilities may shrink; it must keep more than `floor`.
    pub(crate) fn allows_decrease(&self, problem: &Problem, size: usize, floor: usize) -> bool {
        self.remove_movement
            && size > floor
            && problem.size_restriction_minimum.map_or(true, |min| size > min)
    }

    pub(crate) fn allows_increase(&self, problem: &Problem, size: usize) -> bool {
        self.add_movement && problem.size_restriction_maximum.map_or(true, |max| size < max)
    }
}

/// Build the searcher for `kind`, or `None` when local search is disabled.
pub fn build_local_search(
    kind: LocalSearchKind,
    rules: MoveRules,
    n_facilities: usize,
    seed: u64,
) -> Option<Box<dyn LocalSearch + Send>> {
    match kind {
        LocalSearchKind::None => None,
        LocalSearchKind::BestImprovement => Some(Box::new(WhitakerSearch::best_improvement(rules))),
        LocalSearchKind::FirstImprovement => Some(Box::new(WhitakerSearch::first_improvement(
            rules,
            n_facilities,
            seed,
        ))),
        LocalSearchKind::ResendeWerneck => Some(Box::new(ResendeWerneckSearch::new(rules))),
    }
}

/// Run local search on every solution of `pool`, round robin across workers. Each worker
/// builds its own searcher once. Returns the total number of moves.
pub fn improve_pool(
    problem: &Problem,
    precomp: &RunPrecomp,
    workers: &WorkerPool,
    kind: LocalSearchKind,
    rules: MoveRules,
    pool: &mut [Solution],
    seed: u64,
) -> usize {
    if kind == LocalSearchKind::None || pool.is_empty() {
        return 0;
    }
    let n_facilities = problem.n_facilities();
    workers
        .map_round_robin_mut(
            pool,
            |worker| build_local_search(kind, rules, n_facilities, seed.wrapping_add(worker as u64)),
            |searcher, solution| match searcher {
                Some(searcher) => searcher.improve(problem, precomp, solution, None),
                None => 0,
            },
        )
        .into_iter()
        .sum()
}

/// Second most valuable open facility of every client
pub(crate) fn second_nearest_all(problem: &Problem, solution: &Solution) -> Vec<Option<usize>> {
    (0..problem.n_clients())
        .map(|c| solution.client_second_nearest(problem, c))
        .collect()
}

/// Outcome of evaluating one insertion candidate
#[derive(Debug, Clone, Copy)]
pub(crate) struct Findout {
    /// Best facility to close together with the insertion
    pub removal: Option<usize>,
    /// Value change of inserting and closing `removal` (`-inf` without a removal)
    pub profit: f64,
    /// Value change of the insertion alone
    pub profit_insert_only: f64,
}

/// Evaluate opening `inserted` (or nothing) against every removable facility.
///
/// Clients that prefer the new facility count toward the insertion gain; every other
/// client charges its assigned facility the value it would lose falling back on the
/// better of its second choice and the new facility. `loss` is scratch space indexed by
/// facility.
pub(crate) fn findout(
    problem: &Problem,
    solution: &Solution,
    inserted: Option<usize>,
    second: &[Option<usize>],
    moves: &AvailableMoves,
    loss: &mut [f64],
) -> Findout {
    let mut gain = inserted.map_or(0.0, |f| -problem.facility_cost(f));
    for &f in &solution.facilities {
        loss[f] = -problem.facility_cost(f);
    }

    for c in 0..problem.n_clients() {
        let current = solution.assignment[c];
        let current_value = problem.assignment_value(current, c);
        let inserted_value = inserted.map(|f| problem.assignment_value(Some(f), c));
        if let Some(value) = inserted_value {
            if value >= current_value {
                gain += value - current_value;
                continue;
            }
        }
        if let Some(f) = current {
            let fallback = problem.assignment_value(second[c], c);
            let fallback = inserted_value.map_or(fallback, |value| value.max(fallback));
            loss[f] += current_value - fallback;
        }
    }

    let removal = moves
        .removals()
        .iter()
        .copied()
        .min_by_key(|&f| (OrderedFloat(loss[f]), f));
    Findout {
        removal,
        profit: removal.map_or(f64::NEG_INFINITY, |f| gain - loss[f]),
        profit_insert_only: gain,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Near {
    Open(Option<usize>),
    Unknown,
}

/// Refresh the second choice of each client after a move.
///
/// `previous` holds the assignment before the move and `solution` the one after it.
/// The new second choice is read from the three best candidates known before the move,
/// without the removed facility; a full scan is only needed when it falls on a third
/// choice nobody kept track of. With a `mask`, only the flagged clients are refreshed.
pub(crate) fn patch_second_nearest(
    problem: &Problem,
    solution: &Solution,
    previous: &[Option<usize>],
    second: &mut [Option<usize>],
    inserted: Option<usize>,
    removed: Option<usize>,
    mask: Option<&[bool]>,
) {
    for c in 0..problem.n_clients() {
        if mask.is_some_and(|m| !m[c]) {
            continue;
        }
        let (p1, p2) = (previous[c], second[c]);
        let near = match inserted {
            None => [Near::Open(p1), Near::Open(p2), Near::Unknown],
            Some(f) if solution.assignment[c] == Some(f) => [Near::Open(Some(f)), Near::Open(p1), Near::Open(p2)],
            Some(f) => {
                if problem.assignment_value(Some(f), c) > problem.assignment_value(p2, c) {
                    [Near::Open(p1), Near::Open(Some(f)), Near::Open(p2)]
                } else {
                    [Near::Open(p1), Near::Open(p2), Near::Unknown]
                }
            }
        };
        let second_choice = near
            .iter()
            .filter(|&&n| removed.map_or(true, |r| n != Near::Open(Some(r))))
            .nth(1)
            .copied();
        second[c] = match second_choice {
            Some(Near::Open(f)) => f,
            _ => solution.client_second_nearest(problem, c),
        };
        debug_assert!(second[c].is_none() || second[c] != solution.assignment[c]);
    }
}

/// Check the value change of a move against its prediction, in debug builds.
pub(crate) fn debug_check_move(problem: &Problem, solution: &Solution, old_value: f64, predicted: f64, relinking: bool) {
    let realized = solution.value - old_value;
    debug_assert!(solution.check_integrity(problem));
    debug_assert!(relinking || realized > 0.0, "non-improving move ({})", realized);
    debug_assert!(
        !predicted.is_finite()
            || !realized.is_finite()
            || (realized - predicted).abs() <= crate::solution::VALUE_TOLERANCE * (1.0 + predicted.abs()),
        "predicted {} but realized {}",
        predicted,
        realized
    );
}
