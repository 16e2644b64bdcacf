//! Resende and Werneck's accelerated swap local search.
//!
//! Three structures summarize the whole neighborhood:
//!
//! - `gain[fi]`: value won by the clients that would switch to `fi` if it was opened.
//! - `loss[fr]`: value lost by the clients of `fr` if it was closed.
//! - `extra(fi, fr)`: correction for swapping both at once, stored sparsely.
//!
//! Each client contributes to them based on its first and second choice only. After a
//! move, just the clients whose choices changed are withdrawn and added back, so an
//! iteration costs far less than a full neighborhood evaluation.

use crate::heuristics::fastmat::FastMat;
use crate::heuristics::local_search::{
    debug_check_move, patch_second_nearest, second_nearest_all, LocalSearch, MoveRules,
};
use crate::heuristics::moves::AvailableMoves;
use crate::instance::Problem;
use crate::precomp::RunPrecomp;
use crate::solution::Solution;

pub struct ResendeWerneckSearch {
    pub rules: MoveRules,
    extra: FastMat,
}

impl ResendeWerneckSearch {
    pub fn new(rules: MoveRules) -> Self {
        ResendeWerneckSearch {
            rules,
            extra: FastMat::new(),
        }
    }
}

/// Per-invocation bookkeeping borrowed by the update and selection steps
struct Structures<'a> {
    gain: Vec<f64>,
    loss: Vec<f64>,
    extra: &'a mut FastMat,
}

impl Structures<'_> {
    /// Add (or withdraw, with `undo`) the contribution of client `u`.
    #[allow(clippy::too_many_arguments)]
    fn update_client(
        &mut self,
        problem: &Problem,
        precomp: &RunPrecomp,
        solution: &Solution,
        second: &[Option<usize>],
        moves: &AvailableMoves,
        u: usize,
        undo: bool,
    ) {
        let sign = if undo { -1.0 } else { 1.0 };
        let fr = solution.assignment[u];
        let d1 = -problem.assignment_value(fr, u);
        let d2 = -problem.assignment_value(second[u], u);
        let removable = fr.filter(|&f| moves.can_remove(f));

        if let Some(fr) = removable {
            self.loss[fr] += sign * (d2 - d1);
        }

        let mut contribute = |fi: usize, d_fi: f64| {
            if d_fi < d1 {
                self.gain[fi] += sign * (d1 - d_fi);
                if let Some(fr) = removable {
                    self.update_extra(fi, fr, d2 - d1, undo);
                }
            } else if let Some(fr) = removable {
                self.update_extra(fi, fr, d2 - d_fi, undo);
            }
        };

        let size = solution.size().max(1);
        let proximity = precomp
            .nearly_indexes
            .as_ref()
            .filter(|_| 3 * problem.n_facilities() / size <= moves.insertions().len());
        match proximity {
            Some(nearly) => {
                for &fi in &nearly[u] {
                    if !moves.can_insert(fi) {
                        continue;
                    }
                    let d_fi = -problem.assignment_value(Some(fi), u);
                    if d_fi >= d2 {
                        break;
                    }
                    contribute(fi, d_fi);
                }
            }
            None => {
                for &fi in moves.insertions() {
                    let d_fi = -problem.assignment_value(Some(fi), u);
                    if d_fi < d2 {
                        contribute(fi, d_fi);
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.gain.fill(0.0);
        self.loss.fill(0.0);
        self.extra.clear();
    }

    fn update_extra(&mut self, fi: usize, fr: usize, value: f64, undo: bool) {
        if undo {
            self.extra.sub(fi, fr, value);
        } else {
            self.extra.add(fi, fr, value);
        }
    }

    /// Best move as `(inserted, removed, delta)`; moves must beat zero unless relinking.
    fn best_neighbor(
        &self,
        problem: &Problem,
        moves: &AvailableMoves,
        allow_increase: bool,
        allow_decrease: bool,
    ) -> Option<(Option<usize>, Option<usize>, f64)> {
        let mut best = None;
        let mut best_delta = if moves.is_path_relinking() { f64::NEG_INFINITY } else { 0.0 };
        let mut consider = |inserted: Option<usize>, removed: Option<usize>, delta: f64| {
            if delta > best_delta {
                best_delta = delta;
                best = Some((inserted, removed, delta));
            }
        };

        if allow_increase {
            for &fi in moves.insertions() {
                consider(Some(fi), None, self.gain[fi] - problem.facility_cost(fi));
            }
        }
        if allow_decrease {
            for &fr in moves.removals() {
                consider(None, Some(fr), problem.facility_cost(fr) - self.loss[fr]);
            }
        }
        for (fi, fr, extra) in self.extra.iter() {
            let delta = self.gain[fi] - self.loss[fr] + extra - problem.facility_cost(fi) + problem.facility_cost(fr);
            consider(Some(fi), Some(fr), delta);
        }
        best
    }
}

impl LocalSearch for ResendeWerneckSearch {
    fn improve(
        &mut self,
        problem: &Problem,
        precomp: &RunPrecomp,
        solution: &mut Solution,
        target: Option<&Solution>,
    ) -> usize {
        if solution.size() < 2 {
            return 0;
        }
        let n_facilities = problem.n_facilities();
        let n_clients = problem.n_clients();
        let mut moves = AvailableMoves::new(n_facilities, solution, target);
        let relinking = moves.is_path_relinking();
        let mut second = second_nearest_all(problem, solution);
        let mut best_visited = relinking.then(|| solution.clone());
        let mut structures = Structures {
            gain: vec![0.0; n_facilities],
            loss: vec![0.0; n_facilities],
            extra: &mut self.extra,
        };

        let mut affected: Vec<usize> = (0..n_clients).collect();
        let mut mask = vec![false; n_clients];
        let mut n_moves = 0;
        loop {
            for &u in &affected {
                structures.update_client(problem, precomp, solution, &second, &moves, u, false);
            }

            let size = solution.size();
            // the size-2 floor only binds plain improvement; relinking may shrink to the target
            let allow_decrease = relinking || self.rules.allows_decrease(problem, size, 2);
            let allow_increase = relinking || self.rules.allows_increase(problem, size);
            let Some((inserted, removed, delta)) =
                structures.best_neighbor(problem, &moves, allow_increase, allow_decrease)
            else {
                break;
            };

            affected.clear();
            if size < 2 {
                // a lone facility leaves every second choice unassigned, so its losses
                // cannot be withdrawn: start the structures over
                structures.reset();
                affected.extend(0..n_clients);
                mask.fill(true);
            } else {
                for u in 0..n_clients {
                    let (p1, p2) = (solution.assignment[u], second[u]);
                    mask[u] = (removed.is_some() && (p1 == removed || p2 == removed))
                        || inserted.is_some_and(|f| {
                            problem.assignment_value(Some(f), u) > problem.assignment_value(p2, u)
                        });
                    if mask[u] {
                        affected.push(u);
                    }
                }
                for &u in &affected {
                    structures.update_client(problem, precomp, solution, &second, &moves, u, true);
                }
            }

            let old_value = solution.value;
            let previous = solution.assignment.clone();
            if let Some(f) = removed {
                solution.remove_masked(problem, f, Some(&second), Some(&mask));
            }
            if let Some(f) = inserted {
                solution.add_masked(problem, f, Some(&mask));
            }
            moves.register_move(inserted, removed);
            debug_check_move(problem, solution, old_value, delta, relinking);
            patch_second_nearest(problem, solution, &previous, &mut second, inserted, removed, Some(&mask));
            n_moves += 1;

            if let Some(best) = best_visited.as_mut() {
                if solution.value > best.value {
                    *best = solution.clone();
                }
            }
        }
        log::trace!("Resende-Werneck search applied {} moves", n_moves);

        self.extra.clear();
        if let Some(best) = best_visited {
            *solution = best;
        }
        n_moves
    }

    fn name(&self) -> &str {
        "Resende-Werneck"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::local_search::tests::{dominated_problem, solution_of};
    use crate::heuristics::whitaker::WhitakerSearch;
    use crate::parallel::WorkerPool;
    use crate::solution::tests::create_costly_problem;

    /// Twelve facilities on a line, twenty clients spread over the same segment.
    fn line_problem() -> Problem {
        let distance = (0..12)
            .map(|f| (0..20).map(|c| (f as f64 - c as f64 * 0.6).abs()).collect())
            .collect();
        let mut problem = Problem::from_distances(vec![2.0; 12], distance);
        problem.client_gain = 10.0;
        problem
    }

    #[test]
    fn test_dominated_facility_is_removed() {
        let problem = dominated_problem();
        let precomp = RunPrecomp::default();
        let mut search = ResendeWerneckSearch::new(MoveRules::default());
        let mut whitaker = WhitakerSearch::best_improvement(MoveRules::default());

        for start in [&[0, 1, 2, 4][..], &[0, 4], &[1, 2, 4]] {
            let mut sol = solution_of(&problem, start);
            let start_value = sol.value;
            let n_moves = search.improve(&problem, &precomp, &mut sol, None);

            assert!(n_moves >= 1);
            assert!(!sol.contains(4));
            assert!(sol.value > start_value);
            assert!(sol.check_integrity(&problem));
            // nothing left for the plain exchange either
            let mut again = sol.clone();
            assert_eq!(whitaker.improve(&problem, &precomp, &mut again, None), 0);
            assert!(search.extra.is_empty());
        }
    }

    #[test]
    fn test_single_facility_is_left_alone() {
        let problem = dominated_problem();
        let precomp = RunPrecomp::default();
        let mut search = ResendeWerneckSearch::new(MoveRules::default());
        let mut sol = solution_of(&problem, &[4]);
        assert_eq!(search.improve(&problem, &precomp, &mut sol, None), 0);
        assert_eq!(sol.facilities, vec![4]);
    }

    #[test]
    fn test_proximity_and_list_enumerations() {
        let problem = line_problem();
        let workers = WorkerPool::new(2).unwrap();
        let with_orderings = RunPrecomp::new(&problem, &[], true, &workers);
        let without_orderings = RunPrecomp::new(&problem, &[], false, &workers);
        let mut search = ResendeWerneckSearch::new(MoveRules::default());

        for precomp in [&with_orderings, &without_orderings] {
            let mut sol = solution_of(&problem, &[0, 1, 2, 3, 4, 5]);
            let start_value = sol.value;
            let n_moves = search.improve(&problem, precomp, &mut sol, None);

            assert!(n_moves > 0);
            assert!(sol.value > start_value);
            assert!(sol.check_integrity(&problem));
            assert!(sol.facilities.iter().any(|&f| f >= 6));
        }
    }

    #[test]
    fn test_relinking_keeps_best_visited() {
        let problem = create_costly_problem();
        let precomp = RunPrecomp::default();
        let mut search = ResendeWerneckSearch::new(MoveRules::default());
        let start = solution_of(&problem, &[0, 2]);
        let target = solution_of(&problem, &[1, 3]);

        let mut sol = start.clone();
        let n_moves = search.improve(&problem, &precomp, &mut sol, Some(&target));
        assert!(n_moves >= 1);
        assert!(sol.value >= start.value);
        assert!(sol.check_integrity(&problem));
        assert!(search.extra.is_empty());
    }

    #[test]
    fn test_relinking_shrinks_to_smaller_target() {
        let problem = dominated_problem();
        let precomp = RunPrecomp::default();
        let mut search = ResendeWerneckSearch::new(MoveRules::default());
        let start = solution_of(&problem, &[3, 4]);
        let target = solution_of(&problem, &[3]);
        assert!((start.value - 31.0).abs() < 1e-9);

        let mut sol = start.clone();
        let n_moves = search.improve(&problem, &precomp, &mut sol, Some(&target));
        assert_eq!(n_moves, 1);
        assert_eq!(sol.facilities, vec![3]);
        assert!((sol.value - 37.0).abs() < 1e-9);
        assert!(sol.check_integrity(&problem));
    }

    #[test]
    fn test_relinking_walks_through_single_facility() {
        // one client sitting on every facility, so only the opening costs matter
        let problem = Problem::from_distances(vec![1.0, 100.0, 50.0], vec![vec![0.0]; 3]);
        let precomp = RunPrecomp::default();
        let mut search = ResendeWerneckSearch::new(MoveRules::default());
        let start = solution_of(&problem, &[0, 1]);
        let target = solution_of(&problem, &[2]);

        // {0, 1} -> {0} -> {0, 2} -> {2}
        let mut sol = start.clone();
        let n_moves = search.improve(&problem, &precomp, &mut sol, Some(&target));
        assert_eq!(n_moves, 3);
        assert_eq!(sol.facilities, vec![0]);
        assert!((sol.value + 1.0).abs() < 1e-9);
        assert!(sol.check_integrity(&problem));
        assert!(search.extra.is_empty());
    }
}
