//! Whitaker's fast exchange local search.
//!
//! Every insertion candidate (plus "insert nothing" when the solution may shrink) is
//! evaluated against all removable facilities in a single pass over the clients, using
//! the first and second choice of each client.

use crate::heuristics::local_search::{
    debug_check_move, findout, patch_second_nearest, second_nearest_all, LocalSearch, MoveRules,
};
use crate::heuristics::moves::AvailableMoves;
use crate::instance::Problem;
use crate::precomp::RunPrecomp;
use crate::shuffle::Shuffler;
use crate::solution::Solution;

pub struct WhitakerSearch {
    pub rules: MoveRules,
    /// Candidate order for first improvement; best improvement when absent
    shuffler: Option<Shuffler>,
}

impl WhitakerSearch {
    pub fn best_improvement(rules: MoveRules) -> Self {
        WhitakerSearch { rules, shuffler: None }
    }

    pub fn first_improvement(rules: MoveRules, n_facilities: usize, seed: u64) -> Self {
        WhitakerSearch {
            rules,
            shuffler: Some(Shuffler::new(n_facilities, seed)),
        }
    }

    pub fn is_first_improvement(&self) -> bool {
        self.shuffler.is_some()
    }
}

impl LocalSearch for WhitakerSearch {
    fn improve(
        &mut self,
        problem: &Problem,
        _precomp: &RunPrecomp,
        solution: &mut Solution,
        target: Option<&Solution>,
    ) -> usize {
        let n_facilities = problem.n_facilities();
        let mut moves = AvailableMoves::new(n_facilities, solution, target);
        let relinking = moves.is_path_relinking();
        let mut second = second_nearest_all(problem, solution);
        let mut loss = vec![f64::NEG_INFINITY; n_facilities];
        let mut best_visited = relinking.then(|| solution.clone());
        debug_assert!(self.shuffler.as_ref().map_or(true, |s| s.len() == n_facilities));

        let mut n_moves = 0;
        while !moves.is_exhausted() {
            let size = solution.size();
            let allow_decrease = self.rules.allows_decrease(problem, size, 1);
            let allow_increase = self.rules.allows_increase(problem, size);
            if let Some(shuffler) = self.shuffler.as_mut() {
                shuffler.reshuffle();
            }

            let mut best_delta = if relinking { f64::NEG_INFINITY } else { 0.0 };
            let mut best_move: Option<(Option<usize>, Option<usize>)> = None;
            let n_candidates = if allow_decrease { n_facilities + 1 } else { n_facilities };
            for k in 0..n_candidates {
                let inserted = if k == n_facilities {
                    None
                } else {
                    match self.shuffler.as_mut() {
                        Some(shuffler) => match shuffler.next() {
                            Some(f) => Some(f),
                            None => continue,
                        },
                        None => Some(k),
                    }
                };
                if inserted.is_some_and(|f| !moves.can_insert(f)) {
                    continue;
                }

                let found = findout(problem, solution, inserted, &second, &moves, &mut loss);
                if found.removal.is_some() && found.profit > best_delta {
                    best_delta = found.profit;
                    best_move = Some((inserted, found.removal));
                }
                if inserted.is_some() && allow_increase && found.profit_insert_only > best_delta {
                    best_delta = found.profit_insert_only;
                    best_move = Some((inserted, None));
                }
                if self.shuffler.is_some() && best_delta > 0.0 {
                    break;
                }
            }

            let Some((inserted, removed)) = best_move else { break };
            let old_value = solution.value;
            let previous = solution.assignment.clone();
            if let Some(f) = removed {
                solution.remove(problem, f, Some(&second));
            }
            if let Some(f) = inserted {
                solution.add(problem, f);
            }
            moves.register_move(inserted, removed);
            debug_check_move(problem, solution, old_value, best_delta, relinking);
            patch_second_nearest(problem, solution, &previous, &mut second, inserted, removed, None);
            n_moves += 1;

            if let Some(best) = best_visited.as_mut() {
                if solution.value > best.value {
                    *best = solution.clone();
                }
            }
        }

        if let Some(best) = best_visited {
            *solution = best;
        }
        n_moves
    }

    fn name(&self) -> &str {
        if self.is_first_improvement() {
            "Whitaker first improvement"
        } else {
            "Whitaker best improvement"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::local_search::tests::{dominated_problem, solution_of};
    use crate::solution::tests::{create_costly_problem, create_test_problem};

    #[test]
    fn test_dominated_facility_is_removed() {
        let problem = dominated_problem();
        let precomp = RunPrecomp::default();
        for mut search in [
            WhitakerSearch::best_improvement(MoveRules::default()),
            WhitakerSearch::first_improvement(MoveRules::default(), 5, 3),
        ] {
            let mut sol = solution_of(&problem, &[0, 1, 2, 4]);
            let start = sol.value;
            let n_moves = search.improve(&problem, &precomp, &mut sol, None);

            assert!(n_moves >= 1, "{}", search.name());
            assert!(!sol.contains(4));
            assert_eq!(sol.facilities, vec![0, 1, 2, 3]);
            assert!(sol.value > start);
            assert!(sol.check_integrity(&problem));
        }
    }

    #[test]
    fn test_reaches_two_facility_optimum() {
        // the best pair opens facility 0 for client 0 and facility 1 for client 1
        let problem = create_test_problem();
        let precomp = RunPrecomp::default();
        let mut search = WhitakerSearch::best_improvement(MoveRules::default());
        let mut sol = solution_of(&problem, &[2]);
        search.improve(&problem, &precomp, &mut sol, None);

        assert_eq!(sol.facilities, vec![0, 1]);
        assert!((sol.value + 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_local_optimum_is_stable() {
        let problem = create_costly_problem();
        let precomp = RunPrecomp::default();
        let mut search = WhitakerSearch::best_improvement(MoveRules::default());
        let mut sol = solution_of(&problem, &[2]);
        search.improve(&problem, &precomp, &mut sol, None);
        let optimum = sol.clone();

        assert_eq!(search.improve(&problem, &precomp, &mut sol, None), 0);
        assert_eq!(sol.facilities, optimum.facilities);
        assert!(!sol.contains(2));
    }

    #[test]
    fn test_move_flags_are_honored() {
        let problem = dominated_problem();
        let precomp = RunPrecomp::default();
        let swaps_only = MoveRules {
            remove_movement: false,
            add_movement: false,
        };
        let mut search = WhitakerSearch::best_improvement(swaps_only);
        let mut sol = solution_of(&problem, &[0, 4]);
        search.improve(&problem, &precomp, &mut sol, None);
        assert_eq!(sol.size(), 2);
        assert!(sol.check_integrity(&problem));
    }

    #[test]
    fn test_relinking_walks_to_target() {
        let problem = create_costly_problem();
        let precomp = RunPrecomp::default();
        let mut search = WhitakerSearch::best_improvement(MoveRules::default());
        let start = solution_of(&problem, &[0, 2]);
        let target = solution_of(&problem, &[1, 3]);

        let mut sol = start.clone();
        let n_moves = search.improve(&problem, &precomp, &mut sol, Some(&target));
        assert!(n_moves >= 2);
        // the walk keeps the best solution seen, the start included
        assert!(sol.value >= start.value);
        assert!(sol.check_integrity(&problem));
        assert!(sol.facilities.iter().all(|f| [0, 1, 2, 3].contains(f)));
    }
}
