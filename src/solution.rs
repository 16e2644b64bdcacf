//! Solution representation and manipulation.
//!
//! A solution is a sorted set of open facilities together with the induced optimal
//! client assignment and its total value (assignment values minus opening costs).
//! Solutions are only mutated through [`Solution::add`] and [`Solution::remove`], which
//! keep both the assignment and the value consistent.

use crate::instance::Problem;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Tolerance used when comparing a cached value against a recomputed one
pub const VALUE_TOLERANCE: f64 = 1e-5;

/// Represents a solution to the facility location problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Indices of the open facilities, sorted ascending
    pub facilities: Vec<usize>,
    /// Facility each client is assigned to (`None` means unassigned)
    pub assignment: Vec<Option<usize>>,
    /// Total value: assignment values minus opening costs (higher is better)
    pub value: f64,
    /// Whether the last expansion of this solution produced no admissible child
    pub terminal: bool,
}

impl Solution {
    /// Create the empty solution, where every client is unassigned
    pub fn empty(problem: &Problem) -> Self {
        let value = (0..problem.n_clients())
            .map(|c| problem.assignment_value(None, c))
            .sum();
        Solution {
            facilities: Vec::new(),
            assignment: vec![None; problem.n_clients()],
            value,
            terminal: false,
        }
    }

    /// Number of open facilities
    #[inline]
    pub fn size(&self) -> usize {
        self.facilities.len()
    }

    #[inline]
    pub fn contains(&self, facility: usize) -> bool {
        self.facilities.binary_search(&facility).is_ok()
    }

    /// Open a facility, reassigning every client that prefers it.
    pub fn add(&mut self, problem: &Problem, facility: usize) {
        self.add_masked(problem, facility, None);
    }

    /// Open a facility, only considering the clients flagged in `mask` for reassignment.
    ///
    /// The caller guarantees that unflagged clients cannot prefer the new facility.
    pub fn add_masked(&mut self, problem: &Problem, facility: usize, mask: Option<&[bool]>) {
        let pos = match self.facilities.binary_search(&facility) {
            Ok(_) => return,
            Err(pos) => pos,
        };
        self.facilities.insert(pos, facility);

        let mut value = 0.0;
        for c in 0..problem.n_clients() {
            let current = problem.assignment_value(self.assignment[c], c);
            if mask.map_or(true, |m| m[c]) {
                let candidate = problem.assignment_value(Some(facility), c);
                if candidate > current {
                    self.assignment[c] = Some(facility);
                    value += candidate;
                    continue;
                }
            }
            value += current;
        }
        self.value = value - self.opening_costs(problem);
    }

    /// Close a facility. Its clients move to `second_nearest[c]` when given, otherwise to
    /// the best remaining facility found by a linear scan.
    pub fn remove(&mut self, problem: &Problem, facility: usize, second_nearest: Option<&[Option<usize>]>) {
        self.remove_masked(problem, facility, second_nearest, None);
    }

    /// Close a facility, only visiting the clients flagged in `mask` for reassignment.
    pub fn remove_masked(
        &mut self,
        problem: &Problem,
        facility: usize,
        second_nearest: Option<&[Option<usize>]>,
        mask: Option<&[bool]>,
    ) {
        let pos = match self.facilities.binary_search(&facility) {
            Ok(pos) => pos,
            Err(_) => {
                debug_assert!(false, "facility {} is not part of the solution", facility);
                return;
            }
        };
        self.facilities.remove(pos);

        let mut value = 0.0;
        for c in 0..problem.n_clients() {
            let owned = self.assignment[c] == Some(facility);
            debug_assert!(!owned || mask.map_or(true, |m| m[c]));
            if owned {
                let reassign = match second_nearest {
                    Some(phi2) => phi2[c],
                    None => self.best_open_facility(problem, c, None),
                };
                self.assignment[c] = reassign;
            }
            value += problem.assignment_value(self.assignment[c], c);
        }
        self.value = value - self.opening_costs(problem);
    }

    /// Sum of the opening costs of the open facilities
    pub fn opening_costs(&self, problem: &Problem) -> f64 {
        self.facilities.iter().map(|&f| problem.facility_cost(f)).sum()
    }

    /// Upper bound on the value of any solution containing this one: every client
    /// served at its best possible value, minus the facility costs already paid.
    pub fn upper_bound(&self, problem: &Problem, client_optimal_gain: f64) -> f64 {
        client_optimal_gain - self.opening_costs(problem)
    }

    /// Best open facility for a client, ignoring `skip` (unassigned if none is better).
    fn best_open_facility(&self, problem: &Problem, client: usize, skip: Option<usize>) -> Option<usize> {
        let mut best = None;
        let mut best_value = problem.assignment_value(None, client);
        for &f in &self.facilities {
            if Some(f) == skip {
                continue;
            }
            let value = problem.assignment_value(Some(f), client);
            if value > best_value {
                best = Some(f);
                best_value = value;
            }
        }
        best
    }

    /// Second most valuable open facility for a client (the best one other than its assignment)
    pub fn client_second_nearest(&self, problem: &Problem, client: usize) -> Option<usize> {
        self.best_open_facility(problem, client, self.assignment[client])
    }

    /// Recompute the value from scratch
    pub fn compute_value(&self, problem: &Problem) -> f64 {
        let assigned: f64 = (0..problem.n_clients())
            .map(|c| problem.assignment_value(self.assignment[c], c))
            .sum();
        assigned - self.opening_costs(problem)
    }

    /// Check the sortedness, assignment optimality and value consistency invariants.
    pub fn check_integrity(&self, problem: &Problem) -> bool {
        if self.facilities.windows(2).any(|w| w[0] >= w[1]) {
            return false;
        }
        for c in 0..problem.n_clients() {
            if let Some(f) = self.assignment[c] {
                if !self.contains(f) {
                    return false;
                }
            }
            let current = problem.assignment_value(self.assignment[c], c);
            let best = problem.assignment_value(self.best_open_facility(problem, c, None), c);
            if best > current {
                return false;
            }
        }
        let recomputed = self.compute_value(problem);
        if self.value.is_finite() || recomputed.is_finite() {
            (self.value - recomputed).abs() <= VALUE_TOLERANCE * (1.0 + recomputed.abs())
        } else {
            self.value == recomputed
        }
    }

    /// Compare by facility set: first by size, then lexicographically
    pub fn cmp_facilities(&self, other: &Solution) -> Ordering {
        self.facilities
            .len()
            .cmp(&other.facilities.len())
            .then_with(|| self.facilities.cmp(&other.facilities))
    }

    #[inline]
    pub fn same_facilities(&self, other: &Solution) -> bool {
        self.facilities == other.facilities
    }
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        self.same_facilities(other)
    }
}

/// Sort a pool by decreasing value (stable, so ties keep their order).
pub fn sort_by_value(sols: &mut [Solution]) {
    sols.sort_by_key(|s| OrderedFloat(-s.value));
}

/// Remove solutions with repeated facility sets. The pool ends up sorted by facilities.
pub fn delete_repeated(sols: &mut Vec<Solution>) {
    sols.sort_by(|a, b| a.cmp_facilities(b));
    sols.dedup_by(|a, b| a.same_facilities(b));
}

/// Best value of a pool, or negative infinity when it is empty
pub fn best_value(sols: &[Solution]) -> f64 {
    sols.iter().map(|s| s.value).fold(f64::NEG_INFINITY, f64::max)
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "== SOLUTION ==")?;
        writeln!(f, "# VALUE: {}", self.value)?;
        write!(f, "# ASSIGNS:")?;
        for a in &self.assignment {
            match a {
                Some(fac) => write!(f, " {}", fac)?,
                None => write!(f, " -1")?,
            }
        }
        writeln!(f)?;
        writeln!(f, "# N_FACS: {}", self.facilities.len())?;
        write!(f, "# INDEXES:")?;
        for fac in &self.facilities {
            write!(f, " {}", fac)?;
        }
        writeln!(f)?;
        for &fac in &self.facilities {
            write!(f, "FAC {} :", fac)?;
            for (c, a) in self.assignment.iter().enumerate() {
                if *a == Some(fac) {
                    write!(f, " {}", c)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Three facilities, two clients, zero opening costs, value = -distance.
    pub(crate) fn create_test_problem() -> Problem {
        Problem::from_distances(vec![0.0, 0.0, 0.0], vec![vec![1.0, 2.0], vec![3.0, 1.0], vec![2.0, 2.0]])
    }

    /// Four facilities, six clients with finite unassigned cost and varied opening costs.
    pub(crate) fn create_costly_problem() -> Problem {
        let mut problem = Problem::from_distances(
            vec![3.0, 4.0, 50.0, 2.5],
            vec![
                vec![1.0, 2.0, 6.0, 7.0, 3.0, 9.0],
                vec![6.0, 5.0, 1.0, 2.0, 4.0, 3.0],
                vec![2.0, 2.0, 2.0, 2.0, 2.0, 2.0],
                vec![8.0, 7.0, 5.0, 1.0, 1.0, 1.5],
            ],
        );
        problem.client_gain = 10.0;
        problem.unassigned_cost = 1.0;
        problem
    }

    #[test]
    fn test_empty_solution() {
        let problem = create_costly_problem();
        let sol = Solution::empty(&problem);

        assert_eq!(sol.size(), 0);
        assert!(sol.assignment.iter().all(|a| a.is_none()));
        assert!((sol.value + 6.0).abs() < 1e-10);
        assert!(sol.check_integrity(&problem));
    }

    #[test]
    fn test_add_keeps_invariants() {
        let problem = create_test_problem();
        let mut sol = Solution::empty(&problem);

        sol.add(&problem, 2);
        assert_eq!(sol.assignment, vec![Some(2), Some(2)]);
        assert!((sol.value + 4.0).abs() < 1e-10);

        sol.add(&problem, 0);
        assert_eq!(sol.facilities, vec![0, 2]);
        assert_eq!(sol.assignment, vec![Some(0), Some(2)]);
        assert!((sol.value + 3.0).abs() < 1e-10);
        assert!(sol.check_integrity(&problem));

        // Adding an existing facility is a no-op
        let before = sol.clone();
        sol.add(&problem, 0);
        assert_eq!(sol.facilities, before.facilities);
        assert_eq!(sol.value, before.value);
    }

    #[test]
    fn test_add_counts_costs_of_open_facilities() {
        let problem = create_costly_problem();
        let mut sol = Solution::empty(&problem);
        sol.add(&problem, 3);
        sol.add(&problem, 1);

        assert!((sol.value - sol.compute_value(&problem)).abs() < 1e-10);
        assert!(sol.check_integrity(&problem));
    }

    #[test]
    fn test_remove_with_and_without_hint() {
        let problem = create_costly_problem();
        let mut sol = Solution::empty(&problem);
        for f in [0, 1, 3] {
            sol.add(&problem, f);
        }

        let phi2: Vec<Option<usize>> = (0..problem.n_clients())
            .map(|c| sol.client_second_nearest(&problem, c))
            .collect();
        let mut hinted = sol.clone();
        hinted.remove(&problem, 1, Some(&phi2));
        let mut scanned = sol.clone();
        scanned.remove(&problem, 1, None);

        assert_eq!(hinted.facilities, vec![0, 3]);
        assert_eq!(hinted.assignment, scanned.assignment);
        assert!((hinted.value - scanned.value).abs() < 1e-10);
        assert!(hinted.check_integrity(&problem));
    }

    #[test]
    fn test_remove_last_facility_unassigns() {
        let problem = create_costly_problem();
        let mut sol = Solution::empty(&problem);
        sol.add(&problem, 0);
        sol.remove(&problem, 0, None);

        assert!(sol.assignment.iter().all(|a| a.is_none()));
        assert!((sol.value - Solution::empty(&problem).value).abs() < 1e-10);
    }

    #[test]
    fn test_upper_bound_does_not_increase() {
        let problem = create_costly_problem();
        let gain: f64 = (0..problem.n_clients())
            .map(|c| {
                (0..problem.n_facilities())
                    .map(|f| problem.assignment_value(Some(f), c))
                    .fold(problem.assignment_value(None, c), f64::max)
            })
            .sum();
        let mut sol = Solution::empty(&problem);
        let mut last = sol.upper_bound(&problem, gain);
        for f in 0..problem.n_facilities() {
            sol.add(&problem, f);
            let bound = sol.upper_bound(&problem, gain);
            assert!(bound <= last);
            assert!(sol.value <= bound + 1e-9);
            last = bound;
        }
    }

    #[test]
    fn test_delete_repeated_and_sort() {
        let problem = create_test_problem();
        let mut pool = Vec::new();
        for facs in [vec![0, 1], vec![2], vec![1, 0], vec![2]] {
            let mut sol = Solution::empty(&problem);
            for f in facs {
                sol.add(&problem, f);
            }
            pool.push(sol);
        }
        delete_repeated(&mut pool);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].facilities, vec![2]);
        assert_eq!(pool[1].facilities, vec![0, 1]);

        sort_by_value(&mut pool);
        assert!(pool[0].value >= pool[1].value);
        assert!((best_value(&pool) + 2.0).abs() < 1e-10);
    }
}
