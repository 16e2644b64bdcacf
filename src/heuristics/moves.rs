//! Facilities a local search may still insert or remove.
//!
//! Outside path relinking every closed facility is insertable and every open one is
//! removable, and each move swaps the two roles. When relinking toward a target only the
//! differences between both solutions are available, and a consumed index never comes back.

use crate::solution::Solution;

/// Set of indices below a fixed bound with `O(1)` insertion and removal.
#[derive(Debug, Clone)]
struct IndexSet {
    items: Vec<usize>,
    position: Vec<Option<usize>>,
}

impl IndexSet {
    fn new(bound: usize) -> Self {
        IndexSet {
            items: Vec::new(),
            position: vec![None; bound],
        }
    }

    fn contains(&self, index: usize) -> bool {
        self.position[index].is_some()
    }

    fn insert(&mut self, index: usize) {
        if self.position[index].is_none() {
            self.position[index] = Some(self.items.len());
            self.items.push(index);
        }
    }

    fn remove(&mut self, index: usize) {
        let Some(pos) = self.position[index].take() else { return };
        self.items.swap_remove(pos);
        if let Some(&moved) = self.items.get(pos) {
            self.position[moved] = Some(pos);
        }
    }
}

#[derive(Debug, Clone)]
pub struct AvailableMoves {
    insertable: IndexSet,
    removable: IndexSet,
    path_relinking: bool,
}

impl AvailableMoves {
    /// Moves available from `solution`, restricted to the differences with `target` when
    /// relinking toward it.
    pub fn new(n_facilities: usize, solution: &Solution, target: Option<&Solution>) -> Self {
        let mut insertable = IndexSet::new(n_facilities);
        let mut removable = IndexSet::new(n_facilities);
        match target {
            Some(target) => {
                for &f in &target.facilities {
                    if !solution.contains(f) {
                        insertable.insert(f);
                    }
                }
                for &f in &solution.facilities {
                    if !target.contains(f) {
                        removable.insert(f);
                    }
                }
            }
            None => {
                for f in 0..n_facilities {
                    if solution.contains(f) {
                        removable.insert(f);
                    } else {
                        insertable.insert(f);
                    }
                }
            }
        }
        AvailableMoves {
            insertable,
            removable,
            path_relinking: target.is_some(),
        }
    }

    #[inline]
    pub fn can_insert(&self, facility: usize) -> bool {
        self.insertable.contains(facility)
    }

    #[inline]
    pub fn can_remove(&self, facility: usize) -> bool {
        self.removable.contains(facility)
    }

    pub fn insertions(&self) -> &[usize] {
        &self.insertable.items
    }

    pub fn removals(&self) -> &[usize] {
        &self.removable.items
    }

    pub fn is_path_relinking(&self) -> bool {
        self.path_relinking
    }

    /// Whether no move at all is left
    pub fn is_exhausted(&self) -> bool {
        self.insertable.items.is_empty() && self.removable.items.is_empty()
    }

    /// Record that `inserted` was opened and `removed` was closed.
    pub fn register_move(&mut self, inserted: Option<usize>, removed: Option<usize>) {
        if let Some(f) = inserted {
            self.insertable.remove(f);
            if !self.path_relinking {
                self.removable.insert(f);
            }
        }
        if let Some(f) = removed {
            self.removable.remove(f);
            if !self.path_relinking {
                self.insertable.insert(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::tests::create_costly_problem;

    fn solution_of(facilities: &[usize]) -> Solution {
        let problem = create_costly_problem();
        let mut sol = Solution::empty(&problem);
        for &f in facilities {
            sol.add(&problem, f);
        }
        sol
    }

    fn sorted(list: &[usize]) -> Vec<usize> {
        let mut list = list.to_vec();
        list.sort();
        list
    }

    #[test]
    fn test_regular_moves_swap_roles() {
        let sol = solution_of(&[0, 3]);
        let mut moves = AvailableMoves::new(4, &sol, None);
        assert!(!moves.is_path_relinking());
        assert_eq!(sorted(moves.insertions()), vec![1, 2]);
        assert_eq!(sorted(moves.removals()), vec![0, 3]);

        moves.register_move(Some(2), Some(0));
        assert_eq!(sorted(moves.insertions()), vec![0, 1]);
        assert_eq!(sorted(moves.removals()), vec![2, 3]);
        assert!(moves.can_insert(0) && !moves.can_insert(2));
        assert!(moves.can_remove(2) && !moves.can_remove(0));
    }

    #[test]
    fn test_path_relinking_consumes_indices() {
        let sol = solution_of(&[0, 1]);
        let target = solution_of(&[1, 2, 3]);
        let mut moves = AvailableMoves::new(4, &sol, Some(&target));
        assert!(moves.is_path_relinking());
        assert_eq!(sorted(moves.insertions()), vec![2, 3]);
        assert_eq!(moves.removals(), &[0]);
        assert!(!moves.can_remove(1));

        moves.register_move(Some(3), Some(0));
        assert_eq!(moves.insertions(), &[2]);
        assert!(moves.removals().is_empty());
        assert!(!moves.can_insert(0));
        assert!(!moves.can_remove(3));

        moves.register_move(Some(2), None);
        assert!(moves.is_exhausted());
    }
}
