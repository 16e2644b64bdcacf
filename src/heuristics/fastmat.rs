//! Sparse accumulation matrix indexed by `(inserted, removed)` facility pairs.
//!
//! Every cell keeps the accumulated value and the number of contributions it received.
//! A cell disappears as soon as its last contribution is subtracted, so iterating the
//! matrix only visits pairs that some client currently cares about.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;

/// Unkeyed hasher: cell iteration order only depends on the insertion history
type CellHasher = BuildHasherDefault<DefaultHasher>;

#[derive(Debug, Clone, Default)]
pub struct FastMat {
    cells: HashMap<(usize, usize), (f64, usize), CellHasher>,
}

impl FastMat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, inserted: usize, removed: usize, value: f64) {
        let cell = self.cells.entry((inserted, removed)).or_insert((0.0, 0));
        cell.0 += value;
        cell.1 += 1;
    }

    /// Subtract a contribution previously added with [`FastMat::add`].
    pub fn sub(&mut self, inserted: usize, removed: usize, value: f64) {
        let key = (inserted, removed);
        let Some(cell) = self.cells.get_mut(&key) else {
            debug_assert!(false, "subtracting from an empty cell {:?}", key);
            return;
        };
        cell.0 -= value;
        cell.1 -= 1;
        if cell.1 == 0 {
            self.cells.remove(&key);
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, inserted: usize, removed: usize) -> f64 {
        self.cells.get(&(inserted, removed)).map_or(0.0, |cell| cell.0)
    }

    /// Non-empty cells as `(inserted, removed, value)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.cells.iter().map(|(&(ins, rem), &(value, _))| (ins, rem, value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_vanish_when_count_reaches_zero() {
        let mut mat = FastMat::new();
        mat.add(1, 2, 3.0);
        mat.add(1, 2, 0.5);
        mat.add(4, 0, 0.0);
        assert_eq!(mat.len(), 2);
        assert!((mat.get(1, 2) - 3.5).abs() < 1e-12);

        mat.sub(1, 2, 3.0);
        assert_eq!(mat.len(), 2);
        assert!((mat.get(1, 2) - 0.5).abs() < 1e-12);

        mat.sub(1, 2, 0.5);
        mat.sub(4, 0, 0.0);
        assert!(mat.is_empty());
        assert_eq!(mat.get(1, 2), 0.0);
    }

    #[test]
    fn test_zero_valued_cells_are_iterated() {
        let mut mat = FastMat::new();
        mat.add(0, 1, 2.0);
        mat.add(0, 1, -2.0);
        mat.add(2, 3, 1.0);

        let mut cells: Vec<(usize, usize)> = mat.iter().map(|(i, r, _)| (i, r)).collect();
        cells.sort();
        assert_eq!(cells, vec![(0, 1), (2, 3)]);

        mat.clear();
        assert_eq!(mat.iter().count(), 0);
    }
}
