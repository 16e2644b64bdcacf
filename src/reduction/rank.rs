//! Rank-weighted random sampling without replacement.
//!
//! Position `i` of the sorted pool gets weight `max(1, 100000000 / (i + 1))`. Weights
//! live in the leaves of an implicit segment tree so that a pick and its removal cost
//! `O(log n)`.

use crate::solution::Solution;
use rand::Rng;

const RANK_WEIGHT_SCALE: i64 = 100_000_000;

/// Segment tree over `len` non-negative integer weights. Leaf `k` is node `len + k` and
/// every internal node `p` holds the sum of nodes `2p` and `2p + 1`.
struct WeightTree {
    len: usize,
    nodes: Vec<i64>,
}

impl WeightTree {
    fn new(len: usize) -> Self {
        WeightTree {
            len,
            nodes: vec![0; 2 * len],
        }
    }

    fn total(&self) -> i64 {
        self.nodes.get(1).copied().unwrap_or(0)
    }

    fn update(&mut self, k: usize, weight: i64) {
        let mut p = self.len + k;
        let delta = weight - self.nodes[p];
        while p > 0 {
            self.nodes[p] += delta;
            p /= 2;
        }
    }

    /// Leaf holding the `r`-th unit of weight
    fn find(&self, mut r: i64) -> usize {
        let mut p = 1;
        while p < self.len {
            if r >= self.nodes[2 * p] {
                r -= self.nodes[2 * p];
                p = 2 * p + 1;
            } else {
                p *= 2;
            }
        }
        p - self.len
    }

    fn pick<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let total = self.total();
        if total <= 0 {
            return None;
        }
        let r = ((rng.gen::<f64>() * total as f64) as i64).min(total - 1);
        Some(self.find(r))
    }
}

pub(super) fn random_rank<R: Rng>(pool: &mut Vec<Solution>, target: usize, elitist: bool, rng: &mut R) {
    let n = pool.len();
    if n <= target {
        return;
    }
    let mut picked = vec![false; n];
    let mut n_picked = 0;
    if elitist && target > 0 {
        picked[0] = true;
        n_picked = 1;
    }

    let mut tree = WeightTree::new(n);
    for i in usize::from(elitist)..n {
        tree.update(i, (RANK_WEIGHT_SCALE / (i as i64 + 1)).max(1));
    }
    while n_picked < target {
        let Some(k) = tree.pick(rng) else { break };
        picked[k] = true;
        tree.update(k, 0);
        n_picked += 1;
    }

    let mut index = 0;
    pool.retain(|_| {
        let keep = picked[index];
        index += 1;
        keep
    });
}
