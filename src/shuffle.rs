//! Restartable random permutation of `0..len`.
//!
//! Values are drawn one at a time with [`Shuffler::next`]; [`Shuffler::reshuffle`] only
//! re-randomizes the prefix that was consumed, so drawing `k` values costs `O(k)`.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct Shuffler {
    nums: Vec<usize>,
    n_retrieved: usize,
    rng: ChaCha8Rng,
}

impl Shuffler {
    pub fn new(len: usize, seed: u64) -> Self {
        let mut shuffler = Shuffler {
            nums: (0..len).collect(),
            n_retrieved: len,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        shuffler.reshuffle();
        shuffler
    }

    /// Create a shuffler seeded from another random generator
    pub fn from_rng<R: Rng>(len: usize, rng: &mut R) -> Self {
        Self::new(len, rng.gen())
    }

    pub fn len(&self) -> usize {
        self.nums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nums.is_empty()
    }

    /// Next value of the current permutation, or `None` once all were retrieved
    pub fn next(&mut self) -> Option<usize> {
        let value = self.nums.get(self.n_retrieved).copied()?;
        self.n_retrieved += 1;
        Some(value)
    }

    /// Start a new permutation; values already retrieved become available again.
    pub fn reshuffle(&mut self) {
        let len = self.nums.len();
        for i in 0..self.n_retrieved.min(len) {
            let j = self.rng.gen_range(i..len);
            self.nums.swap(i, j);
        }
        self.n_retrieved = 0;
    }
}
