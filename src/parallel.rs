//! Fork-join worker fabric with static round-robin partitioning.
//!
//! Every phase of the search runs as one blocking broadcast over a fixed set of
//! workers: worker `t` of `T` handles indices `t, t+T, t+2T, ...`. There is no work
//! stealing, and results are returned in index order once all workers joined.

use crate::error::ConfigError;
use parking_lot::Mutex;

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    n_threads: usize,
}

impl WorkerPool {
    pub fn new(n_threads: usize) -> Result<Self, ConfigError> {
        if n_threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("facloc-worker-{}", i))
            .build()?;
        Ok(WorkerPool { pool, n_threads })
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Run `f(worker_id)` once on every worker, returning the results by worker id.
    pub fn broadcast<R, F>(&self, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        self.pool.broadcast(|ctx| f(ctx.index()))
    }

    /// Evaluate `f(i)` for every `i < n`, round robin across workers.
    pub fn map_round_robin<R, F>(&self, n: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        self.map_round_robin_with(n, |_| (), |_, i| f(i))
    }

    /// Like [`WorkerPool::map_round_robin`], with a per-worker scratch state built once
    /// by `init(worker_id)` and reused for all the indices of that worker.
    pub fn map_round_robin_with<S, R, I, F>(&self, n: usize, init: I, f: F) -> Vec<R>
    where
        R: Send,
        I: Fn(usize) -> S + Sync,
        F: Fn(&mut S, usize) -> R + Sync,
    {
        if n == 0 {
            return Vec::new();
        }
        let parts = self.pool.broadcast(|ctx| {
            let mut state = init(ctx.index());
            (ctx.index()..n)
                .step_by(ctx.num_threads())
                .map(|i| f(&mut state, i))
                .collect::<Vec<R>>()
        });
        interleave(parts, n)
    }

    /// Apply `f` to every item in place, round robin across workers, with per-worker state.
    pub fn map_round_robin_mut<T, S, R, I, F>(&self, items: &mut [T], init: I, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        I: Fn(usize) -> S + Sync,
        F: Fn(&mut S, &mut T) -> R + Sync,
    {
        let n = items.len();
        if n == 0 {
            return Vec::new();
        }
        let mut buckets: Vec<Vec<&mut T>> = (0..self.n_threads).map(|_| Vec::new()).collect();
        for (i, item) in items.iter_mut().enumerate() {
            buckets[i % self.n_threads].push(item);
        }
        let buckets: Vec<Mutex<Vec<&mut T>>> = buckets.into_iter().map(Mutex::new).collect();

        let parts = self.pool.broadcast(|ctx| {
            let bucket = std::mem::take(&mut *buckets[ctx.index()].lock());
            let mut state = init(ctx.index());
            bucket.into_iter().map(|item| f(&mut state, item)).collect::<Vec<R>>()
        });
        interleave(parts, n)
    }
}

/// Restore index order from per-worker round-robin result lists.
fn interleave<R>(parts: Vec<Vec<R>>, n: usize) -> Vec<R> {
    let n_parts = parts.len();
    let mut iters: Vec<_> = parts.into_iter().map(Vec::into_iter).collect();
    (0..n).filter_map(|i| iters[i % n_parts].next()).collect()
}
