//! Vision-range reduction.
//!
//! Solutions are sorted by value and linked in a list. Every pair of solutions at most
//! `vision_range` positions apart is scored by dissimilarity; the most similar pair still
//! alive loses its worse member, and the pairs broken by the deletion are replaced by
//! pairs bridging the gap.

use crate::dissimilarity::DissimilarityOracle;
use crate::parallel::WorkerPool;
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Two solutions (by position, `id1 < id2`) and their dissimilarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct DissimPair {
    dissim: OrderedFloat<f64>,
    id1: usize,
    id2: usize,
}

impl DissimPair {
    fn new(oracle: &DissimilarityOracle<'_>, sols: &[Solution], id1: usize, id2: usize) -> Self {
        DissimPair {
            dissim: OrderedFloat(oracle.between(&sols[id1], &sols[id2])),
            id1,
            id2,
        }
    }
}

/// Follow `links` from `start` up to `len` times; `None` once the list ends.
fn walk(links: &[Option<usize>], start: usize, len: usize) -> Vec<Option<usize>> {
    let mut current = start;
    (0..len)
        .map(|_| {
            let next = links[current]?;
            current = next;
            Some(next)
        })
        .collect()
}

pub(super) fn vision_range_reduction(
    oracle: &DissimilarityOracle<'_>,
    workers: &WorkerPool,
    pool: &mut Vec<Solution>,
    target: usize,
    vision_range: usize,
) {
    let n = pool.len();
    if n <= target {
        return;
    }
    let vision_range = vision_range.clamp(1, n);
    let n_threads = workers.n_threads();

    let discarded = {
        let sols: &[Solution] = &pool[..];
        let mut heap: Mutex<BinaryHeap<Reverse<DissimPair>>> = Mutex::new(BinaryHeap::new());

        workers.broadcast(|tid| {
            for i in (tid..n).step_by(n_threads) {
                let pairs: Vec<Reverse<DissimPair>> = (1..=vision_range)
                    .take_while(|j| i + j < n)
                    .map(|j| Reverse(DissimPair::new(oracle, sols, i, i + j)))
                    .collect();
                heap.lock().extend(pairs);
            }
        });

        let mut discarded = vec![false; n];
        let mut prevs: Vec<Option<usize>> = (0..n).map(|i| i.checked_sub(1)).collect();
        let mut nexts: Vec<Option<usize>> = (0..n).map(|i| (i + 1 < n).then_some(i + 1)).collect();
        let n_eliminate = n - target;
        let mut eliminated = 0;

        while eliminated < n_eliminate {
            let Some(Reverse(pair)) = heap.get_mut().pop() else { break };
            if discarded[pair.id1] || discarded[pair.id2] {
                continue;
            }
            let deleted = pair.id2;
            discarded[deleted] = true;
            eliminated += 1;
            if let Some(next) = nexts[deleted] {
                prevs[next] = prevs[deleted];
            }
            if let Some(prev) = prevs[deleted] {
                nexts[prev] = nexts[deleted];
            }

            let after = walk(&nexts, deleted, vision_range);
            let before = walk(&prevs, deleted, vision_range);
            workers.broadcast(|tid| {
                let mut buffer = Vec::new();
                for i in (tid..vision_range).step_by(n_threads) {
                    if let (Some(a), Some(b)) = (before[vision_range - 1 - i], after[i]) {
                        buffer.push(Reverse(DissimPair::new(oracle, sols, a, b)));
                        if let Some(mut heap) = heap.try_lock() {
                            heap.extend(buffer.drain(..));
                        }
                    }
                }
                if !buffer.is_empty() {
                    heap.lock().extend(buffer);
                }
            });
        }
        log::debug!(
            "Vision range {} discarded {} of {} solutions",
            vision_range,
            eliminated,
            n
        );
        discarded
    };

    let mut index = 0;
    pool.retain(|_| {
        let kept = !discarded[index];
        index += 1;
        kept
    });
}
