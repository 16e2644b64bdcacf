//! Simple diversity-based starting method (SDBS).
//!
//! Centroids are picked greedily: the best solution first, then repeatedly the solution
//! farthest from every centroid so far. Each step runs two broadcasts: the first one
//! measures the new centroid against the older ones, the second one updates every
//! solution's nearest centroid, skipping the evaluation when the triangle inequality
//! shows the new centroid cannot be closer.

use crate::dissimilarity::DissimilarityOracle;
use crate::parallel::WorkerPool;
use crate::solution::Solution;
use parking_lot::Mutex;

pub(super) fn diversity_starting(
    oracle: &DissimilarityOracle<'_>,
    workers: &WorkerPool,
    pool: &mut Vec<Solution>,
    target: usize,
    bests_of_clusters: bool,
) {
    let n = pool.len();
    if n <= target {
        return;
    }
    if target == 0 {
        pool.clear();
        return;
    }
    let n_threads = workers.n_threads();

    let keep = {
        let sols: &[Solution] = &pool[..];
        let mut centroids: Vec<usize> = Vec::with_capacity(target);
        centroids.push(0);
        let mut is_centroid = vec![false; n];
        is_centroid[0] = true;
        let mut nearest_cluster: Vec<Option<usize>> = vec![None; n];
        let mut nearest_dist = vec![f64::INFINITY; n];
        let mut centroid_dist = Mutex::new(vec![0.0; target]);

        for t in 0..target {
            let centroid = centroids[t];

            workers.broadcast(|tid| {
                let computed: Vec<(usize, f64)> = (tid..t)
                    .step_by(n_threads)
                    .map(|k| {
                        let dist = if nearest_cluster[centroid] == Some(k) {
                            nearest_dist[centroid]
                        } else {
                            oracle.between(&sols[centroid], &sols[centroids[k]])
                        };
                        (k, dist)
                    })
                    .collect();
                let mut cache = centroid_dist.lock();
                for (k, dist) in computed {
                    cache[k] = dist;
                }
            });

            let cache: &[f64] = centroid_dist.get_mut();
            let updates: Vec<Vec<(usize, f64)>> = workers.broadcast(|tid| {
                let mut local = Vec::new();
                for r in (tid..n).step_by(n_threads) {
                    if is_centroid[r] {
                        continue;
                    }
                    let recompute = match nearest_cluster[r] {
                        Some(cluster) => t == 0 || nearest_dist[r] > 0.5 * cache[cluster],
                        None => true,
                    };
                    if recompute {
                        let dist = oracle.between(&sols[r], &sols[centroid]);
                        if dist < nearest_dist[r] {
                            local.push((r, dist));
                        }
                    }
                }
                local
            });
            for (r, dist) in updates.into_iter().flatten() {
                nearest_cluster[r] = Some(t);
                nearest_dist[r] = dist;
            }

            if t + 1 == target {
                break;
            }
            let mut farthest = None;
            let mut far_dist = f64::NEG_INFINITY;
            for i in 1..n {
                if !is_centroid[i] && nearest_dist[i] > far_dist {
                    farthest = Some(i);
                    far_dist = nearest_dist[i];
                }
            }
            let Some(next) = farthest else { break };
            centroids.push(next);
            is_centroid[next] = true;
        }

        // a centroid always belongs to its own cluster, even with zero-distance ties
        for (cluster, &c) in centroids.iter().enumerate() {
            nearest_cluster[c] = Some(cluster);
        }
        if bests_of_clusters {
            let mut represented = vec![false; centroids.len()];
            nearest_cluster
                .iter()
                .map(|cluster| match cluster {
                    Some(cl) if !represented[*cl] => {
                        represented[*cl] = true;
                        true
                    }
                    _ => false,
                })
                .collect::<Vec<bool>>()
        } else {
            is_centroid
        }
    };

    let mut index = 0;
    pool.retain(|_| {
        let kept = keep[index];
        index += 1;
        kept
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissimilarity::Dissimilarity;
    use crate::instance::Problem;
    use crate::precomp::RunPrecomp;
    use crate::solution::sort_by_value;

    /// Six facilities on a line, one client next to each facility.
    fn line_problem() -> Problem {
        let distance = (0..6)
            .map(|f| (0..6).map(|c| (f as f64 - c as f64).abs()).collect())
            .collect();
        let mut problem = Problem::from_distances(vec![0.0; 6], distance);
        problem.client_gain = 10.0;
        problem
    }

    fn pool_of(problem: &Problem, sets: &[&[usize]]) -> Vec<Solution> {
        let mut pool: Vec<Solution> = sets
            .iter()
            .map(|set| {
                let mut sol = Solution::empty(problem);
                for &f in set.iter() {
                    sol.add(problem, f);
                }
                sol
            })
            .collect();
        sort_by_value(&mut pool);
        pool
    }

    #[test]
    fn test_sdbs_reaches_target_and_keeps_best() {
        let problem = line_problem();
        let workers = WorkerPool::new(3).unwrap();
        let precomp = RunPrecomp::default();
        let oracle = DissimilarityOracle::new(&problem, &precomp, Dissimilarity::PerClientDelta);

        let sets: [&[usize]; 6] = [&[0, 1, 2], &[0, 1, 3], &[3, 4, 5], &[2, 4, 5], &[0, 5], &[1, 4]];
        for bests_of_clusters in [false, true] {
            let mut pool = pool_of(&problem, &sets);
            let best = pool[0].facilities.clone();
            diversity_starting(&oracle, &workers, &mut pool, 3, bests_of_clusters);
            assert_eq!(pool.len(), 3);
            assert_eq!(pool[0].facilities, best);
        }
    }

    #[test]
    fn test_sdbs_picks_far_solution() {
        let problem = line_problem();
        let workers = WorkerPool::new(2).unwrap();
        let precomp = RunPrecomp::default();
        let oracle = DissimilarityOracle::new(&problem, &precomp, Dissimilarity::IndexesValue);

        let sets: [&[usize]; 4] = [&[0, 1, 2], &[0, 1, 3], &[0, 2, 3], &[3, 4, 5]];
        let mut pool = pool_of(&problem, &sets);
        let first = pool[0].facilities.clone();
        diversity_starting(&oracle, &workers, &mut pool, 2, false);

        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].facilities, first);
        // the second centroid is the solution sharing the fewest facilities with the first
        let far = pool[1].facilities.clone();
        let shared = far.iter().filter(|f| first.contains(f)).count();
        assert!(shared <= 1);
    }

    #[test]
    fn test_sdbs_zero_target_clears() {
        let problem = line_problem();
        let workers = WorkerPool::new(2).unwrap();
        let precomp = RunPrecomp::default();
        let oracle = DissimilarityOracle::new(&problem, &precomp, Dissimilarity::PerClientDelta);
        let mut pool = pool_of(&problem, &[&[0], &[1]]);
        diversity_starting(&oracle, &workers, &mut pool, 0, true);
        assert!(pool.is_empty());
    }
}
