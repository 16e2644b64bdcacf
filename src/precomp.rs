//! Run-wide data computed once before the search and shared read-only by all workers.

use crate::dissimilarity::FacilityDistance;
use crate::instance::Problem;
use crate::parallel::WorkerPool;
use crate::solution::Solution;
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, Default)]
pub struct RunPrecomp {
    /// Value of the solution with no open facility
    pub empty_value: f64,
    /// Sum over clients of the best value they can get
    pub client_optimal_gain: f64,
    /// Facility-facility distance matrices, indexed by [`FacilityDistance::index`]
    facility_distances: [Option<Vec<Vec<f64>>>; 2],
    /// For each client, all facilities sorted by decreasing assignment value
    pub nearly_indexes: Option<Vec<Vec<usize>>>,
}

impl RunPrecomp {
    /// Compute the values every run needs, plus the requested facility distance
    /// matrices and, optionally, the per-client proximity orderings.
    pub fn new(
        problem: &Problem,
        facility_modes: &[FacilityDistance],
        proximity_orderings: bool,
        workers: &WorkerPool,
    ) -> Self {
        let empty_value = Solution::empty(problem).value;
        let client_optimal_gain = workers
            .map_round_robin(problem.n_clients(), |c| {
                (0..problem.n_facilities())
                    .map(|f| problem.assignment_value(Some(f), c))
                    .fold(problem.assignment_value(None, c), f64::max)
            })
            .into_iter()
            .sum();

        let mut precomp = RunPrecomp {
            empty_value,
            client_optimal_gain,
            facility_distances: [None, None],
            nearly_indexes: None,
        };
        for &mode in facility_modes {
            if precomp.facility_distances(mode).is_none() {
                log::info!("Computing facility distances ({:?})", mode);
                let matrix = mode.matrix(problem, workers);
                precomp = precomp.with_facility_distances(mode, matrix);
            }
        }
        if proximity_orderings {
            log::info!("Computing per-client facility orderings");
            precomp.nearly_indexes = Some(workers.map_round_robin(problem.n_clients(), |c| {
                let mut facilities: Vec<usize> = (0..problem.n_facilities()).collect();
                facilities.sort_by_key(|&f| OrderedFloat(-problem.assignment_value(Some(f), c)));
                facilities
            }));
        }
        precomp
    }

    pub fn facility_distances(&self, mode: FacilityDistance) -> Option<&[Vec<f64>]> {
        self.facility_distances[mode.index()].as_deref()
    }

    pub fn with_facility_distances(mut self, mode: FacilityDistance, matrix: Vec<Vec<f64>>) -> Self {
        self.facility_distances[mode.index()] = Some(matrix);
        self
    }
}
