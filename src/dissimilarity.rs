//! Distances between facilities and dissimilarities between solutions.
//!
//! Set-based metrics (mean geometric error, Hausdorff) compare the facility sets of two
//! solutions through a precomputed facility-facility distance matrix. Per-client delta
//! and indexes-value work on the solutions directly.

use crate::error::ConfigError;
use crate::instance::Problem;
use crate::parallel::WorkerPool;
use crate::precomp::RunPrecomp;
use crate::solution::Solution;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// How the distance between two facilities is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityDistance {
    /// `min_j d(a,j) + d(b,j)`
    MinTriangle,
    /// `sum_j |value(a,j) - value(b,j)|`
    SumOfDeltas,
}

impl FacilityDistance {
    pub const ALL: [FacilityDistance; 2] = [FacilityDistance::MinTriangle, FacilityDistance::SumOfDeltas];

    pub fn index(&self) -> usize {
        match self {
            FacilityDistance::MinTriangle => 0,
            FacilityDistance::SumOfDeltas => 1,
        }
    }

    pub fn between(&self, problem: &Problem, a: usize, b: usize) -> f64 {
        let clients = 0..problem.n_clients();
        match self {
            FacilityDistance::MinTriangle => clients
                .map(|j| problem.distance[a][j] + problem.distance[b][j])
                .fold(f64::INFINITY, f64::min),
            FacilityDistance::SumOfDeltas => clients
                .map(|j| (problem.assignment_value(Some(a), j) - problem.assignment_value(Some(b), j)).abs())
                .sum(),
        }
    }

    /// Full symmetric matrix, computing row `a` (for `b >= a`) on worker `a mod T`.
    pub fn matrix(&self, problem: &Problem, workers: &WorkerPool) -> Vec<Vec<f64>> {
        let n = problem.n_facilities();
        let rows = workers.map_round_robin(n, |a| {
            (a..n).map(|b| self.between(problem, a, b)).collect::<Vec<f64>>()
        });
        Self::symmetrize(n, rows)
    }

    fn matrix_sequential(&self, problem: &Problem) -> Vec<Vec<f64>> {
        let n = problem.n_facilities();
        let rows = (0..n)
            .map(|a| (a..n).map(|b| self.between(problem, a, b)).collect())
            .collect();
        Self::symmetrize(n, rows)
    }

    fn symmetrize(n: usize, upper_rows: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        let mut matrix = vec![vec![0.0; n]; n];
        for (a, row) in upper_rows.into_iter().enumerate() {
            for (k, dist) in row.into_iter().enumerate() {
                matrix[a][a + k] = dist;
                matrix[a + k][a] = dist;
            }
        }
        matrix
    }
}

/// Dissimilarity between two solutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dissimilarity {
    /// Sum, in both directions, of each facility's distance to the nearest facility of the other set
    MeanGeometricError(FacilityDistance),
    /// Largest nearest-facility distance, in both directions
    Hausdorff(FacilityDistance),
    /// Sum over clients of the difference of their assignment values
    PerClientDelta,
    /// Mean geometric error normalized by the total number of facilities
    Auto(FacilityDistance),
    /// Size of the symmetric difference of the facility sets, with a value-based tiebreak
    IndexesValue,
}

impl Default for Dissimilarity {
    fn default() -> Self {
        Dissimilarity::PerClientDelta
    }
}

impl Dissimilarity {
    pub fn from_code(code: &str) -> Result<Self, ConfigError> {
        use Dissimilarity::*;
        use FacilityDistance::*;
        match code {
            "mgemin" => Ok(MeanGeometricError(MinTriangle)),
            "mgesum" => Ok(MeanGeometricError(SumOfDeltas)),
            "haumin" => Ok(Hausdorff(MinTriangle)),
            "hausum" => Ok(Hausdorff(SumOfDeltas)),
            "pcd" => Ok(PerClientDelta),
            "automin" => Ok(Auto(MinTriangle)),
            "autosum" => Ok(Auto(SumOfDeltas)),
            "indexval" => Ok(IndexesValue),
            _ => Err(ConfigError::UnknownDissimilarity(code.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        use Dissimilarity::*;
        use FacilityDistance::*;
        match self {
            MeanGeometricError(MinTriangle) => "mgemin",
            MeanGeometricError(SumOfDeltas) => "mgesum",
            Hausdorff(MinTriangle) => "haumin",
            Hausdorff(SumOfDeltas) => "hausum",
            PerClientDelta => "pcd",
            Auto(MinTriangle) => "automin",
            Auto(SumOfDeltas) => "autosum",
            IndexesValue => "indexval",
        }
    }

    /// Facility distance matrix needed to evaluate this dissimilarity, if any
    pub fn facility_distance(&self) -> Option<FacilityDistance> {
        match self {
            Dissimilarity::MeanGeometricError(mode) | Dissimilarity::Hausdorff(mode) | Dissimilarity::Auto(mode) => {
                Some(*mode)
            }
            Dissimilarity::PerClientDelta | Dissimilarity::IndexesValue => None,
        }
    }
}

/// A dissimilarity bound to a problem and to the facility distances it needs.
pub struct DissimilarityOracle<'a> {
    problem: &'a Problem,
    dissimilarity: Dissimilarity,
    facility_distances: Cow<'a, [Vec<f64>]>,
}

impl<'a> DissimilarityOracle<'a> {
    pub fn new(problem: &'a Problem, precomp: &'a RunPrecomp, dissimilarity: Dissimilarity) -> Self {
        let facility_distances = match dissimilarity.facility_distance() {
            None => Cow::Borrowed(&[][..]),
            Some(mode) => match precomp.facility_distances(mode) {
                Some(matrix) => Cow::Borrowed(matrix),
                None => {
                    log::warn!("Facility distances {:?} were not precomputed, computing them now", mode);
                    Cow::Owned(mode.matrix_sequential(problem))
                }
            },
        };
        DissimilarityOracle {
            problem,
            dissimilarity,
            facility_distances,
        }
    }

    pub fn between(&self, a: &Solution, b: &Solution) -> f64 {
        match self.dissimilarity {
            Dissimilarity::MeanGeometricError(_) => self.mean_geometric_error(a, b),
            Dissimilarity::Hausdorff(_) => self.hausdorff(a, b),
            Dissimilarity::PerClientDelta => self.per_client_delta(a, b),
            Dissimilarity::Auto(_) => {
                let total = a.size() + b.size();
                if total == 0 {
                    0.0
                } else {
                    self.mean_geometric_error(a, b) / total as f64
                }
            }
            Dissimilarity::IndexesValue => indexes_value(a, b),
        }
    }

    fn nearest_sum(&self, from: &[usize], to: &[usize]) -> f64 {
        from.iter()
            .map(|&f1| {
                to.iter()
                    .map(|&f2| self.facility_distances[f1][f2])
                    .fold(f64::INFINITY, f64::min)
            })
            .sum()
    }

    fn mean_geometric_error(&self, a: &Solution, b: &Solution) -> f64 {
        self.nearest_sum(&a.facilities, &b.facilities) + self.nearest_sum(&b.facilities, &a.facilities)
    }

    fn hausdorff(&self, a: &Solution, b: &Solution) -> f64 {
        let mut dist: f64 = 0.0;
        for (from, to) in [(&a.facilities, &b.facilities), (&b.facilities, &a.facilities)] {
            for &f1 in from.iter() {
                let mut cmin = f64::INFINITY;
                for &f2 in to.iter() {
                    cmin = cmin.min(self.facility_distances[f1][f2]);
                    if cmin < dist {
                        break;
                    }
                }
                if dist < cmin && cmin < f64::INFINITY {
                    dist = cmin;
                }
            }
        }
        dist
    }

    fn per_client_delta(&self, a: &Solution, b: &Solution) -> f64 {
        (0..self.problem.n_clients())
            .filter(|&c| a.assignment[c] != b.assignment[c])
            .map(|c| {
                (self.problem.assignment_value(a.assignment[c], c) - self.problem.assignment_value(b.assignment[c], c))
                    .abs()
            })
            .sum()
    }
}

/// Symmetric difference of two sorted facility sets, plus a value tiebreak in `[0, 1)`.
fn indexes_value(a: &Solution, b: &Solution) -> f64 {
    let (x, y) = (&a.facilities, &b.facilities);
    let (mut i, mut j, mut common) = (0, 0, 0);
    while i < x.len() && j < y.len() {
        match x[i].cmp(&y[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                common += 1;
                i += 1;
                j += 1;
            }
        }
    }
    let symmetric_difference = (x.len() + y.len() - 2 * common) as f64;
    let tiebreak = (a.value - b.value).abs() / (1.0 + a.value.abs() + b.value.abs());
    symmetric_difference + if tiebreak.is_finite() { tiebreak } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::tests::{create_costly_problem, create_test_problem};

    fn solution_with(problem: &Problem, facilities: &[usize]) -> Solution {
        let mut sol = Solution::empty(problem);
        for &f in facilities {
            sol.add(problem, f);
        }
        sol
    }

    #[test]
    fn test_codes_round_trip_and_errors() {
        for code in ["mgemin", "mgesum", "haumin", "hausum", "pcd", "automin", "autosum", "indexval"] {
            assert_eq!(Dissimilarity::from_code(code).unwrap().code(), code);
        }
        assert!(matches!(
            Dissimilarity::from_code("euclid"),
            Err(ConfigError::UnknownDissimilarity(_))
        ));
        assert_eq!(Dissimilarity::PerClientDelta.facility_distance(), None);
        assert_eq!(
            Dissimilarity::Hausdorff(FacilityDistance::SumOfDeltas).facility_distance(),
            Some(FacilityDistance::SumOfDeltas)
        );
    }

    #[test]
    fn test_facility_distance_matrix() {
        let problem = create_test_problem();
        let workers = WorkerPool::new(2).unwrap();

        let triangle = FacilityDistance::MinTriangle.matrix(&problem, &workers);
        // d(0,1) = min(1+3, 2+1)
        assert_eq!(triangle[0][1], 3.0);
        assert_eq!(triangle[1][0], 3.0);
        assert_eq!(triangle[0][0], 2.0);

        let deltas = FacilityDistance::SumOfDeltas.matrix(&problem, &workers);
        assert_eq!(deltas[0][1], 3.0);
        assert_eq!(deltas[1][2], 2.0);
        assert_eq!(deltas[2][2], 0.0);
    }

    #[test]
    fn test_per_client_delta() {
        let problem = create_test_problem();
        let precomp = RunPrecomp::default();
        let oracle = DissimilarityOracle::new(&problem, &precomp, Dissimilarity::PerClientDelta);

        let a = solution_with(&problem, &[0, 1]);
        let b = solution_with(&problem, &[2]);
        // client 0: |-1 - -2|, client 1: |-1 - -2|
        assert!((oracle.between(&a, &b) - 2.0).abs() < 1e-12);
        assert_eq!(oracle.between(&a, &a), 0.0);
    }

    #[test]
    fn test_set_based_metrics() {
        let problem = create_costly_problem();
        let workers = WorkerPool::new(2).unwrap();
        let mode = FacilityDistance::SumOfDeltas;
        let matrix = mode.matrix(&problem, &workers);
        let precomp = RunPrecomp::default().with_facility_distances(mode, matrix.clone());

        let a = solution_with(&problem, &[0]);
        let b = solution_with(&problem, &[1, 3]);
        let mge = DissimilarityOracle::new(&problem, &precomp, Dissimilarity::MeanGeometricError(mode));
        let expected = matrix[0][1].min(matrix[0][3]) + matrix[1][0] + matrix[3][0];
        assert!((mge.between(&a, &b) - expected).abs() < 1e-9);

        let auto = DissimilarityOracle::new(&problem, &precomp, Dissimilarity::Auto(mode));
        assert!((auto.between(&a, &b) - expected / 3.0).abs() < 1e-9);

        let hausdorff = DissimilarityOracle::new(&problem, &precomp, Dissimilarity::Hausdorff(mode));
        let h = hausdorff.between(&a, &b);
        assert!(h <= matrix[0][1].max(matrix[0][3]).max(matrix[1][0]).max(matrix[3][0]) + 1e-9);
        assert!(h >= matrix[0][1].min(matrix[0][3]) - 1e-9);
        assert_eq!(hausdorff.between(&a, &a), 0.0);
    }

    #[test]
    fn test_missing_matrix_is_computed_on_demand() {
        let problem = create_test_problem();
        let precomp = RunPrecomp::default();
        let oracle = DissimilarityOracle::new(
            &problem,
            &precomp,
            Dissimilarity::MeanGeometricError(FacilityDistance::MinTriangle),
        );
        let a = solution_with(&problem, &[0]);
        let b = solution_with(&problem, &[1]);
        assert!((oracle.between(&a, &b) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_indexes_value() {
        let problem = create_test_problem();
        let a = solution_with(&problem, &[0, 1]);
        let b = solution_with(&problem, &[1, 2]);
        let d = indexes_value(&a, &b);
        assert!(d >= 2.0 && d < 3.0);
        assert_eq!(indexes_value(&a, &a), 0.0);
    }
}
