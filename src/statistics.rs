//! Counters and timings collected by the restart driver.
//!
//! Workers never touch these: they return partial counts and the driver folds them
//! in after each join.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    /// Pool size at each construction level of the first restart, before reduction
    pub firstr_per_size_n_sols: Vec<usize>,
    /// Pool size at each construction level of the first restart, after reduction
    pub firstr_per_size_n_sols_after_red: Vec<usize>,
    /// Distinct local optima stored at each level of the first restart
    pub firstr_per_size_n_local_optima: Vec<usize>,
    pub firstr_n_iterations: usize,
    pub total_n_iterations: usize,
    pub n_local_searches: usize,
    pub n_local_search_movements: usize,
    pub local_search_seconds: f64,
    pub path_relinking_seconds: f64,
    /// Solutions produced by path relinking that were not already known
    pub n_path_relinking_solutions: usize,
    /// Seconds spent on each restart (NaN until the restart completes)
    pub restart_times: Vec<f64>,
    /// Best value found by each restart
    pub restart_values: Vec<f64>,
}

impl RunStatistics {
    pub fn new(n_facilities: usize, n_restarts: usize) -> Self {
        let levels = n_facilities + 2;
        RunStatistics {
            firstr_per_size_n_sols: vec![0; levels],
            firstr_per_size_n_sols_after_red: vec![0; levels],
            firstr_per_size_n_local_optima: vec![0; levels],
            restart_times: vec![f64::NAN; n_restarts],
            restart_values: vec![f64::NEG_INFINITY; n_restarts],
            ..Default::default()
        }
    }

    pub fn record_level_size(&mut self, size: usize, n_sols: usize) {
        if let Some(slot) = self.firstr_per_size_n_sols.get_mut(size) {
            *slot = n_sols;
        }
    }

    pub fn record_level_size_after_reduction(&mut self, size: usize, n_sols: usize) {
        if let Some(slot) = self.firstr_per_size_n_sols_after_red.get_mut(size) {
            *slot = n_sols;
        }
    }

    pub fn record_local_optima(&mut self, size: usize, n_sols: usize) {
        if let Some(slot) = self.firstr_per_size_n_local_optima.get_mut(size) {
            *slot = n_sols;
        }
    }

    pub fn record_local_search(&mut self, n_sols: usize, n_moves: usize, seconds: f64) {
        self.n_local_searches += n_sols;
        self.n_local_search_movements += n_moves;
        self.local_search_seconds += seconds;
    }

    pub fn record_restart(&mut self, restart: usize, seconds: f64, best_value: f64) {
        if restart < self.restart_times.len() {
            self.restart_times[restart] = seconds;
            self.restart_values[restart] = best_value;
        }
    }

    /// Index of the restart that found the best value
    pub fn best_restart(&self) -> Option<usize> {
        self.restart_values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }

    pub fn mean_moves_per_local_search(&self) -> f64 {
        if self.n_local_searches == 0 {
            0.0
        } else {
            self.n_local_search_movements as f64 / self.n_local_searches as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_statistics() {
        let stats = RunStatistics::new(3, 2);
        assert_eq!(stats.firstr_per_size_n_sols.len(), 5);
        assert!(stats.restart_times.iter().all(|t| t.is_nan()));
        assert!(stats.restart_values.iter().all(|&v| v == f64::NEG_INFINITY));
    }

    #[test]
    fn test_record_and_best_restart() {
        let mut stats = RunStatistics::new(3, 3);
        stats.record_restart(0, 0.5, -10.0);
        stats.record_restart(1, 0.4, -3.0);
        stats.record_restart(2, 0.7, -8.0);
        stats.record_restart(7, 1.0, 100.0);
        assert_eq!(stats.best_restart(), Some(1));

        stats.record_local_search(4, 10, 0.25);
        stats.record_local_search(1, 0, 0.25);
        assert_eq!(stats.n_local_searches, 5);
        assert!((stats.mean_moves_per_local_search() - 2.0).abs() < 1e-12);
        assert!((stats.local_search_seconds - 0.5).abs() < 1e-12);

        stats.record_level_size(10, 3);
        stats.record_level_size(1, 3);
        assert_eq!(stats.firstr_per_size_n_sols, vec![0, 3, 0, 0, 0]);
    }
}
