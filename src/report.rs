//! Run report: everything needed to reproduce and inspect a run.
//!
//! The report is written as pretty JSON, as a sectioned text summary, or as a CSV
//! table with one row per restart.

use crate::config::{BranchingFactor, RunConfig};
use crate::heuristics::RunResult;
use crate::instance::ProblemStatistics;
use crate::reduction::ReductionStrategy;
use crate::solution::Solution;
use crate::statistics::RunStatistics;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub problem: ProblemStatistics,
    pub config: RunConfig,
    /// Reduction strategies, as given on the command line
    pub strategies: Vec<String>,
    pub elapsed_seconds: f64,
    pub statistics: RunStatistics,
    pub solutions: Vec<Solution>,
}

/// One row of the restart table
#[derive(Debug, Clone, Serialize)]
struct RestartRow {
    restart: usize,
    seconds: f64,
    best_value: f64,
}

impl RunReport {
    pub fn new(
        problem: ProblemStatistics,
        config: RunConfig,
        strategies: &[ReductionStrategy],
        elapsed_seconds: f64,
        result: RunResult,
    ) -> Self {
        RunReport {
            problem,
            config,
            strategies: strategies.iter().map(|s| s.nomenclature.clone()).collect(),
            elapsed_seconds,
            statistics: result.statistics,
            solutions: result.solutions,
        }
    }

    pub fn best(&self) -> Option<&Solution> {
        self.solutions.first()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_restarts<W: Write>(&self, writer: &mut csv::Writer<W>) -> csv::Result<()> {
        let rows = self
            .statistics
            .restart_times
            .iter()
            .zip(&self.statistics.restart_values)
            .enumerate();
        for (restart, (&seconds, &best_value)) in rows {
            writer.serialize(RestartRow {
                restart,
                seconds,
                best_value,
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export the restart table to CSV
    pub fn export_restarts_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        self.write_restarts(&mut writer)?;
        Ok(())
    }
}

fn fmt_branching(branching: BranchingFactor) -> String {
    match branching {
        BranchingFactor::All => "ALL".to_string(),
        BranchingFactor::Logarithmic => "LOGARITHMIC".to_string(),
        BranchingFactor::Fixed(k) => k.to_string(),
    }
}

fn fmt_list<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(" ")
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = &self.config;
        let stats = &self.statistics;

        writeln!(f, "{}", self.problem)?;

        writeln!(f, "== RUN DATA ==")?;
        writeln!(f, "# STRATEGIES: {}", self.strategies.join(" "))?;
        writeln!(f, "# TARGET_SOLS: {}", config.target_sols)?;
        writeln!(f, "# THREADS: {}", config.n_threads)?;
        writeln!(f, "# RESTARTS: {}", config.n_restarts)?;
        writeln!(f, "# SEED: {}", config.seed)?;
        writeln!(f, "# FILTER: {}", config.filter.name())?;
        writeln!(f, "# BRANCHING_FACTOR: {}", fmt_branching(config.branching_factor))?;
        writeln!(f, "# BRANCHING_CORRECTION: {}", config.branching_correction)?;
        writeln!(f, "# BRANCH_AND_BOUND: {}", config.branch_and_bound)?;
        writeln!(f, "# LOCAL_SEARCH: {}", config.local_search.name())?;
        writeln!(f, "# PATH_RELINKING: {:?}", config.path_relinking)?;
        writeln!(f, "# PATH_RELINKING_LOCAL_SEARCH: {}", config.local_search_pr.name())?;
        writeln!(f, "# ELAPSED_SECONDS: {:.3}", self.elapsed_seconds)?;

        writeln!(f, "== LOCAL SEARCH INFO ==")?;
        writeln!(f, "# N_LOCAL_SEARCHES: {}", stats.n_local_searches)?;
        writeln!(f, "# N_MOVEMENTS: {}", stats.n_local_search_movements)?;
        writeln!(f, "# MEAN_MOVEMENTS: {:.3}", stats.mean_moves_per_local_search())?;
        writeln!(f, "# LOCAL_SEARCH_SECONDS: {:.3}", stats.local_search_seconds)?;
        writeln!(f, "# PATH_RELINKING_SECONDS: {:.3}", stats.path_relinking_seconds)?;
        writeln!(f, "# PATH_RELINKING_SOLUTIONS: {}", stats.n_path_relinking_solutions)?;

        writeln!(f, "== FIRST RESTART INFO ==")?;
        writeln!(f, "# N_ITERATIONS: {}", stats.firstr_n_iterations)?;
        writeln!(f, "# TOTAL_N_ITERATIONS: {}", stats.total_n_iterations)?;
        writeln!(f, "# PER_SIZE_N_SOLS: {}", fmt_list(&stats.firstr_per_size_n_sols))?;
        writeln!(f, "# PER_SIZE_N_SOLS_AFTER_RED: {}", fmt_list(&stats.firstr_per_size_n_sols_after_red))?;
        writeln!(f, "# PER_SIZE_N_LOCAL_OPTIMA: {}", fmt_list(&stats.firstr_per_size_n_local_optima))?;

        writeln!(f, "== SOLUTIONS DATA ==")?;
        writeln!(f, "# RESTART_TIMES: {}", fmt_list(&stats.restart_times))?;
        writeln!(f, "# RESTART_VALUES: {}", fmt_list(&stats.restart_values))?;
        if let Some(best) = stats.best_restart() {
            writeln!(f, "# BEST_RESTART: {}", best)?;
        }
        writeln!(f, "# N_SOLUTIONS: {}", self.solutions.len())?;
        for sol in &self.solutions {
            write!(f, "{}", sol)?;
        }
        Ok(())
    }
}
