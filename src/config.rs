//! Run configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Admissibility policy applied to freshly expanded child solutions.
///
/// Levels are cumulative: each one implies the checks of the levels below it that
/// compare against parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Filter {
    NoFilter = 0,
    BetterThanEmpty = 1,
    BetterThanOneParent = 2,
    BetterThanAllParents = 3,
    BetterThanSubsets = 4,
}

impl Filter {
    pub fn from_level(level: u8) -> Result<Self, ConfigError> {
        match level {
            0 => Ok(Filter::NoFilter),
            1 => Ok(Filter::BetterThanEmpty),
            2 => Ok(Filter::BetterThanOneParent),
            3 => Ok(Filter::BetterThanAllParents),
            4 => Ok(Filter::BetterThanSubsets),
            _ => Err(ConfigError::InvalidFilter(level)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::NoFilter => "NO_FILTER",
            Filter::BetterThanEmpty => "BETTER_THAN_EMPTY",
            Filter::BetterThanOneParent => "BETTER_THAN_ONE_PARENT",
            Filter::BetterThanAllParents => "BETTER_THAN_ALL_PARENTS",
            Filter::BetterThanSubsets => "BETTER_THAN_SUBSETS",
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::BetterThanAllParents
    }
}

/// Local search algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalSearchKind {
    None,
    /// Whitaker's fast exchange, best improvement
    BestImprovement,
    /// Whitaker's fast exchange, first improvement over a shuffled candidate order
    FirstImprovement,
    /// Resende and Werneck's accelerated swap search
    ResendeWerneck,
}

impl LocalSearchKind {
    pub fn name(&self) -> &'static str {
        match self {
            LocalSearchKind::None => "NO_LOCAL_SEARCH",
            LocalSearchKind::BestImprovement => "SWAP_BEST_IMPROVEMENT",
            LocalSearchKind::FirstImprovement => "SWAP_FIRST_IMPROVEMENT",
            LocalSearchKind::ResendeWerneck => "SWAP_RESENDE_WERNECK",
        }
    }
}

/// When path relinking runs after a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathRelinkingMode {
    Off,
    OneIteration,
    UntilNoBetter,
}

/// Maximum number of children generated from each solution of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchingFactor {
    /// Every facility not yet in the solution
    All,
    /// `ceil(log2(n_facilities / size))` children
    Logarithmic,
    Fixed(usize),
}

impl BranchingFactor {
    /// Interpret the classic integer argument: -1 = all, 0 = logarithmic, k = fixed.
    pub fn from_arg(arg: i64) -> Self {
        match arg {
            a if a < 0 => BranchingFactor::All,
            0 => BranchingFactor::Logarithmic,
            a => BranchingFactor::Fixed(a as usize),
        }
    }
}

/// Configuration of a complete solver run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of solutions requested in the output pool
    pub target_sols: usize,
    /// Worker threads used by every parallel phase
    pub n_threads: usize,
    /// Independent restarts of the construction
    pub n_restarts: usize,
    pub seed: u64,
    pub filter: Filter,
    /// Prune partial solutions whose upper bound cannot beat the best value found
    pub branch_and_bound: bool,
    pub branching_factor: BranchingFactor,
    /// Raise the branching factor while the pool is too small to reach the first target
    pub branching_correction: bool,
    pub local_search: LocalSearchKind,
    /// Local search used to walk between solutions during path relinking
    pub local_search_pr: LocalSearchKind,
    pub path_relinking: PathRelinkingMode,
    /// Run local search on each level before selection (otherwise on the selection)
    pub local_search_before_select: bool,
    /// Only keep terminal solutions in the selection
    pub select_only_terminal: bool,
    /// Allow moves that close a facility without opening another
    pub local_search_rem_movement: bool,
    /// Allow moves that open a facility without closing another
    pub local_search_add_movement: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            target_sols: 1,
            n_threads: 4,
            n_restarts: 1,
            seed: 42,
            filter: Filter::default(),
            branch_and_bound: false,
            branching_factor: BranchingFactor::All,
            branching_correction: true,
            local_search: LocalSearchKind::BestImprovement,
            local_search_pr: LocalSearchKind::BestImprovement,
            path_relinking: PathRelinkingMode::Off,
            local_search_before_select: true,
            select_only_terminal: true,
            local_search_rem_movement: true,
            local_search_add_movement: true,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        Ok(())
    }

    /// Whether any configured local search needs the per-client proximity orderings
    pub fn needs_proximity_orderings(&self) -> bool {
        self.local_search == LocalSearchKind::ResendeWerneck
            || (self.path_relinking != PathRelinkingMode::Off
                && self.local_search_pr == LocalSearchKind::ResendeWerneck)
    }
}
