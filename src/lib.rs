//! Facility Location Solver Library
//!
//! A heuristic solver for facility location and maximal-profit clustering problems.
//!
//! # Features
//!
//! - Level-by-level construction of solution pools, one facility at a time
//! - Pool reduction strategies (bests, random, diversity-based SDBS, vision range)
//! - Whitaker's fast exchange and Resende-Werneck's accelerated swap local searches
//! - Branch-and-bound pruning and path relinking between elite solutions
//! - DC_V1, SIMPLE and ORLIB instance formats
//!
//! # Example
//!
//! ```no_run
//! use facloc_solver::config::RunConfig;
//! use facloc_solver::heuristics::find_best_solutions;
//! use facloc_solver::instance::Problem;
//! use facloc_solver::reduction::parse_strategies;
//!
//! // Load instance
//! let problem = Problem::from_file("instance.txt").unwrap();
//!
//! // Default reduction chain
//! let strategies = parse_strategies::<&str>(&[]).unwrap();
//!
//! let result = find_best_solutions(&problem, &RunConfig::default(), &strategies).unwrap();
//! println!("Best value: {:.2}", result.solutions[0].value);
//! ```

pub mod bnb;
pub mod config;
pub mod dissimilarity;
pub mod error;
pub mod expand;
pub mod heuristics;
pub mod instance;
pub mod parallel;
pub mod precomp;
pub mod reduction;
pub mod report;
pub mod shuffle;
pub mod solution;
pub mod statistics;

pub use config::RunConfig;
pub use error::{ConfigError, LoadError};
pub use heuristics::{find_best_solutions, RunResult};
pub use instance::Problem;
pub use report::RunReport;
pub use solution::Solution;
