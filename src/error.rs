//! Error types for configuration and instance loading.

use thiserror::Error;

/// Errors detected while validating the run configuration, before any search starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid reduction format \"{0}\"")]
    InvalidReductionFormat(String),

    #[error("invalid reduction name \"{0}\"")]
    UnknownReduction(String),

    #[error("invalid reduction arguments \"{0}\"")]
    InvalidReductionArguments(String),

    #[error("invalid dissimilitude abbreviation \"{0}\"")]
    UnknownDissimilarity(String),

    #[error("reduction targets must decrease within the {phase} phase ({previous} -> {next})")]
    NonDecreasingTargets {
        phase: &'static str,
        previous: usize,
        next: usize,
    },

    #[error("invalid filter level {0} (expected 0..=4)")]
    InvalidFilter(u8),

    #[error("the number of threads must be at least 1")]
    NoThreads,

    #[error("failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors raised while reading a problem file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read instance file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of file, {0} expected")]
    UnexpectedEof(String),

    #[error("invalid {what}: \"{token}\"")]
    InvalidToken { what: String, token: String },

    #[error("{0}")]
    Malformed(String),
}
