//! Reduction strategy descriptors and their textual nomenclature.
//!
//! A nomenclature reads `[_]abbrev:target[:dissimilarity[:argument]]`, for example
//! `rand1:3000`, `sdbs+:100:pcd` or `_vrh:50:mgemin:80`. A leading underscore moves the
//! strategy from the construction phase to the selection phase.

use crate::dissimilarity::{Dissimilarity, FacilityDistance};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_STRATEGIES: [&str; 3] = ["rand1:3000", "sdbs+:100:pcd", "_best:200"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReductionMethod {
    /// Keep the best solutions
    Bests,
    /// Uniform random sample
    RandomUniform,
    /// Random sample weighted by rank
    RandomRank,
    /// Simple diversity-based starting method, keeping the centroids
    Sdbs,
    /// Simple diversity-based starting method, keeping the best of each cluster
    SdbsBests,
    /// Repeatedly discard the worse solution of the most similar close-in-rank pair
    VisionRange,
}

impl ReductionMethod {
    fn from_abbreviation(abbrev: &str) -> Option<(Self, bool)> {
        match abbrev {
            "best" => Some((ReductionMethod::Bests, false)),
            "rand" => Some((ReductionMethod::RandomUniform, false)),
            "rand1" => Some((ReductionMethod::RandomUniform, true)),
            "rank" => Some((ReductionMethod::RandomRank, false)),
            "rank1" => Some((ReductionMethod::RandomRank, true)),
            "vrh" => Some((ReductionMethod::VisionRange, false)),
            "sdbs" => Some((ReductionMethod::Sdbs, false)),
            "sdbs+" => Some((ReductionMethod::SdbsBests, false)),
            _ => None,
        }
    }

    fn parts_allowed(&self, n_parts: usize) -> bool {
        match self {
            ReductionMethod::Bests | ReductionMethod::RandomUniform | ReductionMethod::RandomRank => n_parts == 2,
            ReductionMethod::VisionRange => n_parts <= 4,
            ReductionMethod::Sdbs | ReductionMethod::SdbsBests => n_parts <= 3,
        }
    }

    pub fn uses_dissimilarity(&self) -> bool {
        !matches!(
            self,
            ReductionMethod::Bests | ReductionMethod::RandomUniform | ReductionMethod::RandomRank
        )
    }
}

/// Stage of the restart in which a strategy is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// On every construction level, before expansion
    Construction,
    /// On the solutions selected at the end of a restart, and during path relinking
    Selection,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Construction => "construction",
            Phase::Selection => "selection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionStrategy {
    pub nomenclature: String,
    pub method: ReductionMethod,
    /// Pool size after the reduction
    pub target: usize,
    pub dissimilarity: Dissimilarity,
    /// Always keep the best solution (random methods only)
    pub elitist: bool,
    /// Vision range, only used by [`ReductionMethod::VisionRange`]
    pub vision_range: Option<usize>,
    pub phase: Phase,
}

impl ReductionStrategy {
    pub fn from_nomenclature(nomenclature: &str) -> Result<Self, ConfigError> {
        let (phase, body) = match nomenclature.strip_prefix('_') {
            Some(rest) => (Phase::Selection, rest),
            None => (Phase::Construction, nomenclature),
        };
        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() < 2 {
            return Err(ConfigError::InvalidReductionFormat(nomenclature.to_string()));
        }
        let target: usize = parts[1]
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidReductionFormat(nomenclature.to_string()))?;

        let (method, elitist) = ReductionMethod::from_abbreviation(parts[0].trim())
            .ok_or_else(|| ConfigError::UnknownReduction(parts[0].to_string()))?;
        if !method.parts_allowed(parts.len()) {
            return Err(ConfigError::InvalidReductionArguments(nomenclature.to_string()));
        }

        let dissimilarity = match parts.get(2) {
            Some(code) => Dissimilarity::from_code(code.trim())?,
            None => Dissimilarity::default(),
        };

        let vision_range = match method {
            ReductionMethod::VisionRange => {
                let range = match parts.get(3) {
                    Some(arg) => arg
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| ConfigError::InvalidReductionArguments(nomenclature.to_string()))?,
                    None => 2 * target,
                };
                if range == 0 {
                    return Err(ConfigError::InvalidReductionArguments(nomenclature.to_string()));
                }
                Some(range)
            }
            _ => None,
        };

        Ok(ReductionStrategy {
            nomenclature: nomenclature.to_string(),
            method,
            target,
            dissimilarity,
            elitist,
            vision_range,
            phase,
        })
    }

    /// Facility distances this strategy needs precomputed, if any
    pub fn required_facility_distance(&self) -> Option<FacilityDistance> {
        if self.method.uses_dissimilarity() {
            self.dissimilarity.facility_distance()
        } else {
            None
        }
    }

    pub fn description(&self) -> String {
        let elitist = if self.elitist { ", elitist" } else { "" };
        match self.method {
            ReductionMethod::Bests => "selecting bests".to_string(),
            ReductionMethod::RandomUniform => format!("randomly (uniform{})", elitist),
            ReductionMethod::RandomRank => format!("randomly (by rank{})", elitist),
            ReductionMethod::Sdbs => format!("simple diversity-based starting method ({})", self.dissimilarity.code()),
            ReductionMethod::SdbsBests => format!(
                "simple diversity-based starting method, bests of clusters ({})",
                self.dissimilarity.code()
            ),
            ReductionMethod::VisionRange => format!(
                "VR heuristic (vision range: {}, {})",
                self.vision_range.unwrap_or(2 * self.target),
                self.dissimilarity.code()
            ),
        }
    }
}

impl fmt::Display for ReductionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nomenclature)
    }
}

/// Parse a list of nomenclatures (the default chain when empty) and check that targets
/// strictly decrease within each phase.
pub fn parse_strategies<S: AsRef<str>>(nomenclatures: &[S]) -> Result<Vec<ReductionStrategy>, ConfigError> {
    let strategies = if nomenclatures.is_empty() {
        DEFAULT_STRATEGIES
            .iter()
            .map(|nom| ReductionStrategy::from_nomenclature(nom))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        nomenclatures
            .iter()
            .map(|nom| ReductionStrategy::from_nomenclature(nom.as_ref()))
            .collect::<Result<Vec<_>, _>>()?
    };
    validate_targets(&strategies)?;
    Ok(strategies)
}

pub fn validate_targets(strategies: &[ReductionStrategy]) -> Result<(), ConfigError> {
    for phase in [Phase::Construction, Phase::Selection] {
        let mut previous: Option<usize> = None;
        for strategy in strategies.iter().filter(|s| s.phase == phase) {
            if let Some(previous) = previous {
                if strategy.target >= previous {
                    return Err(ConfigError::NonDecreasingTargets {
                        phase: phase.name(),
                        previous,
                        next: strategy.target,
                    });
                }
            }
            previous = Some(strategy.target);
        }
    }
    Ok(())
}

/// Distinct facility distance modes needed by a set of strategies
pub fn required_facility_distances(strategies: &[ReductionStrategy]) -> Vec<FacilityDistance> {
    let mut modes: Vec<FacilityDistance> = Vec::new();
    for mode in strategies.iter().filter_map(|s| s.required_facility_distance()) {
        if !modes.contains(&mode) {
            modes.push(mode);
        }
    }
    modes
}

/// Target of the first construction-phase strategy
pub fn first_construction_target(strategies: &[ReductionStrategy]) -> Option<usize> {
    strategies.iter().find(|s| s.phase == Phase::Construction).map(|s| s.target)
}
