//! Module for parsing and representing facility location problems.
//!
//! A problem is a set of facilities (each with an opening cost) and a set of weighted
//! clients, together with a facility-client distance matrix. Three text formats are
//! supported and detected from the first token of the file:
//!
//! - `DC_V1`: full format with transport cost, client gain, unassigned cost and size range.
//! - `SIMPLE` (first token `FILE:`): one line per facility with its cost and distances.
//! - `ORLIB`: uncapacitated OR-Library files (capacities are ignored).

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A facility location problem: the cost model queried by the whole search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Name of the problem (file stem when loaded from disk)
    pub name: String,
    /// Weight of each client
    pub client_weight: Vec<f64>,
    /// Opening cost of each facility
    pub facility_cost: Vec<f64>,
    /// Distance matrix, indexed as `distance[facility][client]`
    #[serde(skip)]
    pub distance: Vec<Vec<f64>>,
    /// Cost of transporting one unit of weight along one unit of distance
    pub transport_cost: f64,
    /// Amount gained for reaching one unit of weight
    pub client_gain: f64,
    /// Cost of leaving one unit of weight unassigned (usually 0 or infinity)
    pub unassigned_cost: f64,
    /// Minimum number of open facilities in a returned solution
    pub size_restriction_minimum: Option<usize>,
    /// Maximum number of open facilities in a returned solution
    pub size_restriction_maximum: Option<usize>,
}

impl Problem {
    /// Create a problem with zero costs, unit weights and zero distances.
    pub fn new(n_facilities: usize, n_clients: usize) -> Self {
        Problem {
            name: String::new(),
            client_weight: vec![1.0; n_clients],
            facility_cost: vec![0.0; n_facilities],
            distance: vec![vec![0.0; n_clients]; n_facilities],
            transport_cost: 1.0,
            client_gain: 0.0,
            unassigned_cost: f64::INFINITY,
            size_restriction_minimum: None,
            size_restriction_maximum: None,
        }
    }

    /// Create a problem from facility costs and a `distance[facility][client]` matrix,
    /// keeping the default transport cost, gain and unassigned cost.
    pub fn from_distances(facility_cost: Vec<f64>, distance: Vec<Vec<f64>>) -> Self {
        let n_clients = distance.first().map_or(0, |row| row.len());
        let mut problem = Problem::new(facility_cost.len(), n_clients);
        problem.facility_cost = facility_cost;
        problem.distance = distance;
        problem
    }

    #[inline]
    pub fn n_facilities(&self) -> usize {
        self.facility_cost.len()
    }

    #[inline]
    pub fn n_clients(&self) -> usize {
        self.client_weight.len()
    }

    /// Value of assigning `client` to `facility` (`None` means leaving it unassigned).
    #[inline]
    pub fn assignment_value(&self, facility: Option<usize>, client: usize) -> f64 {
        let weight = self.client_weight[client];
        match facility {
            Some(f) => weight * (self.client_gain - self.transport_cost * self.distance[f][client]),
            None => weight * (-self.unassigned_cost),
        }
    }

    #[inline]
    pub fn facility_cost(&self, facility: usize) -> f64 {
        self.facility_cost[facility]
    }

    /// Whether a solution of the given size may be part of the output.
    pub fn size_allowed(&self, size: usize) -> bool {
        self.size_restriction_minimum.map_or(true, |min| size >= min)
            && self.size_restriction_maximum.map_or(true, |max| size <= max)
    }

    /// Parse a problem file, detecting its format from the first token.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let content = fs::read_to_string(&path)?;
        let mut problem = Self::parse(&content)?;
        problem.name = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(problem)
    }

    /// Parse a problem from the textual content of a file.
    pub fn parse(content: &str) -> Result<Self, LoadError> {
        let mut tokens = Tokens::new(content);
        match tokens.peek() {
            Some("DC_V1") => {
                log::info!("DC_V1 format identified.");
                parse_dc_v1(&mut tokens)
            }
            Some("FILE:") => {
                log::info!("SIMPLE format identified.");
                parse_simple(&mut tokens)
            }
            Some(_) => {
                log::info!("ORLIB format identified.");
                parse_orlib(&mut tokens)
            }
            None => Err(LoadError::UnexpectedEof("first token".to_string())),
        }
    }

    /// Get summary statistics for this problem
    pub fn statistics(&self) -> ProblemStatistics {
        let n_pairs = self.n_facilities() * self.n_clients();
        let (sum_distance, max_distance) = self
            .distance
            .iter()
            .flatten()
            .fold((0.0, 0.0_f64), |(sum, max), &d| (sum + d, max.max(d)));
        let avg_distance = if n_pairs > 0 { sum_distance / n_pairs as f64 } else { 0.0 };
        let avg_facility_cost = if self.n_facilities() > 0 {
            self.facility_cost.iter().sum::<f64>() / self.n_facilities() as f64
        } else {
            0.0
        };

        ProblemStatistics {
            name: self.name.clone(),
            n_facilities: self.n_facilities(),
            n_clients: self.n_clients(),
            total_client_weight: self.client_weight.iter().sum(),
            avg_facility_cost,
            avg_distance,
            max_distance,
            transport_cost: self.transport_cost,
            client_gain: self.client_gain,
            unassigned_cost: self.unassigned_cost,
            size_restriction_minimum: self.size_restriction_minimum,
            size_restriction_maximum: self.size_restriction_maximum,
        }
    }
}

fn parse_dc_v1(tokens: &mut Tokens) -> Result<Problem, LoadError> {
    tokens.expect("DC_V1")?;
    let transport_cost: f64 = tokens.next_value("transport cost")?;
    let client_gain: f64 = tokens.next_value("client gain")?;
    let unassigned_cost: f64 = tokens.next_value("unassigned cost")?;
    let minimum: i64 = tokens.next_value("minimum size restriction")?;
    let maximum: i64 = tokens.next_value("maximum size restriction")?;
    let n_facilities: usize = tokens.next_value("number of facilities")?;
    let n_clients: usize = tokens.next_value("number of clients")?;

    let mut problem = Problem::new(n_facilities, n_clients);
    problem.transport_cost = transport_cost;
    problem.client_gain = client_gain;
    problem.unassigned_cost = unassigned_cost;
    problem.size_restriction_minimum = usize::try_from(minimum).ok();
    problem.size_restriction_maximum = usize::try_from(maximum).ok();

    for f in 0..n_facilities {
        problem.facility_cost[f] = tokens.next_value(&format!("facility {} cost", f))?;
    }
    for c in 0..n_clients {
        problem.client_weight[c] = tokens.next_value(&format!("client {} weight", c))?;
        for f in 0..n_facilities {
            problem.distance[f][c] =
                tokens.next_value(&format!("distance from facility {} to client {}", f, c))?;
        }
    }
    Ok(problem)
}

fn parse_simple(tokens: &mut Tokens) -> Result<Problem, LoadError> {
    tokens.expect("FILE:")?;
    let _file_name = tokens.next_token("file name")?;
    let n_facilities: usize = tokens.next_value("number of facilities")?;
    let n_clients: usize = tokens.next_value("number of clients")?;
    let size_restriction: usize = tokens.next_value("size restriction")?;

    let mut problem = Problem::new(n_facilities, n_clients);
    if size_restriction > 0 {
        problem.size_restriction_minimum = Some(size_restriction);
        problem.size_restriction_maximum = Some(size_restriction);
    }

    for f in 0..n_facilities {
        let index: usize = tokens.next_value("facility index")?;
        if index != f + 1 {
            return Err(LoadError::Malformed(format!(
                "facility {} found where facility {} was expected",
                index,
                f + 1
            )));
        }
        problem.facility_cost[f] = tokens.next_value(&format!("facility {} cost", f))?;
        for c in 0..n_clients {
            problem.distance[f][c] =
                tokens.next_value(&format!("distance from facility {} to client {}", f, c))?;
        }
    }
    Ok(problem)
}

fn parse_orlib(tokens: &mut Tokens) -> Result<Problem, LoadError> {
    let n_facilities: usize = tokens.next_value("number of facilities")?;
    let n_clients: usize = tokens.next_value("number of clients")?;
    let mut problem = Problem::new(n_facilities, n_clients);

    let mut warned_capacity = false;
    for f in 0..n_facilities {
        let capacity_token = tokens.next_token("facility capacity")?;
        if capacity_token != "capacity" {
            let capacity: f64 = parse_token(capacity_token, "facility capacity")?;
            if capacity != 0.0 && !warned_capacity {
                log::warn!("Facility capacity is {} (not 0), ignoring capacities.", capacity);
                warned_capacity = true;
            }
        }
        problem.facility_cost[f] = tokens.next_value(&format!("facility {} cost", f))?;
    }

    let mut all_demands_zero = true;
    for c in 0..n_clients {
        let demand: f64 = tokens.next_value(&format!("client {} demand", c))?;
        if demand != 0.0 {
            all_demands_zero = false;
        }
        problem.client_weight[c] = demand;
        for f in 0..n_facilities {
            let cost: f64 =
                tokens.next_value(&format!("cost from facility {} to client {}", f, c))?;
            problem.distance[f][c] = if demand == 0.0 { cost } else { cost / demand };
        }
    }
    if all_demands_zero {
        problem.client_weight.iter_mut().for_each(|w| *w = 1.0);
    }
    Ok(problem)
}

fn parse_token<T: FromStr>(token: &str, what: &str) -> Result<T, LoadError> {
    token.parse().map_err(|_| LoadError::InvalidToken {
        what: what.to_string(),
        token: token.to_string(),
    })
}

/// Whitespace separated token reader
struct Tokens<'a> {
    inner: std::iter::Peekable<std::str::SplitWhitespace<'a>>,
}

impl<'a> Tokens<'a> {
    fn new(content: &'a str) -> Self {
        Tokens { inner: content.split_whitespace().peekable() }
    }

    fn peek(&mut self) -> Option<&'a str> {
        self.inner.peek().copied()
    }

    fn next_token(&mut self, what: &str) -> Result<&'a str, LoadError> {
        self.inner.next().ok_or_else(|| LoadError::UnexpectedEof(what.to_string()))
    }

    fn next_value<T: FromStr>(&mut self, what: &str) -> Result<T, LoadError> {
        let token = self.next_token(what)?;
        parse_token(token, what)
    }

    fn expect(&mut self, keyword: &str) -> Result<(), LoadError> {
        let token = self.next_token(keyword)?;
        if token == keyword {
            Ok(())
        } else {
            Err(LoadError::InvalidToken { what: keyword.to_string(), token: token.to_string() })
        }
    }
}

/// Statistics about a problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemStatistics {
    pub name: String,
    pub n_facilities: usize,
    pub n_clients: usize,
    pub total_client_weight: f64,
    pub avg_facility_cost: f64,
    pub avg_distance: f64,
    pub max_distance: f64,
    pub transport_cost: f64,
    pub client_gain: f64,
    pub unassigned_cost: f64,
    pub size_restriction_minimum: Option<usize>,
    pub size_restriction_maximum: Option<usize>,
}

impl std::fmt::Display for ProblemStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "== PROBLEM ==")?;
        writeln!(f, "# NAME: {}", self.name)?;
        writeln!(f, "# N_FACILITIES: {}", self.n_facilities)?;
        writeln!(f, "# N_CLIENTS: {}", self.n_clients)?;
        writeln!(f, "# TOTAL_CLIENT_WEIGHT: {:.3}", self.total_client_weight)?;
        writeln!(f, "# AVG_FACILITY_COST: {:.3}", self.avg_facility_cost)?;
        writeln!(f, "# AVG_DISTANCE: {:.3}", self.avg_distance)?;
        writeln!(f, "# MAX_DISTANCE: {:.3}", self.max_distance)?;
        writeln!(f, "# TRANSPORT_COST: {}", self.transport_cost)?;
        writeln!(f, "# CLIENT_GAIN: {}", self.client_gain)?;
        writeln!(f, "# UNASSIGNED_COST: {}", self.unassigned_cost)?;
        writeln!(f, "# SIZE_RESTRICTION_MINIMUM: {}", fmt_restriction(self.size_restriction_minimum))?;
        write!(f, "# SIZE_RESTRICTION_MAXIMUM: {}", fmt_restriction(self.size_restriction_maximum))
    }
}

fn fmt_restriction(restriction: Option<usize>) -> String {
    restriction.map_or_else(|| "-1".to_string(), |v| v.to_string())
}
