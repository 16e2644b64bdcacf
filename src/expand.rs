//! Expansion of a pool of same-size solutions into the next construction level.
//!
//! Every parent proposes children with one more facility. Children that would be
//! generated from several parents collapse into one candidate, which is then built and
//! filtered in parallel.

use crate::config::{BranchingFactor, Filter};
use crate::instance::Problem;
use crate::parallel::WorkerPool;
use crate::precomp::RunPrecomp;
use crate::shuffle::Shuffler;
use crate::solution::Solution;
use rand::Rng;

/// Parameters of one expansion step
#[derive(Debug, Clone, Copy)]
pub struct ExpansionParams {
    pub filter: Filter,
    pub branching: BranchingFactor,
    /// When set, the branching factor is raised so that the parents can generate at
    /// least this many children
    pub correction_target: Option<usize>,
}

impl ExpansionParams {
    /// Children to generate per parent, given the size of the parents
    pub fn branching_for(&self, n_facilities: usize, current_size: usize, n_parents: usize) -> usize {
        let available = n_facilities.saturating_sub(current_size);
        let mut branching = match self.branching {
            BranchingFactor::All => available,
            BranchingFactor::Logarithmic if current_size == 0 => available,
            BranchingFactor::Logarithmic => {
                (n_facilities as f64 / current_size as f64).log2().ceil().max(1.0) as usize
            }
            BranchingFactor::Fixed(k) => k,
        };
        if let Some(target) = self.correction_target {
            if n_parents > 0 {
                branching = branching.max(target.div_ceil(n_parents));
            }
        }
        branching.min(available)
    }
}

/// Candidate child: a parent plus one facility, identified by its resulting facility set.
#[derive(Debug)]
struct FutureSolution {
    /// Parent the child will be built from
    origin: usize,
    new_facility: usize,
    hash: u32,
    facilities: Vec<usize>,
    /// Every parent that generates this facility set
    origins: Vec<usize>,
}

impl FutureSolution {
    fn new(origin: usize, parent: &Solution, new_facility: usize) -> Self {
        let mut hash = hash_int(new_facility as u32);
        for &f in &parent.facilities {
            hash ^= hash_int(f as u32);
        }
        let mut facilities = Vec::with_capacity(parent.size() + 1);
        facilities.extend_from_slice(&parent.facilities);
        let pos = facilities.partition_point(|&f| f < new_facility);
        facilities.insert(pos, new_facility);
        FutureSolution {
            origin,
            new_facility,
            hash,
            facilities,
            origins: vec![origin],
        }
    }
}

fn hash_int(x: u32) -> u32 {
    let mut x = x;
    x = ((x >> 16) ^ x).wrapping_mul(0x45d9f3b);
    x = ((x >> 16) ^ x).wrapping_mul(0x45d9f3b);
    (x >> 16) ^ x
}

/// Expand every solution of `pool` by one facility.
///
/// Returns the admitted children. Parents credited with at least one admitted child are
/// marked non-terminal, all the others terminal.
pub fn expand_solutions<R: Rng>(
    problem: &Problem,
    precomp: &RunPrecomp,
    pool: &mut [Solution],
    params: &ExpansionParams,
    rng: &mut R,
    workers: &WorkerPool,
) -> Vec<Solution> {
    if pool.is_empty() {
        return Vec::new();
    }
    let current_size = pool[0].size();
    let n_facilities = problem.n_facilities();
    let branching = params.branching_for(n_facilities, current_size, pool.len());

    let mut records = Vec::with_capacity(pool.len() * branching);
    if branching >= n_facilities.saturating_sub(current_size) {
        for (i, parent) in pool.iter().enumerate() {
            debug_assert_eq!(parent.size(), current_size);
            for f in (0..n_facilities).filter(|&f| !parent.contains(f)) {
                records.push(FutureSolution::new(i, parent, f));
            }
        }
    } else {
        let mut shuffler = Shuffler::from_rng(n_facilities, rng);
        for (i, parent) in pool.iter().enumerate() {
            debug_assert_eq!(parent.size(), current_size);
            shuffler.reshuffle();
            let mut found = 0;
            while found < branching {
                let Some(f) = shuffler.next() else { break };
                if !parent.contains(f) {
                    records.push(FutureSolution::new(i, parent, f));
                    found += 1;
                }
            }
        }
    }
    let n_records = records.len();

    records.sort_by(|a, b| {
        a.hash
            .cmp(&b.hash)
            .then(a.facilities.len().cmp(&b.facilities.len()))
            .then_with(|| a.facilities.cmp(&b.facilities))
    });
    let keep_better_parent = params.filter >= Filter::BetterThanAllParents;
    let mut unique: Vec<FutureSolution> = Vec::with_capacity(records.len());
    for record in records {
        match unique.last_mut() {
            Some(last) if last.hash == record.hash && last.facilities == record.facilities => {
                let is_better = pool[record.origin].value > pool[last.origin].value;
                if keep_better_parent == is_better {
                    last.origin = record.origin;
                    last.new_facility = record.new_facility;
                }
                last.origins.push(record.origin);
            }
            _ => unique.push(record),
        }
    }

    let parents: &[Solution] = &*pool;
    let children: Vec<Option<Solution>> = workers.map_round_robin(unique.len(), |r| {
        let record = &unique[r];
        let parent = &parents[record.origin];
        let mut child = parent.clone();
        child.add(problem, record.new_facility);
        child.terminal = false;
        is_admissible(problem, precomp, params.filter, parent, &child).then_some(child)
    });

    let mut credited = vec![false; pool.len()];
    let mut admitted = Vec::with_capacity(children.len());
    for (record, child) in unique.iter().zip(children) {
        if let Some(child) = child {
            for &origin in &record.origins {
                credited[origin] = true;
            }
            admitted.push(child);
        }
    }
    for (parent, credited) in pool.iter_mut().zip(credited) {
        parent.terminal = !credited;
    }

    log::debug!(
        "Expanded {} solutions of size {} (branching {}): {} candidates, {} distinct, {} admitted",
        pool.len(),
        current_size,
        branching,
        n_records,
        unique.len(),
        admitted.len()
    );
    admitted
}

fn is_admissible(problem: &Problem, precomp: &RunPrecomp, filter: Filter, parent: &Solution, child: &Solution) -> bool {
    match filter {
        Filter::NoFilter => true,
        Filter::BetterThanEmpty => child.value > precomp.empty_value,
        Filter::BetterThanOneParent | Filter::BetterThanAllParents => child.value > parent.value,
        Filter::BetterThanSubsets => child.value > parent.value && !has_improving_removal(problem, child),
    }
}

/// Whether closing some open facility, with its clients moving to their second choice,
/// would increase the value of the solution.
fn has_improving_removal(problem: &Problem, sol: &Solution) -> bool {
    let mut loss = vec![0.0; problem.n_facilities()];
    for c in 0..problem.n_clients() {
        if let Some(f) = sol.assignment[c] {
            let phi2 = sol.client_second_nearest(problem, c);
            loss[f] += problem.assignment_value(Some(f), c) - problem.assignment_value(phi2, c);
        }
    }
    sol.facilities.iter().any(|&f| loss[f] < problem.facility_cost(f))
}
