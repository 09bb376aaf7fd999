//! Backtracking search over one candidate list per course.
//!
//! Courses are visited in request order and candidates in their given order,
//! so output order is deterministic. Each candidate is checked against every
//! section already chosen before descending, which prunes conflicting
//! prefixes instead of building the full cross product. Complete schedules
//! are deduplicated by key as they are found, so result limits count distinct
//! schedules only.

use serde::Serialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::debug;

use super::canonical::key_from_crns;
use super::conflict::{first_conflict, ConflictPolicy};
use super::error::ScheduleError;
use super::types::{Schedule, ScheduleKey, Section};

// Deadline is polled every this many nodes.
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// Caller-imposed ceiling on a single enumeration.
///
/// Exceeding any limit aborts with `ResourceExhausted`; results are never
/// truncated. Below the ceiling the output matches an unbounded search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    /// Maximum candidate placements attempted
    pub max_nodes: Option<u64>,
    /// Maximum distinct schedules produced
    pub max_results: Option<usize>,
    /// Wall-clock limit for the search
    pub time_limit: Option<Duration>,
}

impl SearchBudget {
    pub const UNLIMITED: SearchBudget = SearchBudget {
        max_nodes: None,
        max_results: None,
        time_limit: None,
    };

    pub fn is_unlimited(&self) -> bool {
        *self == Self::UNLIMITED
    }
}

/// Counters describing a finished search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Candidate placements attempted
    pub nodes_visited: u64,
    /// Complete schedules reached, duplicates included
    pub schedules_found: usize,
    /// Schedules dropped as duplicates
    pub duplicates_removed: usize,
}

/// Enumerates every conflict-free choice of one section per course.
///
/// Uses the regular-meeting conflict policy and no budget.
pub fn generate_schedules(candidates: &[Vec<Section>]) -> Vec<Schedule> {
    // an unlimited budget never aborts
    generate_schedules_within(candidates, ConflictPolicy::REGULAR, SearchBudget::UNLIMITED)
        .map(|(schedules, _)| schedules)
        .unwrap_or_default()
}

/// Enumerates schedules under an explicit conflict policy and budget.
///
/// A course with no candidates makes the result empty. Schedules list their
/// sections in course order; only the first schedule per key is kept.
pub fn generate_schedules_within(
    candidates: &[Vec<Section>],
    policy: ConflictPolicy,
    budget: SearchBudget,
) -> Result<(Vec<Schedule>, SearchStats), ScheduleError> {
    if candidates.iter().any(|c| c.is_empty()) {
        return Ok((Vec::new(), SearchStats::default()));
    }

    let start = Instant::now();
    let mut search = Search {
        candidates,
        policy,
        budget,
        deadline: budget.time_limit.map(|limit| start + limit),
        partial: Vec::with_capacity(candidates.len()),
        results: Vec::new(),
        seen: HashSet::new(),
        found: 0,
        nodes: 0,
    };
    search.descend(0)?;

    debug!(
        courses = candidates.len(),
        nodes_visited = search.nodes,
        schedules = search.results.len(),
        duplicates = search.found - search.results.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Schedule enumeration finished"
    );

    let stats = SearchStats {
        nodes_visited: search.nodes,
        schedules_found: search.found,
        duplicates_removed: search.found - search.results.len(),
    };
    Ok((search.results, stats))
}

struct Search<'a> {
    candidates: &'a [Vec<Section>],
    policy: ConflictPolicy,
    budget: SearchBudget,
    deadline: Option<Instant>,
    /// Sections chosen so far, one per visited course
    partial: Vec<&'a Section>,
    results: Vec<Schedule>,
    seen: HashSet<ScheduleKey>,
    /// Complete schedules reached, duplicates included
    found: usize,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn descend(&mut self, depth: usize) -> Result<(), ScheduleError> {
        if depth == self.candidates.len() {
            return self.emit();
        }

        let candidates = self.candidates;
        for candidate in &candidates[depth] {
            self.visit_node()?;

            if first_conflict(candidate, &self.partial, self.policy).is_some() {
                continue;
            }

            self.partial.push(candidate);
            let result = self.descend(depth + 1);
            self.partial.pop();
            result?;
        }

        Ok(())
    }

    fn visit_node(&mut self) -> Result<(), ScheduleError> {
        self.nodes += 1;

        if let Some(max_nodes) = self.budget.max_nodes {
            if self.nodes > max_nodes {
                return Err(self.exhausted(format!("node limit {} reached", max_nodes)));
            }
        }

        if let Some(deadline) = self.deadline {
            if self.nodes % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                let limit = self.budget.time_limit.unwrap_or_default();
                return Err(self.exhausted(format!(
                    "time limit of {}ms reached",
                    limit.as_millis()
                )));
            }
        }

        Ok(())
    }

    fn emit(&mut self) -> Result<(), ScheduleError> {
        self.found += 1;
        let key = key_from_crns(self.partial.iter().map(|s| s.crn.as_str()));
        if self.seen.contains(&key) {
            return Ok(());
        }

        if let Some(max_results) = self.budget.max_results {
            if self.results.len() >= max_results {
                return Err(self.exhausted(format!(
                    "more than {} schedules match",
                    max_results
                )));
            }
        }

        let sections = self.partial.iter().map(|s| (*s).clone()).collect();
        self.seen.insert(key.clone());
        self.results.push(Schedule { key, sections });
        Ok(())
    }

    fn exhausted(&self, reason: String) -> ScheduleError {
        ScheduleError::ResourceExhausted {
            nodes_visited: self.nodes,
            reason,
        }
    }
}
