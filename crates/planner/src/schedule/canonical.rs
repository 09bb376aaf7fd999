//! Schedule identity and duplicate suppression.

use std::collections::HashSet;

use super::error::ScheduleError;
use super::types::{Schedule, ScheduleKey, Section};

/// Delimiter placed between CRNs in a schedule key.
pub const KEY_DELIMITER: char = '|';

/// Builds the canonical key for a set of sections: CRNs sorted
/// lexicographically and joined with `|`. Section order does not matter.
pub fn schedule_key(sections: &[Section]) -> ScheduleKey {
    key_from_crns(sections.iter().map(|s| s.crn.as_str()))
}

pub(crate) fn key_from_crns<'a, I>(crns: I) -> ScheduleKey
where
    I: IntoIterator<Item = &'a str>,
{
    let mut crns: Vec<&str> = crns.into_iter().collect();
    crns.sort_unstable();

    let mut key = String::with_capacity(crns.iter().map(|c| c.len() + 1).sum());
    for (i, crn) in crns.iter().enumerate() {
        if i > 0 {
            key.push(KEY_DELIMITER);
        }
        key.push_str(crn);
    }
    ScheduleKey(key)
}

/// Rejects CRNs that would make keys ambiguous: empty, or containing
/// the key delimiter.
pub fn validate_crn(crn: &str) -> Result<(), ScheduleError> {
    if crn.is_empty() || crn.contains(KEY_DELIMITER) {
        return Err(ScheduleError::Catalog {
            message: format!(
                "invalid crn {:?}: must be non-empty and not contain '{}'",
                crn, KEY_DELIMITER
            ),
        });
    }
    Ok(())
}

/// Drops schedules whose key was already seen, keeping the first occurrence.
pub fn dedupe(schedules: Vec<Schedule>) -> Vec<Schedule> {
    let mut seen = HashSet::with_capacity(schedules.len());
    schedules
        .into_iter()
        .filter(|schedule| seen.insert(schedule.key.clone()))
        .collect()
}
