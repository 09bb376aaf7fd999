//! Meeting-time conflict detection.
//!
//! Meeting times are half-open intervals `[start, end)`, so a class ending
//! at 10:00 and another starting at 10:00 do not conflict.

use super::types::{MeetingTime, Section};

/// Controls which meetings the section-level check compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConflictPolicy {
    /// Also compare final exam meetings against each other
    pub include_finals: bool,
}

impl ConflictPolicy {
    /// Regular weekly meetings only.
    pub const REGULAR: ConflictPolicy = ConflictPolicy {
        include_finals: false,
    };

    /// Regular meetings plus final exams.
    pub const WITH_FINALS: ConflictPolicy = ConflictPolicy {
        include_finals: true,
    };
}

/// Returns true if two meeting times overlap on a shared weekday.
///
/// A regular meeting never conflicts with a final exam. Two finals held on
/// known, different dates never conflict.
pub fn conflicts(a: &MeetingTime, b: &MeetingTime) -> bool {
    if a.is_final != b.is_final {
        return false;
    }

    if let (Some(date_a), Some(date_b)) = (a.final_date, b.final_date) {
        if date_a != date_b {
            return false;
        }
    }

    a.days.intersects(&b.days) && a.start_time < b.end_time && b.start_time < a.end_time
}

/// Returns true if any regular meeting of `s1` conflicts with any regular
/// meeting of `s2`. Final exams are ignored.
pub fn sections_conflict(s1: &Section, s2: &Section) -> bool {
    sections_conflict_with(s1, s2, ConflictPolicy::REGULAR)
}

/// Section-level conflict check under an explicit policy.
///
/// A section never conflicts with itself, and a section without meetings
/// conflicts with nothing.
pub fn sections_conflict_with(s1: &Section, s2: &Section, policy: ConflictPolicy) -> bool {
    if std::ptr::eq(s1, s2) || (s1.id == s2.id && s1.crn == s2.crn) {
        return false;
    }

    let regular = s1
        .regular_meetings()
        .any(|a| s2.regular_meetings().any(|b| conflicts(a, b)));
    if regular {
        return true;
    }

    policy.include_finals
        && s1
            .final_meetings()
            .any(|a| s2.final_meetings().any(|b| conflicts(a, b)))
}

/// Returns the first section in `chosen` that conflicts with `candidate`.
pub fn first_conflict<'a>(
    candidate: &Section,
    chosen: &[&'a Section],
    policy: ConflictPolicy,
) -> Option<&'a Section> {
    chosen
        .iter()
        .copied()
        .find(|other| sections_conflict_with(candidate, other, policy))
}
