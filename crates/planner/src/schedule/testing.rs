//! Fixture builders shared by the unit tests.

use super::codes::parse_days;
use super::types::{MeetingTime, Section};

/// Builds a lecture section on the main campus with open seats.
///
/// Meetings are `(days, start, end)` triples, e.g. `("MWF", 540, 590)`.
pub fn section(id: i64, crn: &str, meetings: &[(&str, u16, u16)]) -> Section {
    Section {
        id,
        crn: crn.to_string(),
        faculty: "Staff".to_string(),
        campus: "MAIN".to_string(),
        honors: false,
        class_type: "LE".to_string(),
        seat_capacity: 30,
        seat_remaining: 10,
        waitlist_capacity: 5,
        waitlist_remaining: 5,
        course_name: "Test Course".to_string(),
        course_subject: "TST".to_string(),
        course_number: "100".to_string(),
        meetings: meetings
            .iter()
            .map(|(days, start, end)| {
                MeetingTime::new(parse_days(days).unwrap(), *start, *end).unwrap()
            })
            .collect(),
    }
}

/// Converts `h:mm` clock times to minutes since midnight.
pub fn at(hour: u16, minute: u16) -> u16 {
    hour * 60 + minute
}
