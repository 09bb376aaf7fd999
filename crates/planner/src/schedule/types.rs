//! Core types for schedule generation
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::canonical::schedule_key;
use super::codes::{format_days, parse_days};
use super::error::ScheduleError;

/// Numeric course identifier, as issued by the catalog.
pub type CourseId = i64;

/// Numeric section identifier, stable within a term.
pub type SectionId = i64;

/// Minutes in a day; the upper bound for meeting end times.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Weekdays in bit order, Sunday is bit 0.
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Set of weekdays stored as a bitmask, one bit per day (Sun..Sat).
///
/// Serializes as a day pattern string such as `"MWF"` or `"TuTh"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DaySet(u8);

impl DaySet {
    pub const EMPTY: DaySet = DaySet(0);

    /// Builds a set from any collection of weekdays.
    pub fn from_days<I: IntoIterator<Item = Weekday>>(days: I) -> Self {
        days.into_iter()
            .fold(DaySet::EMPTY, |set, day| set.with(day))
    }

    /// Returns a copy of this set with `day` added.
    pub fn with(self, day: Weekday) -> Self {
        DaySet(self.0 | Self::bit(day))
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    /// Returns true if both sets share at least one weekday.
    pub fn intersects(&self, other: &DaySet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the contained weekdays from Sunday to Saturday.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.into_iter().filter(move |day| self.contains(*day))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_sunday()
    }
}

impl TryFrom<String> for DaySet {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_days(&value)
    }
}

impl From<DaySet> for String {
    fn from(value: DaySet) -> Self {
        format_days(value)
    }
}

impl std::fmt::Display for DaySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_days(*self))
    }
}

/// One contiguous weekly occurrence of a section, or a final exam block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingTime {
    pub days: DaySet,
    /// Minutes since midnight
    pub start_time: u16,
    /// Minutes since midnight, exclusive
    pub end_time: u16,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl MeetingTime {
    /// Creates a regular weekly meeting.
    pub fn new(days: DaySet, start_time: u16, end_time: u16) -> Result<Self, ScheduleError> {
        let meeting = Self {
            days,
            start_time,
            end_time,
            is_final: false,
            final_date: None,
            meeting_type: None,
            building: None,
            room: None,
        };
        meeting.validate()?;
        Ok(meeting)
    }

    /// Creates a final exam meeting held on `date`.
    pub fn final_exam(
        date: NaiveDate,
        start_time: u16,
        end_time: u16,
    ) -> Result<Self, ScheduleError> {
        use chrono::Datelike;

        let meeting = Self {
            days: DaySet::from_days([date.weekday()]),
            start_time,
            end_time,
            is_final: true,
            final_date: Some(date),
            meeting_type: Some("FI".to_string()),
            building: None,
            room: None,
        };
        meeting.validate()?;
        Ok(meeting)
    }

    /// Checks the time bounds and the final/final_date pairing.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_time >= self.end_time || self.end_time > MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidMeetingTime {
                message: format!(
                    "expected 0 <= start < end <= {}, got {}..{}",
                    MINUTES_PER_DAY, self.start_time, self.end_time
                ),
            });
        }

        if !self.is_final && self.final_date.is_some() {
            return Err(ScheduleError::InvalidMeetingTime {
                message: "final_date set on a regular meeting".to_string(),
            });
        }

        Ok(())
    }
}

/// One offering of a course. Read-only snapshot from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    /// Registrar reference code, unique within a term
    pub crn: String,
    #[serde(default)]
    pub faculty: String,
    pub campus: String,
    #[serde(default)]
    pub honors: bool,
    pub class_type: String,
    #[serde(default)]
    pub seat_capacity: i32,
    #[serde(default)]
    pub seat_remaining: i32,
    #[serde(default)]
    pub waitlist_capacity: i32,
    #[serde(default)]
    pub waitlist_remaining: i32,
    pub course_name: String,
    pub course_subject: String,
    pub course_number: String,
    #[serde(default)]
    pub meetings: Vec<MeetingTime>,
}

impl Section {
    /// Regular weekly meetings, skipping final exams.
    pub fn regular_meetings(&self) -> impl Iterator<Item = &MeetingTime> {
        self.meetings.iter().filter(|m| !m.is_final)
    }

    /// Final exam meetings only.
    pub fn final_meetings(&self) -> impl Iterator<Item = &MeetingTime> {
        self.meetings.iter().filter(|m| m.is_final)
    }

    /// `SUBJ NUM`, e.g. `CSE 100`.
    pub fn course_code(&self) -> String {
        format!("{} {}", self.course_subject, self.course_number)
    }

    pub fn is_full(&self) -> bool {
        self.seat_remaining <= 0
    }
}

/// A course as seen by the engine: its id plus the term's sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub sections: Vec<Section>,
}

impl Course {
    pub fn new(id: CourseId, sections: Vec<Section>) -> Self {
        Self { id, sections }
    }
}

/// Canonical identity of a schedule: its sorted CRNs joined with `|`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleKey(pub(crate) String);

impl ScheduleKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One section per requested course, pairwise conflict-free.
///
/// Sections are kept in course request order; the key is precomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub key: ScheduleKey,
    pub sections: Vec<Section>,
}

impl Schedule {
    pub fn from_sections(sections: Vec<Section>) -> Self {
        let key = schedule_key(&sections);
        Self { key, sections }
    }

    pub fn crns(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.crn.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_set_bits() {
        let mwf = DaySet::from_days([Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        assert_eq!(mwf.len(), 3);
        assert!(mwf.contains(Weekday::Wed));
        assert!(!mwf.contains(Weekday::Tue));
        assert_eq!(mwf.bits(), 0b0010_1010);

        let tuth = DaySet::from_days([Weekday::Tue, Weekday::Thu]);
        assert!(!mwf.intersects(&tuth));
        assert!(mwf.intersects(&DaySet::from_days([Weekday::Fri])));
        assert!(DaySet::EMPTY.is_empty());
        assert_eq!(
            mwf.iter().collect::<Vec<_>>(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
    }

    #[test]
    fn test_meeting_time_bounds() {
        let mon = DaySet::from_days([Weekday::Mon]);
        assert!(MeetingTime::new(mon, 0, MINUTES_PER_DAY).is_ok());
        assert!(MeetingTime::new(mon, 600, 600).is_err());
        assert!(MeetingTime::new(mon, 700, 600).is_err());
        assert!(MeetingTime::new(mon, 0, MINUTES_PER_DAY + 1).is_err());
    }

    #[test]
    fn test_final_exam_days_from_date() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 9).unwrap();
        let exam = MeetingTime::final_exam(date, 480, 659).unwrap();
        assert!(exam.is_final);
        assert_eq!(exam.days, DaySet::from_days([Weekday::Mon]));

        let mut bogus = MeetingTime::new(exam.days, 480, 659).unwrap();
        bogus.final_date = Some(date);
        assert!(bogus.validate().is_err());
    }

    #[test]
    fn test_meeting_time_json_shape() {
        let json = serde_json::json!({
            "days": "TuTh",
            "start_time": 660,
            "end_time": 740,
        });
        let meeting: MeetingTime = serde_json::from_value(json).unwrap();
        assert_eq!(
            meeting.days,
            DaySet::from_days([Weekday::Tue, Weekday::Thu])
        );
        assert!(!meeting.is_final);

        let back = serde_json::to_value(&meeting).unwrap();
        assert_eq!(back["days"], "TuTh");
        assert_eq!(back["final"], false);
    }
}
