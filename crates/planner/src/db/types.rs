//! Database row types for the course catalog
use chrono::NaiveDate;

use crate::schedule::codes::parse_days;
use crate::schedule::{CourseId, MeetingTime, ScheduleError, Section, SectionId};

#[derive(Debug, Clone)]
pub struct DbCourse {
    pub course_id: CourseId,
    pub term: String,
    pub subj_code: String,
    pub course_code: String,
    pub course_name: String,
}

#[derive(Debug, Clone)]
pub struct DbSection {
    pub section_id: SectionId,
    pub course_id: CourseId,
    pub crn: String,
    pub faculty: String,
    pub campus: String,
    pub honors: bool,
    pub class_type: String,
    pub seat_capacity: i32,
    pub seat_remaining: i32,
    pub waitlist_capacity: i32,
    pub waitlist_remaining: i32,
}

#[derive(Debug, Clone)]
pub struct DbMeeting {
    pub meeting_id: i64,
    pub section_id: SectionId,
    pub meeting_type: Option<String>,
    pub days: String, // e.g. "MWF"
    pub start_time: i64,
    pub end_time: i64,
    pub is_final: bool,
    pub final_date: Option<NaiveDate>,
    pub building: Option<String>,
    pub room: Option<String>,
}

impl DbSection {
    /// Joins the row with its course and meetings into an engine section.
    pub fn into_section(self, course: &DbCourse, meetings: Vec<MeetingTime>) -> Section {
        Section {
            id: self.section_id,
            crn: self.crn,
            faculty: self.faculty,
            campus: self.campus,
            honors: self.honors,
            class_type: self.class_type,
            seat_capacity: self.seat_capacity,
            seat_remaining: self.seat_remaining,
            waitlist_capacity: self.waitlist_capacity,
            waitlist_remaining: self.waitlist_remaining,
            course_name: course.course_name.clone(),
            course_subject: course.subj_code.clone(),
            course_number: course.course_code.clone(),
            meetings,
        }
    }
}

impl TryFrom<DbMeeting> for MeetingTime {
    type Error = ScheduleError;

    fn try_from(row: DbMeeting) -> Result<Self, Self::Error> {
        let minutes = |value: i64| {
            u16::try_from(value).map_err(|_| ScheduleError::InvalidMeetingTime {
                message: format!("meeting {} has time {} out of range", row.meeting_id, value),
            })
        };

        let meeting = MeetingTime {
            days: parse_days(&row.days)?,
            start_time: minutes(row.start_time)?,
            end_time: minutes(row.end_time)?,
            is_final: row.is_final,
            final_date: row.final_date,
            meeting_type: row.meeting_type.clone(),
            building: row.building.clone(),
            room: row.room.clone(),
        };
        meeting.validate()?;
        Ok(meeting)
    }
}
