//! Database module for the term's course catalog (courses, sections, meetings)

mod types;

pub use types::{DbCourse, DbMeeting, DbSection};

use rusqlite::{Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::schedule::codes::format_days;
use crate::schedule::canonical::validate_crn;
use crate::schedule::{Course, CourseId, MeetingTime, ScheduleError, SectionId, SectionSource};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_catalog.sql");

pub struct CatalogDb {
    db: Mutex<Connection>,
}

impl CatalogDb {
    /// Opens (or creates) the catalog at `db_path` and initializes the schema
    pub fn new(db_path: &str) -> Result<Self, ScheduleError> {
        info!("Opening course catalog at {}", db_path);
        Self::from_connection(Connection::open(db_path)?)
    }

    /// Creates a catalog backed by an in-memory database
    pub fn open_in_memory() -> Result<Self, ScheduleError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, ScheduleError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ScheduleError> {
        self.db.lock().map_err(|_| ScheduleError::Catalog {
            message: "catalog connection lock poisoned".to_string(),
        })
    }

    /// Checks if a term already has data in the database
    pub fn term_has_data(&self, term: &str) -> Result<bool, ScheduleError> {
        let db = self.conn()?;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM courses WHERE term = ?",
            [term],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Inserts or replaces a course with all its sections and meetings.
    ///
    /// Course subject, number and name are taken from the first section.
    pub fn insert_course(&self, term: &str, course: &Course) -> Result<(), ScheduleError> {
        let (subj_code, course_code, course_name) = course
            .sections
            .first()
            .map(|s| {
                (
                    s.course_subject.as_str(),
                    s.course_number.as_str(),
                    s.course_name.as_str(),
                )
            })
            .unwrap_or(("", "", ""));
        for section in &course.sections {
            validate_crn(&section.crn)?;
        }

        let mut db = self.conn()?;
        let tx = db.transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO courses (course_id, term, subj_code, course_code, course_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
            (course.id, term, subj_code, course_code, course_name),
        )?;

        for section in &course.sections {
            tx.execute(
                "INSERT OR REPLACE INTO sections (
                    section_id, term, course_id, crn, faculty, campus, honors, class_type,
                    seat_capacity, seat_remaining, waitlist_capacity, waitlist_remaining, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'))",
                (
                    section.id,
                    term,
                    course.id,
                    &section.crn,
                    &section.faculty,
                    &section.campus,
                    section.honors,
                    &section.class_type,
                    section.seat_capacity,
                    section.seat_remaining,
                    section.waitlist_capacity,
                    section.waitlist_remaining,
                ),
            )?;

            // Replace meetings wholesale so re-imports stay idempotent
            tx.execute(
                "DELETE FROM meetings WHERE term = ?1 AND section_id = ?2",
                (term, section.id),
            )?;

            for meeting in &section.meetings {
                tx.execute(
                    "INSERT INTO meetings (
                        term, section_id, meeting_type, days, start_time, end_time,
                        is_final, final_date, building, room, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, datetime('now'))",
                    (
                        term,
                        section.id,
                        &meeting.meeting_type,
                        format_days(meeting.days),
                        meeting.start_time,
                        meeting.end_time,
                        meeting.is_final,
                        meeting.final_date,
                        &meeting.building,
                        &meeting.room,
                    ),
                )?;
            }
        }

        tx.commit()?;
        info!(
            "Stored course {} ({} sections) for term {}",
            course.id,
            course.sections.len(),
            term
        );
        Ok(())
    }

    /// Gets a course with its sections (ordered by section id), or `None`
    /// if the term has no such course
    pub fn get_course(&self, term: &str, course_id: CourseId) -> Result<Option<Course>, ScheduleError> {
        let db = self.conn()?;

        let course = db
            .query_row(
                "SELECT course_id, term, subj_code, course_code, course_name
                 FROM courses WHERE term = ? AND course_id = ?",
                (term, course_id),
                |row| {
                    Ok(DbCourse {
                        course_id: row.get(0)?,
                        term: row.get(1)?,
                        subj_code: row.get(2)?,
                        course_code: row.get(3)?,
                        course_name: row.get(4)?,
                    })
                },
            )
            .optional()?;
        let Some(course) = course else {
            return Ok(None);
        };

        let mut stmt = db.prepare(
            "SELECT section_id, course_id, crn, faculty, campus, honors, class_type,
                    seat_capacity, seat_remaining, waitlist_capacity, waitlist_remaining
             FROM sections
             WHERE term = ? AND course_id = ?
             ORDER BY section_id",
        )?;
        let rows: Vec<DbSection> = stmt
            .query_map((term, course_id), |row| {
                Ok(DbSection {
                    section_id: row.get(0)?,
                    course_id: row.get(1)?,
                    crn: row.get(2)?,
                    faculty: row.get(3)?,
                    campus: row.get(4)?,
                    honors: row.get(5)?,
                    class_type: row.get(6)?,
                    seat_capacity: row.get(7)?,
                    seat_remaining: row.get(8)?,
                    waitlist_capacity: row.get(9)?,
                    waitlist_remaining: row.get(10)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut sections = Vec::with_capacity(rows.len());
        for row in rows {
            let meetings = query_meetings(&db, term, row.section_id)?;
            sections.push(row.into_section(&course, meetings));
        }

        debug!(
            "Loaded course {} for term {} with {} sections",
            course_id,
            term,
            sections.len()
        );
        Ok(Some(Course::new(course.course_id, sections)))
    }

    /// Gets all course ids stored for a term
    pub fn get_course_ids_for_term(&self, term: &str) -> Result<Vec<CourseId>, ScheduleError> {
        let db = self.conn()?;
        let mut stmt =
            db.prepare("SELECT course_id FROM courses WHERE term = ? ORDER BY course_id")?;
        let ids = stmt
            .query_map([term], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<CourseId>>>()?;
        Ok(ids)
    }

    /// Gets all meetings for a specific section
    pub fn get_meetings_for_section(
        &self,
        term: &str,
        section_id: SectionId,
    ) -> Result<Vec<MeetingTime>, ScheduleError> {
        let db = self.conn()?;
        query_meetings(&db, term, section_id)
    }
}

fn query_meetings(
    db: &Connection,
    term: &str,
    section_id: SectionId,
) -> Result<Vec<MeetingTime>, ScheduleError> {
    let mut stmt = db.prepare(
        "SELECT meeting_id, section_id, meeting_type, days, start_time, end_time,
                is_final, final_date, building, room
         FROM meetings
         WHERE term = ? AND section_id = ?
         ORDER BY meeting_id",
    )?;

    let rows = stmt
        .query_map((term, section_id), |row| {
            Ok(DbMeeting {
                meeting_id: row.get(0)?,
                section_id: row.get(1)?,
                meeting_type: row.get(2)?,
                days: row.get(3)?,
                start_time: row.get(4)?,
                end_time: row.get(5)?,
                is_final: row.get(6)?,
                final_date: row.get(7)?,
                building: row.get(8)?,
                room: row.get(9)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(MeetingTime::try_from).collect()
}

impl SectionSource for CatalogDb {
    fn fetch_course(&self, term: &str, course_id: CourseId) -> Result<Option<Course>, ScheduleError> {
        self.get_course(term, course_id)
    }
}
