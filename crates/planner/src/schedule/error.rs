//! Error types for schedule generation.

use thiserror::Error;

use super::types::CourseId;

/// Errors that can occur while generating schedules.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScheduleError {
    /// A requested course has no data for the term
    #[error("Unknown course {course_id} for term {term}")]
    UnknownCourse { term: String, course_id: CourseId },

    /// Filter criteria are malformed (empty allowed-set, blank code, bad window)
    #[error("Invalid filter criteria: {message}")]
    InvalidCriteria { message: String },

    /// The request itself is malformed (no courses, duplicated course id)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// A meeting time violates `0 <= start < end <= 1440`
    #[error("Invalid meeting time: {message}")]
    InvalidMeetingTime { message: String },

    /// Enumeration exceeded the caller's search budget
    #[error("Search budget exhausted after {nodes_visited} nodes: {reason}")]
    ResourceExhausted { nodes_visited: u64, reason: String },

    /// Catalog storage failed
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    /// Configuration could not be loaded
    #[error("Config error: {message}")]
    Config { message: String },
}

impl ScheduleError {
    /// Returns true if the caller can fix this error by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScheduleError::UnknownCourse { .. }
                | ScheduleError::InvalidCriteria { .. }
                | ScheduleError::InvalidRequest { .. }
                | ScheduleError::ResourceExhausted { .. }
        )
    }

    /// Returns true if the search was aborted by its budget.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, ScheduleError::ResourceExhausted { .. })
    }
}

impl From<rusqlite::Error> for ScheduleError {
    fn from(err: rusqlite::Error) -> Self {
        ScheduleError::Catalog {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ScheduleError {
    fn from(err: std::io::Error) -> Self {
        ScheduleError::Config {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        ScheduleError::Config {
            message: err.to_string(),
        }
    }
}
