//! Conflict-free class schedule generation.
//!
//! Given the courses a student wants for a term, produces every distinct
//! weekly schedule that takes one section of each course with no two
//! sections meeting at the same time.
//!
//! - **`schedule`**: the engine (conflict detection, filtering, enumeration, keys)
//! - **`db`**: SQLite course catalog feeding the engine
//! - **`server`**: HTTP endpoints over the engine

pub mod db;
pub mod schedule;
pub mod server;
pub mod types;

pub use schedule::{
    GenerationOutcome, Schedule, ScheduleError, ScheduleGenerator, ScheduleKey, ScheduleRequest,
};
