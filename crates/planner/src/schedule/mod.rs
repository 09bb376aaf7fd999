//! Schedule generation engine.
//!
//! Turns a list of requested courses into every distinct, conflict-free
//! weekly schedule built from one section per course:
//! 1. Validate the request and its filter criteria
//! 2. Fetch every course from the catalog (unknown ids fail before any search)
//! 3. Narrow each course's sections through the filter pipeline
//! 4. Backtrack over the candidate lists, pruning on conflicts and dropping
//!    duplicate schedules by their canonical key

pub mod canonical;
pub mod codes;
pub mod config;
pub mod conflict;
pub mod enumerate;
pub mod error;
pub mod filter;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use canonical::{dedupe, schedule_key, validate_crn};
pub use config::PlannerConfig;
pub use conflict::{conflicts, sections_conflict, sections_conflict_with, ConflictPolicy};
pub use enumerate::{generate_schedules, generate_schedules_within, SearchBudget, SearchStats};
pub use error::ScheduleError;
pub use filter::{filter_sections, FilterCriteria, FilterPipeline, SectionFilter, TimeWindow};
pub use types::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Supplies a term's sections for a course, already joined with meetings.
pub trait SectionSource {
    /// Returns `Ok(None)` when the course does not exist for the term.
    fn fetch_course(&self, term: &str, course_id: CourseId) -> Result<Option<Course>, ScheduleError>;
}

impl<T: SectionSource + ?Sized> SectionSource for &T {
    fn fetch_course(&self, term: &str, course_id: CourseId) -> Result<Option<Course>, ScheduleError> {
        (**self).fetch_course(term, course_id)
    }
}

impl<T: SectionSource + ?Sized> SectionSource for Arc<T> {
    fn fetch_course(&self, term: &str, course_id: CourseId) -> Result<Option<Course>, ScheduleError> {
        (**self).fetch_course(term, course_id)
    }
}

/// Catalog held in memory, keyed by term then course id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    terms: HashMap<String, HashMap<CourseId, Course>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a course for a term.
    pub fn insert(&mut self, term: &str, course: Course) {
        self.terms
            .entry(term.to_string())
            .or_default()
            .insert(course.id, course);
    }

    pub fn with_course(mut self, term: &str, course: Course) -> Self {
        self.insert(term, course);
        self
    }
}

impl SectionSource for InMemoryCatalog {
    fn fetch_course(&self, term: &str, course_id: CourseId) -> Result<Option<Course>, ScheduleError> {
        Ok(self
            .terms
            .get(term)
            .and_then(|courses| courses.get(&course_id))
            .cloned())
    }
}

/// A student's request: which courses, for which term, under which filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub term: String,
    pub course_ids: Vec<CourseId>,
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
}

impl ScheduleRequest {
    pub fn new(term: impl Into<String>, course_ids: Vec<CourseId>) -> Self {
        Self {
            term: term.into(),
            course_ids,
            ..Default::default()
        }
    }

    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }
}

/// How one requested course fared in the filter stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseSummary {
    pub course_id: CourseId,
    pub total_sections: usize,
    pub candidates: usize,
}

/// Result of a successful generation.
///
/// `empty_courses` lists courses whose filters left no candidates; when it is
/// non-empty, `schedules` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    pub schedules: Vec<Schedule>,
    pub empty_courses: Vec<CourseId>,
    pub courses: Vec<CourseSummary>,
    pub stats: SearchStats,
}

impl GenerationOutcome {
    /// True when some course had no sections matching the filters.
    pub fn has_empty_courses(&self) -> bool {
        !self.empty_courses.is_empty()
    }
}

/// Runs the full fetch, filter, enumerate flow against a catalog.
pub struct ScheduleGenerator<S> {
    source: S,
    policy: ConflictPolicy,
    budget: SearchBudget,
    default_criteria: FilterCriteria,
}

impl<S: SectionSource> ScheduleGenerator<S> {
    /// Creates a generator with the regular conflict policy and no budget.
    pub fn new(source: S) -> Self {
        Self {
            source,
            policy: ConflictPolicy::REGULAR,
            budget: SearchBudget::UNLIMITED,
            default_criteria: FilterCriteria::default(),
        }
    }

    /// Creates a generator using the policy, budget and default criteria from `config`.
    pub fn from_config(source: S, config: &PlannerConfig) -> Self {
        Self::new(source)
            .with_policy(config.conflict_policy())
            .with_budget(config.search_budget())
            .with_default_criteria(config.default_criteria.clone())
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_default_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.default_criteria = criteria;
        self
    }

    /// Generates every distinct conflict-free schedule for the request.
    ///
    /// # Returns
    /// * `Ok(GenerationOutcome)` - Deduplicated schedules in search order
    /// * `Err(UnknownCourse)` - A course id has no data; nothing was searched
    /// * `Err(InvalidRequest | InvalidCriteria)` - Rejected before fetching
    /// * `Err(ResourceExhausted)` - The search budget ran out
    pub fn generate(&self, request: &ScheduleRequest) -> Result<GenerationOutcome, ScheduleError> {
        let start = Instant::now();
        validate_course_ids(&request.course_ids)?;

        let criteria = request.criteria.merged_over(&self.default_criteria).validate()?;
        let mut pipeline = FilterPipeline::new().with_stage(criteria);
        if let Some(window) = &request.time_window {
            window.validate()?;
            pipeline = pipeline.with_stage(window.clone());
        }

        let courses = self.fetch_courses(request)?;

        let candidates: Vec<Vec<Section>> = courses
            .iter()
            .map(|course| pipeline.apply(&course.sections))
            .collect();
        let summaries: Vec<CourseSummary> = courses
            .iter()
            .zip(&candidates)
            .map(|(course, kept)| CourseSummary {
                course_id: course.id,
                total_sections: course.sections.len(),
                candidates: kept.len(),
            })
            .collect();

        let empty_courses: Vec<CourseId> = summaries
            .iter()
            .filter(|s| s.candidates == 0)
            .map(|s| s.course_id)
            .collect();
        if !empty_courses.is_empty() {
            info!(
                term = %request.term,
                empty_courses = ?empty_courses,
                "No sections match the filters for some courses"
            );
            return Ok(GenerationOutcome {
                schedules: Vec::new(),
                empty_courses,
                courses: summaries,
                stats: SearchStats::default(),
            });
        }

        let (schedules, stats) = generate_schedules_within(&candidates, self.policy, self.budget)?;

        debug!(
            term = %request.term,
            courses = request.course_ids.len(),
            schedules = schedules.len(),
            nodes_visited = stats.nodes_visited,
            duration_ms = start.elapsed().as_millis() as u64,
            "Generated schedules"
        );

        Ok(GenerationOutcome {
            schedules,
            empty_courses,
            courses: summaries,
            stats,
        })
    }

    /// Fetches every requested course, failing on the first unknown id or
    /// on a section whose crn cannot be keyed.
    fn fetch_courses(&self, request: &ScheduleRequest) -> Result<Vec<Course>, ScheduleError> {
        request
            .course_ids
            .iter()
            .map(|&course_id| {
                let course = self
                    .source
                    .fetch_course(&request.term, course_id)?
                    .ok_or_else(|| ScheduleError::UnknownCourse {
                        term: request.term.clone(),
                        course_id,
                    })?;
                for section in &course.sections {
                    validate_crn(&section.crn)?;
                }
                Ok(course)
            })
            .collect()
    }
}

fn validate_course_ids(course_ids: &[CourseId]) -> Result<(), ScheduleError> {
    if course_ids.is_empty() {
        return Err(ScheduleError::InvalidRequest {
            message: "no courses requested".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(course_ids.len());
    for id in course_ids {
        if !seen.insert(id) {
            return Err(ScheduleError::InvalidRequest {
                message: format!("course {} requested more than once", id),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::testing::{at, section};
    use chrono::NaiveDate;
    use std::cell::Cell;

    const TERM: &str = "FA24";

    fn catalog() -> InMemoryCatalog {
        let mut a2 = section(2, "a2", &[("Tu", at(9, 0), at(10, 0))]);
        a2.seat_remaining = 0;

        let mut b2 = section(4, "b2", &[("W", at(9, 0), at(10, 0))]);
        b2.campus = "ONL".to_string();

        InMemoryCatalog::new()
            .with_course(
                TERM,
                Course::new(
                    1,
                    vec![section(1, "a1", &[("M", at(9, 0), at(10, 0))]), a2],
                ),
            )
            .with_course(
                TERM,
                Course::new(
                    2,
                    vec![section(3, "b1", &[("M", at(9, 30), at(10, 30))]), b2],
                ),
            )
    }

    fn keys(outcome: &GenerationOutcome) -> Vec<&str> {
        outcome.schedules.iter().map(|s| s.key.as_str()).collect()
    }

    #[test]
    fn test_end_to_end_generation() {
        let generator = ScheduleGenerator::new(catalog());
        let outcome = generator
            .generate(&ScheduleRequest::new(TERM, vec![1, 2]))
            .unwrap();

        assert_eq!(keys(&outcome), vec!["a1|b2", "a2|b1", "a2|b2"]);
        assert!(!outcome.has_empty_courses());
        assert_eq!(outcome.stats.schedules_found, 3);
        assert_eq!(outcome.stats.duplicates_removed, 0);
        assert_eq!(outcome.courses[0].total_sections, 2);
    }

    #[test]
    fn test_filters_apply_to_every_course() {
        let generator = ScheduleGenerator::new(catalog());
        let request = ScheduleRequest::new(TERM, vec![1, 2]).with_criteria(FilterCriteria {
            exclude_full: Some(true),
            ..Default::default()
        });
        let outcome = generator.generate(&request).unwrap();
        assert_eq!(keys(&outcome), vec!["a1|b2"]);
        assert_eq!(outcome.courses[0].candidates, 1);
    }

    #[test]
    fn test_default_criteria_layered_under_request() {
        let generator =
            ScheduleGenerator::new(catalog()).with_default_criteria(FilterCriteria {
                campus: Some(["MAIN".to_string()].into_iter().collect()),
                ..Default::default()
            });
        let outcome = generator
            .generate(&ScheduleRequest::new(TERM, vec![1, 2]))
            .unwrap();
        assert_eq!(keys(&outcome), vec!["a2|b1"]);
    }

    #[test]
    fn test_empty_course_is_not_an_error() {
        let generator = ScheduleGenerator::new(catalog());
        let request = ScheduleRequest::new(TERM, vec![1, 2]).with_criteria(FilterCriteria {
            honors_only: Some(true),
            ..Default::default()
        });
        let outcome = generator.generate(&request).unwrap();
        assert!(outcome.schedules.is_empty());
        assert_eq!(outcome.empty_courses, vec![1, 2]);
    }

    #[test]
    fn test_ambiguous_crn_from_source_rejected() {
        // keyed naively, {"1|2", "3"} and {"1", "2|3"} would collide
        let source = InMemoryCatalog::new()
            .with_course(
                TERM,
                Course::new(1, vec![section(1, "1|2", &[]), section(2, "1", &[])]),
            )
            .with_course(
                TERM,
                Course::new(2, vec![section(3, "3", &[]), section(4, "2|3", &[])]),
            );

        let err = ScheduleGenerator::new(source)
            .generate(&ScheduleRequest::new(TERM, vec![1, 2]))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Catalog { .. }));
    }

    struct CountingSource {
        inner: InMemoryCatalog,
        calls: Cell<usize>,
    }

    impl SectionSource for CountingSource {
        fn fetch_course(
            &self,
            term: &str,
            course_id: CourseId,
        ) -> Result<Option<Course>, ScheduleError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.fetch_course(term, course_id)
        }
    }

    #[test]
    fn test_unknown_course_fails_fast() {
        let source = CountingSource {
            inner: catalog(),
            calls: Cell::new(0),
        };
        let generator = ScheduleGenerator::new(&source);

        let err = generator
            .generate(&ScheduleRequest::new(TERM, vec![99, 1, 2]))
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::UnknownCourse {
                term: TERM.to_string(),
                course_id: 99,
            }
        );
        assert_eq!(source.calls.get(), 1);

        let wrong_term = generator.generate(&ScheduleRequest::new("SP25", vec![1]));
        assert!(matches!(wrong_term, Err(ScheduleError::UnknownCourse { .. })));
    }

    #[test]
    fn test_malformed_requests_rejected_before_fetch() {
        let source = CountingSource {
            inner: catalog(),
            calls: Cell::new(0),
        };
        let generator = ScheduleGenerator::new(&source);

        let empty = generator.generate(&ScheduleRequest::new(TERM, vec![]));
        assert!(matches!(empty, Err(ScheduleError::InvalidRequest { .. })));

        let duplicated = generator.generate(&ScheduleRequest::new(TERM, vec![1, 1]));
        assert!(matches!(duplicated, Err(ScheduleError::InvalidRequest { .. })));

        let bad_criteria = ScheduleRequest::new(TERM, vec![1]).with_criteria(FilterCriteria {
            campus: Some(Default::default()),
            ..Default::default()
        });
        assert!(matches!(
            generator.generate(&bad_criteria),
            Err(ScheduleError::InvalidCriteria { .. })
        ));

        let bad_window = ScheduleRequest::new(TERM, vec![1]).with_time_window(TimeWindow {
            earliest_start: Some(2000),
            ..Default::default()
        });
        assert!(generator.generate(&bad_window).is_err());

        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn test_time_window_stage() {
        let generator = ScheduleGenerator::new(catalog());
        let request = ScheduleRequest::new(TERM, vec![1, 2]).with_time_window(TimeWindow {
            excluded_days: codes::parse_days("M").unwrap(),
            ..Default::default()
        });
        let outcome = generator.generate(&request).unwrap();
        assert_eq!(keys(&outcome), vec!["a2|b2"]);
    }

    #[test]
    fn test_budget_exhaustion_surfaces() {
        let generator = ScheduleGenerator::new(catalog()).with_budget(SearchBudget {
            max_nodes: Some(2),
            ..Default::default()
        });
        let err = generator
            .generate(&ScheduleRequest::new(TERM, vec![1, 2]))
            .unwrap_err();
        assert!(err.is_resource_exhausted());
    }

    #[test]
    fn test_final_exam_policy() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 10).unwrap();
        let mut x = section(10, "x1", &[("M", at(8, 0), at(9, 0))]);
        x.meetings
            .push(MeetingTime::final_exam(date, at(8, 0), at(11, 0)).unwrap());
        let mut y = section(11, "y1", &[("W", at(8, 0), at(9, 0))]);
        y.meetings
            .push(MeetingTime::final_exam(date, at(10, 0), at(13, 0)).unwrap());

        let catalog = InMemoryCatalog::new()
            .with_course(TERM, Course::new(10, vec![x]))
            .with_course(TERM, Course::new(11, vec![y]));
        let request = ScheduleRequest::new(TERM, vec![10, 11]);

        let regular = ScheduleGenerator::new(&catalog).generate(&request).unwrap();
        assert_eq!(regular.schedules.len(), 1);

        let strict = ScheduleGenerator::new(&catalog)
            .with_policy(ConflictPolicy::WITH_FINALS)
            .generate(&request)
            .unwrap();
        assert!(strict.schedules.is_empty());
        assert!(!strict.has_empty_courses());
    }
}
