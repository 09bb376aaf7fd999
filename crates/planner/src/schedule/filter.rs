//! Candidate section filtering.
//!
//! Filters never mutate their input and always preserve section order. An
//! empty result is a valid outcome: the course simply has no options.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::codes::{normalize_campus, normalize_class_type};
use super::error::ScheduleError;
use super::types::{DaySet, Section, SectionId, MINUTES_PER_DAY};

/// A stage that decides whether a section stays a candidate.
pub trait SectionFilter {
    fn accepts(&self, section: &Section) -> bool;
}

impl<F> SectionFilter for F
where
    F: Fn(&Section) -> bool,
{
    fn accepts(&self, section: &Section) -> bool {
        self(section)
    }
}

/// User-supplied constraints. A `None` field places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Allowed campus codes
    pub campus: Option<BTreeSet<String>>,
    pub honors_only: Option<bool>,
    /// Drop sections with no remaining seats
    pub exclude_full: Option<bool>,
    /// Allowed class type codes (e.g. `LE`, `SE`)
    pub class_types: Option<BTreeSet<String>>,
    pub excluded_section_ids: Option<BTreeSet<SectionId>>,
}

impl FilterCriteria {
    /// Validates the criteria and returns a copy with every campus and class
    /// type normalized to its short code.
    ///
    /// An explicitly empty allowed-set or a blank code is rejected.
    pub fn validate(&self) -> Result<FilterCriteria, ScheduleError> {
        let campus = normalize_set("campus", self.campus.as_ref(), normalize_campus)?;
        let class_types =
            normalize_set("class_types", self.class_types.as_ref(), normalize_class_type)?;

        Ok(FilterCriteria {
            campus,
            honors_only: self.honors_only,
            exclude_full: self.exclude_full,
            class_types,
            excluded_section_ids: self.excluded_section_ids.clone(),
        })
    }

    /// Layers these criteria over `defaults`. Set fields win; excluded ids
    /// from both sides are combined.
    pub fn merged_over(&self, defaults: &FilterCriteria) -> FilterCriteria {
        let excluded_section_ids = match (&self.excluded_section_ids, &defaults.excluded_section_ids) {
            (Some(mine), Some(theirs)) => Some(mine.union(theirs).copied().collect()),
            (mine, theirs) => mine.clone().or_else(|| theirs.clone()),
        };

        FilterCriteria {
            campus: self.campus.clone().or_else(|| defaults.campus.clone()),
            honors_only: self.honors_only.or(defaults.honors_only),
            exclude_full: self.exclude_full.or(defaults.exclude_full),
            class_types: self
                .class_types
                .clone()
                .or_else(|| defaults.class_types.clone()),
            excluded_section_ids,
        }
    }

    /// Returns true if no dimension is constrained.
    pub fn is_unconstrained(&self) -> bool {
        self.campus.is_none()
            && self.honors_only != Some(true)
            && self.exclude_full != Some(true)
            && self.class_types.is_none()
            && self.excluded_section_ids.is_none()
    }
}

impl SectionFilter for FilterCriteria {
    fn accepts(&self, section: &Section) -> bool {
        if let Some(allowed) = &self.campus {
            let campus = normalize_campus(&section.campus);
            if !allowed.iter().any(|c| normalize_campus(c) == campus) {
                return false;
            }
        }

        if self.honors_only == Some(true) && !section.honors {
            return false;
        }

        if self.exclude_full == Some(true) && section.is_full() {
            return false;
        }

        if let Some(allowed) = &self.class_types {
            let class_type = normalize_class_type(&section.class_type);
            if !allowed.iter().any(|t| normalize_class_type(t) == class_type) {
                return false;
            }
        }

        if let Some(excluded) = &self.excluded_section_ids {
            if excluded.contains(&section.id) {
                return false;
            }
        }

        true
    }
}

fn normalize_set(
    field: &str,
    values: Option<&BTreeSet<String>>,
    normalize: fn(&str) -> String,
) -> Result<Option<BTreeSet<String>>, ScheduleError> {
    let Some(values) = values else {
        return Ok(None);
    };

    if values.is_empty() {
        return Err(ScheduleError::InvalidCriteria {
            message: format!("{} must not be an empty set", field),
        });
    }

    values
        .iter()
        .map(|value| {
            if value.trim().is_empty() {
                Err(ScheduleError::InvalidCriteria {
                    message: format!("{} contains a blank value", field),
                })
            } else {
                Ok(normalize(value))
            }
        })
        .collect::<Result<BTreeSet<_>, _>>()
        .map(Some)
}

/// Time-of-day and weekday constraint applied to regular meetings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindow {
    /// No meeting may start before this minute
    pub earliest_start: Option<u16>,
    /// No meeting may end after this minute
    pub latest_end: Option<u16>,
    /// No meeting may fall on these days
    pub excluded_days: DaySet,
}

impl TimeWindow {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        for bound in [self.earliest_start, self.latest_end].into_iter().flatten() {
            if bound > MINUTES_PER_DAY {
                return Err(ScheduleError::InvalidCriteria {
                    message: format!("time window bound {} is past midnight", bound),
                });
            }
        }

        if let (Some(start), Some(end)) = (self.earliest_start, self.latest_end) {
            if start >= end {
                return Err(ScheduleError::InvalidCriteria {
                    message: format!("time window {}..{} is empty", start, end),
                });
            }
        }

        Ok(())
    }
}

impl SectionFilter for TimeWindow {
    fn accepts(&self, section: &Section) -> bool {
        section.regular_meetings().all(|m| {
            self.earliest_start.map_or(true, |start| m.start_time >= start)
                && self.latest_end.map_or(true, |end| m.end_time <= end)
                && !m.days.intersects(&self.excluded_days)
        })
    }
}

/// Ordered composition of filter stages.
#[derive(Default)]
pub struct FilterPipeline {
    stages: Vec<Box<dyn SectionFilter + Send + Sync>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage; stages run in insertion order.
    pub fn with_stage<F>(mut self, stage: F) -> Self
    where
        F: SectionFilter + Send + Sync + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the sections every stage accepts, in input order.
    pub fn apply(&self, sections: &[Section]) -> Vec<Section> {
        sections
            .iter()
            .filter(|s| self.accepts(s))
            .cloned()
            .collect()
    }
}

impl SectionFilter for FilterPipeline {
    fn accepts(&self, section: &Section) -> bool {
        self.stages.iter().all(|stage| stage.accepts(section))
    }
}

/// Reduces a course's sections to those satisfying `criteria`.
pub fn filter_sections(sections: &[Section], criteria: &FilterCriteria) -> Vec<Section> {
    sections
        .iter()
        .filter(|s| criteria.accepts(s))
        .cloned()
        .collect()
}
