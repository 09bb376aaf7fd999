//! Fixed lookup tables for registrar codes and day patterns.
//!
//! Tables are built once on first use and never mutated afterwards.

use chrono::Weekday;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::error::ScheduleError;
use super::types::DaySet;

// Keys are lower-case; codes map to themselves so either form normalizes.
static CLASS_TYPE_CODES: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let pairs = [
        ("lecture", "LE"),
        ("discussion", "DI"),
        ("laboratory", "LA"),
        ("lab", "LA"),
        ("seminar", "SE"),
        ("studio", "ST"),
        ("tutorial", "TU"),
        ("independent study", "IN"),
        ("final exam", "FI"),
        ("midterm", "MI"),
    ];
    let mut table = HashMap::new();
    for (name, code) in pairs {
        table.insert(name.to_string(), code);
        table.insert(code.to_lowercase(), code);
    }
    table
});

static CAMPUS_CODES: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let pairs = [
        ("main", "MAIN"),
        ("main campus", "MAIN"),
        ("online", "ONL"),
        ("remote", "ONL"),
        ("downtown", "DTN"),
        ("extension", "EXT"),
        ("off campus", "OFF"),
    ];
    let mut table = HashMap::new();
    for (name, code) in pairs {
        table.insert(name.to_string(), code);
        table.insert(code.to_lowercase(), code);
    }
    table
});

static DAY_PATTERN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Su|Sa|M|Tu|W|Th|F)*$").unwrap());
static DAY_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Su|Sa|M|Tu|W|Th|F").unwrap());

/// Looks up the short code for a class type name or code.
pub fn class_type_code(name: &str) -> Option<&'static str> {
    CLASS_TYPE_CODES
        .get(name.trim().to_lowercase().as_str())
        .copied()
}

/// Looks up the short code for a campus name or code.
pub fn campus_code(name: &str) -> Option<&'static str> {
    CAMPUS_CODES.get(name.trim().to_lowercase().as_str()).copied()
}

/// Normalizes a class type for comparison. Unknown values are upper-cased.
pub fn normalize_class_type(name: &str) -> String {
    class_type_code(name)
        .map(str::to_string)
        .unwrap_or_else(|| name.trim().to_uppercase())
}

/// Normalizes a campus for comparison. Unknown values are upper-cased.
pub fn normalize_campus(name: &str) -> String {
    campus_code(name)
        .map(str::to_string)
        .unwrap_or_else(|| name.trim().to_uppercase())
}

/// Parses a day pattern such as `MWF`, `TuTh` or `SuSa`.
///
/// An empty pattern (or `TBA`) yields an empty set.
pub fn parse_days(pattern: &str) -> Result<DaySet, ScheduleError> {
    let pattern = pattern.trim();
    if pattern.eq_ignore_ascii_case("TBA") {
        return Ok(DaySet::EMPTY);
    }

    if !DAY_PATTERN_REGEX.is_match(pattern) {
        return Err(ScheduleError::InvalidMeetingTime {
            message: format!("unrecognized day pattern '{}'", pattern),
        });
    }

    let days = DAY_TOKEN_REGEX
        .find_iter(pattern)
        .filter_map(|m| day_from_token(m.as_str()));
    Ok(DaySet::from_days(days))
}

/// Formats a day set back into its pattern, Sunday first.
pub fn format_days(days: DaySet) -> String {
    days.iter().map(day_token).collect()
}

fn day_from_token(token: &str) -> Option<Weekday> {
    match token {
        "Su" => Some(Weekday::Sun),
        "M" => Some(Weekday::Mon),
        "Tu" => Some(Weekday::Tue),
        "W" => Some(Weekday::Wed),
        "Th" => Some(Weekday::Thu),
        "F" => Some(Weekday::Fri),
        "Sa" => Some(Weekday::Sat),
        _ => None,
    }
}

fn day_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Su",
        Weekday::Mon => "M",
        Weekday::Tue => "Tu",
        Weekday::Wed => "W",
        Weekday::Thu => "Th",
        Weekday::Fri => "F",
        Weekday::Sat => "Sa",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_type_lookup() {
        assert_eq!(class_type_code("Lecture"), Some("LE"));
        assert_eq!(class_type_code(" lab "), Some("LA"));
        assert_eq!(class_type_code("di"), Some("DI"));
        assert_eq!(class_type_code("Colloquium"), None);
        assert_eq!(normalize_class_type("Colloquium"), "COLLOQUIUM");
        assert_eq!(normalize_class_type("Seminar"), "SE");
    }

    #[test]
    fn test_campus_lookup() {
        assert_eq!(normalize_campus("Main Campus"), "MAIN");
        assert_eq!(normalize_campus("onl"), "ONL");
        assert_eq!(normalize_campus("la jolla"), "LA JOLLA");
    }

    #[test]
    fn test_parse_days() {
        let tuth = parse_days("TuTh").unwrap();
        assert!(tuth.contains(Weekday::Tue));
        assert!(tuth.contains(Weekday::Thu));
        assert_eq!(tuth.len(), 2);

        assert_eq!(parse_days("MWF").unwrap().len(), 3);
        assert_eq!(parse_days("SuSa").unwrap().len(), 2);
        assert!(parse_days("").unwrap().is_empty());
        assert!(parse_days("TBA").unwrap().is_empty());
        assert!(parse_days("MX").is_err());
        assert!(parse_days("T").is_err());
    }

    #[test]
    fn test_format_days_sunday_first() {
        let days = parse_days("FMSu").unwrap();
        assert_eq!(format_days(days), "SuMF");
        assert_eq!(format_days(DaySet::EMPTY), "");
    }
}
