//! Cascading extraction of a seat count from raw availability payloads.
//!
//! Upstream payloads arrive as JSON documents, JSON fragments wrapped in
//! script text, XML-like markup, or loose `key: value` text. Each shape is
//! handled by an independent strategy; [`parse_seat_reading`] runs them in a
//! fixed order and returns the first reading found.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::tracking::CourseId;

mod structured;
mod tag_attributes;
mod text_window;

/// Display name used when a payload carries no usable name.
pub const UNKNOWN_COURSE: &str = "UNKNOWN_COURSE";

/// Seat count and display name extracted for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatReading {
    /// Signed open-seat count; zero or below means closed.
    pub open_seats: i64,
    /// Human-readable course name.
    pub display_name: String,
}

impl SeatReading {
    /// Return true when at least one seat is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open_seats > 0
    }
}

/// Failure to locate the target course in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadParseError {
    /// Payload text was blank.
    #[error("availability payload is empty")]
    EmptyPayload,
    /// No strategy located a seat count for the course.
    #[error("could not locate course {course_id} with an open-seat count in the payload")]
    SeatCountNotFound {
        /// Course that was searched for.
        course_id: CourseId,
    },
}

type Strategy = fn(&str, &CourseId) -> Option<SeatReading>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("structured", structured::parse),
    ("tag_attributes", tag_attributes::parse),
    ("text_window", text_window::parse),
];

/// Extract the seat reading for `course_id` from `raw_payload`.
///
/// # Errors
///
/// Returns [`PayloadParseError::EmptyPayload`] for blank input and
/// [`PayloadParseError::SeatCountNotFound`] when no strategy matches.
///
/// # Examples
/// ```
/// use seat_monitor::domain::{CourseId, parse_seat_reading};
///
/// let course = CourseId::new("ABC123").expect("valid id");
/// let reading = parse_seat_reading(
///     r#"{"cartid":"ABC123","os":"5","code":"CS 101"}"#,
///     &course,
/// )
/// .expect("payload parses");
/// assert_eq!(reading.open_seats, 5);
/// assert_eq!(reading.display_name, "CS 101");
/// ```
pub fn parse_seat_reading(
    raw_payload: &str,
    course_id: &CourseId,
) -> Result<SeatReading, PayloadParseError> {
    if raw_payload.trim().is_empty() {
        return Err(PayloadParseError::EmptyPayload);
    }

    for (name, strategy) in STRATEGIES {
        if let Some(reading) = strategy(raw_payload, course_id) {
            debug!(
                strategy = *name,
                course_id = %course_id,
                open_seats = reading.open_seats,
                "payload strategy matched"
            );
            return Ok(reading);
        }
    }

    Err(PayloadParseError::SeatCountNotFound {
        course_id: course_id.clone(),
    })
}

static INTEGER_RE: OnceLock<Regex> = OnceLock::new();

fn integer_regex() -> &'static Regex {
    INTEGER_RE.get_or_init(|| {
        Regex::new(r"^[+-]?\d+$")
            .unwrap_or_else(|error| panic!("integer regex failed to compile: {error}"))
    })
}

/// Parse seat text such as `"5"`, `" -2 "`, or `"3.0"`.
fn parse_seat_text(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if integer_regex().is_match(trimmed) {
        return trimmed.parse::<i64>().ok();
    }
    trimmed.parse::<f64>().ok().and_then(integral_seats)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is integral and inside the exactly representable f64 range"
)]
fn integral_seats(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0;
    (value.is_finite() && value.fract() == 0.0 && value.abs() <= LIMIT).then(|| value as i64)
}

fn display_name_or_unknown(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| UNKNOWN_COURSE.to_owned(), str::to_owned)
}

#[cfg(test)]
mod tests;
