//! Last-resort strategy scanning loose `key: value` text around the course id.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::{SeatReading, UNKNOWN_COURSE, display_name_or_unknown};
use crate::domain::tracking::CourseId;

/// Characters kept on each side of the first course id occurrence.
const WINDOW_CHARS: usize = 1800;

static SEAT_RE: OnceLock<Regex> = OnceLock::new();
static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn seat_regex() -> &'static Regex {
    SEAT_RE.get_or_init(|| {
        Regex::new(r#"(?i)["']?\b(?:os|openseats|open_seats)["']?\s*[:=]\s*["']?([+-]?\d+)"#)
            .unwrap_or_else(|error| panic!("seat window regex failed to compile: {error}"))
    })
}

fn name_regex() -> &'static Regex {
    NAME_RE.get_or_init(|| {
        Regex::new(
            r#"(?i)["']?\b(?:code|coursename|course_name|name)["']?\s*[:=]\s*(?:"([^"]*)"|'([^']*)')"#,
        )
        .unwrap_or_else(|error| panic!("name window regex failed to compile: {error}"))
    })
}

pub(super) fn parse(raw: &str, course_id: &CourseId) -> Option<SeatReading> {
    let occurrence = raw.find(course_id.as_str())?;
    let (start, end) = window_bounds(raw, occurrence, course_id.as_str().len());
    let window = raw.get(start..end)?;
    let anchor = occurrence - start;

    let open_seats = nearest(seat_regex(), window, anchor)
        .and_then(|caps| caps.get(1))
        .and_then(|value| value.as_str().parse::<i64>().ok())?;

    let name = nearest(name_regex(), window, anchor)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map_or(UNKNOWN_COURSE, |value| value.as_str());

    Some(SeatReading {
        open_seats,
        display_name: display_name_or_unknown(Some(name)),
    })
}

/// Byte range spanning `WINDOW_CHARS` characters either side of the match.
fn window_bounds(raw: &str, occurrence: usize, needle_len: usize) -> (usize, usize) {
    let before = raw.get(..occurrence).unwrap_or_default();
    let start = before
        .char_indices()
        .rev()
        .nth(WINDOW_CHARS - 1)
        .map_or(0, |(index, _)| index);

    let match_end = occurrence + needle_len;
    let after = raw.get(match_end..).unwrap_or_default();
    let end = after
        .char_indices()
        .nth(WINDOW_CHARS)
        .map_or(raw.len(), |(index, _)| match_end + index);
    (start, end)
}

/// Pick the match whose start lies closest to `anchor`; earlier wins ties.
fn nearest<'h>(pattern: &Regex, window: &'h str, anchor: usize) -> Option<Captures<'h>> {
    pattern.captures_iter(window).min_by_key(|caps| {
        caps.get(0)
            .map_or(usize::MAX, |whole| whole.start().abs_diff(anchor))
    })
}
