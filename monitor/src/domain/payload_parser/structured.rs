//! JSON strategy: whole-document parse, then the embedded `[...]` fragment.

use serde_json::{Map, Value};

use super::{SeatReading, display_name_or_unknown, integral_seats, parse_seat_text};
use crate::domain::tracking::CourseId;

const ID_KEYS: &[&str] = &["cartid", "cartId", "cart_id", "courseCode", "course_code"];
const SEAT_KEYS: &[&str] = &["os", "openSeats", "open_seats"];
const NAME_KEYS: &[&str] = &["code", "courseName", "course_name", "name"];

pub(super) fn parse(raw: &str, course_id: &CourseId) -> Option<SeatReading> {
    let document = serde_json::from_str::<Value>(raw)
        .ok()
        .or_else(|| embedded_array(raw))?;
    let node = find_course_node(&document, course_id.as_str())?;
    reading_from_node(node)
}

fn embedded_array(raw: &str) -> Option<Value> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(raw.get(start..=end)?).ok()
}

fn find_course_node<'a>(node: &'a Value, course_id: &str) -> Option<&'a Map<String, Value>> {
    match node {
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_course_node(item, course_id)),
        Value::Object(object) => {
            let matches = read_first(object, ID_KEYS)
                .and_then(identifier_text)
                .is_some_and(|value| value == course_id);
            if matches {
                return Some(object);
            }
            object
                .values()
                .find_map(|nested| find_course_node(nested, course_id))
        }
        _ => None,
    }
}

fn reading_from_node(node: &Map<String, Value>) -> Option<SeatReading> {
    let open_seats = read_first(node, SEAT_KEYS).and_then(seat_value)?;
    let name = read_first(node, NAME_KEYS).and_then(name_text);
    Some(SeatReading {
        open_seats,
        display_name: display_name_or_unknown(name.as_deref()),
    })
}

/// Look up the first key of `class` present in `object`, ignoring ASCII case.
fn read_first<'a>(object: &'a Map<String, Value>, class: &[&str]) -> Option<&'a Value> {
    class.iter().find_map(|wanted| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value)
    })
}

fn identifier_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn seat_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(integral_seats)),
        Value::String(text) => parse_seat_text(text),
        _ => None,
    }
}

fn name_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
