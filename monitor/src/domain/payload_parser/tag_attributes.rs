//! Markup strategy for XML-like payloads carrying one element per section.

use std::sync::OnceLock;

use regex::Regex;

use super::{SeatReading, display_name_or_unknown, parse_seat_text};
use crate::domain::tracking::CourseId;

const SEAT_ATTRIBUTES: &[&str] = &["os", "openSeats", "open_seats"];
const FALLBACK_NAME_ATTRIBUTES: &[&str] = &["courseName", "course_name", "name"];

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE_RE: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_RE.get_or_init(|| {
        Regex::new(r"<[A-Za-z][^>]*>")
            .unwrap_or_else(|error| panic!("tag regex failed to compile: {error}"))
    })
}

fn attribute_regex() -> &'static Regex {
    ATTRIBUTE_RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][A-Za-z0-9:._-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
            .unwrap_or_else(|error| panic!("attribute regex failed to compile: {error}"))
    })
}

struct Attribute<'a> {
    name: &'a str,
    value: &'a str,
    quoted: bool,
}

struct Tag<'a> {
    attributes: Vec<Attribute<'a>>,
}

impl<'a> Tag<'a> {
    fn parse(text: &'a str) -> Self {
        let attributes = attribute_regex()
            .captures_iter(text)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str();
                let (value, quoted) = match (caps.get(2), caps.get(3), caps.get(4)) {
                    (Some(value), _, _) | (_, Some(value), _) => (value.as_str(), true),
                    (_, _, Some(value)) => (value.as_str(), false),
                    _ => return None,
                };
                Some(Attribute {
                    name,
                    value,
                    quoted,
                })
            })
            .collect();
        Self { attributes }
    }

    fn get(&self, name: &str) -> Option<&Attribute<'a>> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
    }

    fn first_of(&self, names: &[&str]) -> Option<&'a str> {
        names
            .iter()
            .find_map(|name| self.get(name))
            .map(|attribute| attribute.value)
    }

    fn non_blank(&self, name: &str) -> Option<&'a str> {
        self.get(name)
            .map(|attribute| attribute.value.trim())
            .filter(|value| !value.is_empty())
    }

    fn names_course(&self, course_id: &str) -> bool {
        self.get("cartid")
            .is_some_and(|attribute| attribute.quoted && attribute.value.trim() == course_id)
    }
}

pub(super) fn parse(raw: &str, course_id: &CourseId) -> Option<SeatReading> {
    let tags: Vec<Tag<'_>> = tag_regex()
        .find_iter(raw)
        .map(|found| Tag::parse(found.as_str()))
        .collect();

    tags.iter().enumerate().find_map(|(index, tag)| {
        if !tag.names_course(course_id.as_str()) {
            return None;
        }
        let open_seats = tag.first_of(SEAT_ATTRIBUTES).and_then(parse_seat_text)?;
        let preceding = tags.get(..index).unwrap_or_default();
        let name = display_name(tag, preceding).unwrap_or(course_id.as_str());
        Some(SeatReading {
            open_seats,
            display_name: display_name_or_unknown(Some(name)),
        })
    })
}

fn display_name<'a>(tag: &Tag<'a>, preceding: &[Tag<'a>]) -> Option<&'a str> {
    tag.non_blank("code")
        .or_else(|| preceding.iter().rev().find_map(|earlier| earlier.non_blank("code")))
        .or_else(|| {
            FALLBACK_NAME_ATTRIBUTES
                .iter()
                .find_map(|name| tag.non_blank(name))
        })
}
