//! Coverage for the payload strategy cascade.

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn abc123() -> CourseId {
    CourseId::new("ABC123").expect("valid course id")
}

fn reading(open_seats: i64, display_name: &str) -> SeatReading {
    SeatReading {
        open_seats,
        display_name: display_name.to_owned(),
    }
}

#[rstest]
#[case::direct_structured(r#"[{"cartid":"ABC123","os":"5","code":"CS 101"}]"#)]
#[case::embedded_structured(
    r#"<script>var classData = [{"cartid":"ABC123","os":"5","code":"CS 101"}];</script>"#
)]
#[case::free_text_window(r#"section cartid: ABC123, os: 5, code: "CS 101" (lecture)"#)]
fn every_payload_shape_yields_the_same_reading(abc123: CourseId, #[case] raw: &str) {
    let parsed = parse_seat_reading(raw, &abc123).expect("payload parses");
    assert_eq!(parsed, reading(5, "CS 101"));
}

#[rstest]
fn single_object_payload_is_read_directly(abc123: CourseId) {
    let parsed = parse_seat_reading(r#"{"cartid":"ABC123","os":"5","code":"CS 101"}"#, &abc123)
        .expect("payload parses");
    assert_eq!(parsed, reading(5, "CS 101"));
    assert!(parsed.is_open());
}

#[rstest]
#[case("")]
#[case("   \n\t")]
fn blank_payload_is_rejected(abc123: CourseId, #[case] raw: &str) {
    assert_eq!(
        parse_seat_reading(raw, &abc123),
        Err(PayloadParseError::EmptyPayload)
    );
}

#[rstest]
fn nested_structures_are_searched_with_key_aliases(abc123: CourseId) {
    let raw = r#"{"data":{"sections":[{"course_code":" ABC123 ","open_seats":"7"}]}}"#;
    let parsed = parse_seat_reading(raw, &abc123).expect("payload parses");
    assert_eq!(parsed, reading(7, UNKNOWN_COURSE));
}

#[rstest]
fn numeric_identifiers_and_seats_are_accepted() {
    let course = CourseId::new("555").expect("valid course id");
    let raw = r#"[{"CartId": 555, "openSeats": 1, "courseName": "Biology"}]"#;
    let parsed = parse_seat_reading(raw, &course).expect("payload parses");
    assert_eq!(parsed, reading(1, "Biology"));
}

#[rstest]
#[case::negative(r#"[{"cartid":"ABC123","os":-2,"code":"CS 101"}]"#, -2)]
#[case::integral_float(r#"[{"cartid":"ABC123","os":3.0,"code":"CS 101"}]"#, 3)]
#[case::padded_text(r#"[{"cartid":"ABC123","os":" 4 ","code":"CS 101"}]"#, 4)]
fn seat_values_are_normalised(abc123: CourseId, #[case] raw: &str, #[case] expected: i64) {
    let parsed = parse_seat_reading(raw, &abc123).expect("payload parses");
    assert_eq!(parsed.open_seats, expected);
    assert_eq!(parsed.is_open(), expected > 0);
}

#[rstest]
fn blank_seat_value_is_not_a_reading(abc123: CourseId) {
    let raw = r#"[{"cartid":"ABC123","os":"","code":"CS 101"}]"#;
    assert_eq!(
        parse_seat_reading(raw, &abc123),
        Err(PayloadParseError::SeatCountNotFound { course_id: abc123 })
    );
}

#[rstest]
fn unknown_course_is_not_found(abc123: CourseId) {
    let raw = r#"[{"cartid":"XYZ999","os":"5","code":"CS 101"}]"#;
    let error = parse_seat_reading(raw, &abc123).expect_err("course absent");
    assert!(matches!(error, PayloadParseError::SeatCountNotFound { .. }));
}

#[rstest]
fn markup_attributes_are_read(abc123: CourseId) {
    let raw = r#"<classdata><course cartid="ABC123" os="3" code="CS 101"/></classdata>"#;
    let parsed = parse_seat_reading(raw, &abc123).expect("payload parses");
    assert_eq!(parsed, reading(3, "CS 101"));
}

#[rstest]
fn markup_name_falls_back_to_preceding_code() {
    let course = CourseId::new("M1").expect("valid course id");
    let raw = r#"<course code="MATH 200"><block cartid='M1' openSeats="2"/></course>"#;
    let parsed = parse_seat_reading(raw, &course).expect("payload parses");
    assert_eq!(parsed, reading(2, "MATH 200"));
}

#[rstest]
fn markup_name_falls_back_to_course_id(abc123: CourseId) {
    let raw = r#"<timetable><block cartid="ABC123" os="0"/></timetable>"#;
    let parsed = parse_seat_reading(raw, &abc123).expect("payload parses");
    assert_eq!(parsed, reading(0, "ABC123"));
}

#[rstest]
fn markup_tag_without_seats_is_skipped(abc123: CourseId) {
    let raw = r#"<block cartid="ABC123" code="CS 101"/><block cartid="ABC123" os="6"/>"#;
    let parsed = parse_seat_reading(raw, &abc123).expect("payload parses");
    assert_eq!(parsed, reading(6, "CS 101"));
}

#[rstest]
fn window_defaults_name_when_absent(abc123: CourseId) {
    let parsed = parse_seat_reading("ABC123 open_seats=9", &abc123).expect("payload parses");
    assert_eq!(parsed, reading(9, UNKNOWN_COURSE));
}

#[rstest]
fn window_prefers_values_nearest_the_course(abc123: CourseId) {
    let raw = r#"cartid:'OTHER1' os:1 code:'OTHER' cartid:'ABC123' os:8 code:'CS 101'"#;
    let parsed = parse_seat_reading(raw, &abc123).expect("payload parses");
    assert_eq!(parsed, reading(8, "CS 101"));
}

#[rstest]
fn window_ignores_values_beyond_its_width(abc123: CourseId) {
    let raw = format!("ABC123{}os: 4", " ".repeat(2_000));
    let error = parse_seat_reading(&raw, &abc123).expect_err("seat count out of range");
    assert_eq!(
        error,
        PayloadParseError::SeatCountNotFound { course_id: abc123 }
    );
}

#[rstest]
fn window_is_safe_around_multibyte_text(abc123: CourseId) {
    let raw = format!("{}ABC123 os=2 code='Café'{}", "é".repeat(2_500), "ü".repeat(2_500));
    let parsed = parse_seat_reading(&raw, &abc123).expect("payload parses");
    assert_eq!(parsed, reading(2, "Café"));
}

#[rstest]
#[case("5", Some(5))]
#[case(" -3 ", Some(-3))]
#[case("+2", Some(2))]
#[case("2.0", Some(2))]
#[case("2.5", None)]
#[case("", None)]
#[case("many", None)]
fn seat_text_parsing(#[case] raw: &str, #[case] expected: Option<i64>) {
    assert_eq!(parse_seat_text(raw), expected);
}
