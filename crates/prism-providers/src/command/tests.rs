//! Unit tests for command parsing and accessors.

use rstest::rstest;
use serde_json::json;

use super::*;
use crate::error::ErrorKind;

#[rstest]
#[case::observe("OBSERVE", Action::Observe)]
#[case::actuate("ACTUATE", Action::Actuate)]
#[case::parameterize("PARAMETERIZE", Action::Parameterize)]
#[case::configure("CONFIGURE", Action::Configure)]
#[case::link("LINK", Action::Link)]
fn parses_known_actions(#[case] input: &str, #[case] expected: Action) {
    let action = Action::parse(input).expect("known action");
    assert_eq!(action, expected);
    assert_eq!(action.as_str(), input);
}

#[rstest]
#[case::lowercase("observe")]
#[case::unknown("TEST")]
#[case::empty("")]
fn rejects_other_actions(#[case] input: &str) {
    let error = Action::parse(input).expect_err("action should be rejected");
    assert_eq!(error.kind(), ErrorKind::UnknownAction);
    assert!(error.message().contains(input));
}

#[test]
fn parses_object_commands() {
    let command = Command::parse(
        r#"{"action":"ACTUATE","target":"living_room_light","property":"state","value":"ON"}"#,
    )
    .expect("parse command");
    assert_eq!(command.action(), Some("ACTUATE"));
    assert_eq!(command.target(), Some("living_room_light"));
    assert_eq!(command.property(), Some("state"));
    assert_eq!(command.value(), Some(&json!("ON")));
}

#[rstest]
#[case::truncated("{action: OBSERVE")]
#[case::empty("")]
#[case::array("[1, 2]")]
#[case::scalar("\"OBSERVE\"")]
fn rejects_malformed_text(#[case] raw: &str) {
    let error = Command::parse(raw).expect_err("malformed command");
    assert_eq!(error.kind(), ErrorKind::InvalidCommand);
}

#[test]
fn non_string_fields_are_not_exposed_as_text() {
    let command = Command::from_value(json!({"action": 7, "target": null})).expect("object");
    assert_eq!(command.action(), None);
    assert_eq!(command.target(), None);
    assert_eq!(command.get("action"), Some(&json!(7)));
}

#[test]
fn with_field_leaves_original_untouched() {
    let original = Command::new("OBSERVE", "motion_sensor_1", "motion_detected", None);
    let tagged = original.with_field("trace", "abc");

    assert_eq!(original.get("trace"), None);
    assert_eq!(tagged.get("trace"), Some(&json!("abc")));
    assert_eq!(tagged.target(), Some("motion_sensor_1"));
}

#[test]
fn display_renders_json() {
    let command = Command::new("OBSERVE", "t", "p", None);
    let rendered = command.to_string();
    let reparsed = Command::parse(&rendered).expect("display output is valid JSON");
    assert_eq!(reparsed, command);
}
