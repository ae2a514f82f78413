// ABOUTME: Tests for validated domain types.
// ABOUTME: Covers application name validation rules.

use slipway::types::{AppName, AppNameError};

#[test]
fn accepts_valid_names() {
    for name in ["demo", "my-app", "app2", "a", "web-api-v2"] {
        assert!(AppName::new(name).is_ok(), "{name} should be valid");
    }
}

#[test]
fn rejects_empty_name() {
    assert!(matches!(AppName::new(""), Err(AppNameError::Empty)));
}

#[test]
fn rejects_uppercase() {
    assert!(matches!(
        AppName::new("MyApp"),
        Err(AppNameError::NotLowercase)
    ));
}

#[test]
fn rejects_hyphen_at_edges() {
    assert!(matches!(
        AppName::new("-demo"),
        Err(AppNameError::StartsWithHyphen)
    ));
    assert!(matches!(
        AppName::new("demo-"),
        Err(AppNameError::EndsWithHyphen)
    ));
}

#[test]
fn rejects_shell_and_path_characters() {
    for name in ["demo app", "demo;rm", "demo/app", "demo_app", "demo$", "demo.app"] {
        assert!(
            matches!(AppName::new(name), Err(AppNameError::InvalidChar(_))),
            "{name} should be rejected"
        );
    }
}

#[test]
fn rejects_overlong_name() {
    let name = "a".repeat(64);
    assert!(matches!(AppName::new(&name), Err(AppNameError::TooLong)));

    let name = "a".repeat(63);
    assert!(AppName::new(&name).is_ok());
}

#[test]
fn displays_as_bare_name() {
    let name = AppName::new("demo").unwrap();
    assert_eq!(name.to_string(), "demo");
    assert_eq!(name.as_str(), "demo");
}
