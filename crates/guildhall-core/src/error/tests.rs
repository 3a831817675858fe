use super::*;

#[test]
fn test_invariant_message_and_suggestion() {
    let err = Error::Invariant("cached balance diverged".to_string());
    assert!(err.user_message().contains("cached balance diverged"));
    assert!(err.suggestion().unwrap().contains("guildhall verify"));
}

#[test]
fn test_format_error_for_cli_without_suggestion() {
    let err = Error::InvalidAmount(-5);
    let out = format_error_for_cli(&err);
    assert!(out.contains("-5"));
    assert!(!out.contains("💡"));
}

#[test]
fn test_display_uses_thiserror_format() {
    let id = Uuid::nil();
    assert_eq!(
        Error::WarNotFound(id).to_string(),
        format!("war not found: {}", id)
    );
}
