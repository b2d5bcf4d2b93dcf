//! Unit tests for dispatch errors.

use std::io;

use rstest::rstest;

use super::*;

#[rstest]
#[case::not_found(HttpEvent::not_found("x"), 404)]
#[case::unauthorized(HttpEvent::unauthorized("x"), 401)]
#[case::forbidden(HttpEvent::forbidden("x"), 403)]
#[case::not_implemented(HttpEvent::not_implemented("x"), 501)]
fn event_constructors_carry_status(#[case] event: HttpEvent, #[case] code: u16) {
    assert_eq!(event.status().as_u16(), code);
    let error = DispatchError::from(event);
    assert!(error.is_event());
    assert_eq!(error.status().map(StatusCode::as_u16), Some(code));
}

#[test]
fn application_errors_have_no_status() {
    let error = DispatchError::application(io::Error::other("disk on fire"));
    assert!(!error.is_event());
    assert_eq!(error.status(), None);
    assert!(error.to_string().contains("disk on fire"));
}

#[test]
fn chain_reaches_wrapped_application_error() {
    let error = DispatchError::application(io::Error::other("boom"));
    assert!(error.chain().any(|link| link.is::<io::Error>()));
    assert!(error.chain().any(|link| link.is::<DispatchError>()));
}

#[test]
fn chain_walks_nested_sources_in_order() {
    let inner = DispatchError::invalid_uri("http://[", "missing closing bracket");
    let error = DispatchError::application(inner);

    let links: Vec<String> = error.chain().map(ToString::to_string).collect();

    assert_eq!(links.len(), 2);
    assert!(links.first().is_some_and(|link| link.starts_with("application error")));
    assert_eq!(
        links.get(1).map(String::as_str),
        Some("invalid uri 'http://[': missing closing bracket")
    );
}

#[test]
fn event_display_includes_status_and_message() {
    let error = DispatchError::from(HttpEvent::not_found("no route for GET /x"));
    assert_eq!(error.to_string(), "http 404: no route for GET /x");
}
