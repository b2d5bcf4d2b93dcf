//! Unit tests for request and response values.

use rstest::rstest;
use serde_json::json;

use super::*;
use crate::errors::DispatchError;

#[rstest]
#[case::relative("/users/7", "/users/7")]
#[case::absolute("https://example.test/posts/1?draft=true", "/posts/1")]
fn request_exposes_path(#[case] target: &str, #[case] expected: &str) {
    let request = Request::get(target).expect("valid request");
    assert_eq!(request.path(), expected);
}

#[test]
fn route_query_combines_method_and_path() {
    let request = Request::post("/users").expect("valid request");
    assert_eq!(request.route_query(), "POST /users");
}

#[test]
fn rejects_unparseable_target() {
    let error = Request::get("http://[::1").expect_err("invalid url");
    assert!(matches!(error, DispatchError::InvalidUri { .. }));
}

#[test]
fn headers_are_case_insensitive() {
    let request = Request::get("/")
        .expect("valid request")
        .with_header("Authorization", "Bearer abc");
    assert_eq!(request.header("authorization"), Some("Bearer abc"));
    assert_eq!(request.header("AUTHORIZATION"), Some("Bearer abc"));
}

#[test]
fn uri_make_joins_on_origin() {
    let request = Request::get("https://example.test/deep/path").expect("valid request");
    let url = request.uri().make("users/7").expect("url");
    assert_eq!(url, "https://example.test/users/7");
}

#[rstest]
#[case::get("get", HttpMethod::Get)]
#[case::delete("DELETE", HttpMethod::Delete)]
fn parses_methods(#[case] input: &str, #[case] expected: HttpMethod) {
    assert_eq!(input.parse::<HttpMethod>().expect("method"), expected);
}

#[test]
fn json_render_preserves_status_and_headers() {
    let mut response = Response::new().with_status(StatusCode::NOT_FOUND);
    response.set_header("X-Trace", "t-1");
    response.set_pending(json!({"missing": true}));

    response.render_json().expect("render");

    assert!(!response.is_raw());
    assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(response.header("x-trace"), Some("t-1"));
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.body(), Some(r#"{"missing":true}"#));
}

#[test]
fn json_render_of_unset_content_is_null() {
    let mut response = Response::new();
    response.set_pending(serde_json::Value::Null);
    response.render_json().expect("render");
    assert_eq!(response.body(), Some("null"));
}

#[rstest]
#[case::string(json!("hello"), "hello")]
#[case::null(serde_json::Value::Null, "")]
#[case::number(json!(42), "42")]
fn text_render_passes_content_through(#[case] content: serde_json::Value, #[case] body: &str) {
    let mut response = Response::new();
    response.set_pending(content);
    response.render_text();
    assert_eq!(response.body(), Some(body));
}

#[test]
fn finalize_defaults_status_and_renders_pending() {
    let mut response = Response::new();
    response.set_pending(json!("late"));
    let emitted = response.finalize();
    assert_eq!(emitted.status, StatusCode::OK);
    assert_eq!(emitted.body, "late");
}

#[test]
fn writer_frames_response() {
    let emitted = Response::text("hi")
        .with_status(StatusCode::new(201))
        .finalize();
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_response(&emitted).expect("write");

    let output = String::from_utf8(writer.into_inner()).expect("utf8");
    assert!(output.starts_with("HTTP/1.1 201 Created\r\n"));
    assert!(output.contains("content-type: text/plain; charset=utf-8\r\n"));
    assert!(output.contains("content-length: 2\r\n\r\n"));
    assert!(output.ends_with("hi"));
}

#[rstest]
#[case::known(StatusCode::NOT_FOUND, "HTTP/1.1 404 Not Found\r\n")]
#[case::unnamed(StatusCode::new(299), "HTTP/1.1 299 \r\n")]
fn writer_status_line_keeps_reason_separator(#[case] status: StatusCode, #[case] line: &str) {
    let emitted = Response::new().with_status(status).finalize();
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_response(&emitted).expect("write");

    let output = String::from_utf8(writer.into_inner()).expect("utf8");
    assert!(output.starts_with(line), "unexpected status line in {output:?}");
}
