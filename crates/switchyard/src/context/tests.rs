//! Unit tests for the request context.

use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::errors::HttpEvent;
use crate::http::Response;

/// Forwarder that records what it receives and writes a marker response.
#[derive(Default)]
struct EchoForwarder {
    seen: Mutex<Vec<(String, Vec<String>, Option<String>, u32)>>,
}

impl Forwarder for EchoForwarder {
    fn forward(&self, mut context: Context, target: LogicRef) -> Result<Context, DispatchError> {
        self.seen.lock().expect("lock").push((
            target.to_string(),
            context.params().to_vec(),
            context.logic().map(|logic| logic.name().to_owned()),
            context.depth(),
        ));
        context.set_response(Response::text(format!("forwarded to {target}")));
        Ok(context)
    }
}

#[fixture]
fn context() -> Context {
    let request = Request::post("https://example.test/users/7")
        .expect("valid request")
        .with_value("name", "Ada")
        .with_value("email", "ada@example.test");
    Context::new(request)
}

#[rstest]
fn post_value_without_keys_returns_everything(context: Context) {
    let PostValues::All(values) = context.post_value(&[]) else {
        panic!("expected all values");
    };
    assert_eq!(values.len(), 2);
}

#[rstest]
#[case::present("name", Some("Ada"))]
#[case::absent("age", None)]
fn post_value_with_one_key_returns_it(
    context: Context,
    #[case] key: &str,
    #[case] expected: Option<&str>,
) {
    assert_eq!(context.post_value(&[key]), PostValues::One(expected));
}

#[rstest]
fn post_value_with_many_keys_keeps_order(context: Context) {
    assert_eq!(
        context.post_value(&["email", "missing", "name"]),
        PostValues::Many(vec![Some("ada@example.test"), None, Some("Ada")])
    );
}

#[rstest]
fn make_url_joins_parts_on_request_origin(context: Context) {
    let url = context.make_url(&["posts", "42"]).expect("url");
    assert_eq!(url, "https://example.test/posts/42");
}

#[rstest]
fn forward_without_forwarder_fails(context: Context) {
    let error = context.forward("home", Vec::new()).expect_err("no forwarder");
    assert!(matches!(error, DispatchError::MissingForwarder));
}

#[rstest]
fn forward_runs_on_an_isolated_snapshot(mut context: Context) {
    let forwarder = Arc::new(EchoForwarder::default());
    context.set_forwarder(forwarder.clone());
    context.set_logic(Some(Arc::new(Logic::new("origin"))));
    context.set_params(vec!["7".to_owned()]);
    context.response_mut().set_header("x-origin", "yes");

    let mut forwarded = context
        .forward("other", vec!["a".to_owned(), "b".to_owned()])
        .expect("forward succeeds");
    forwarded.response_mut().set_header("x-origin", "changed");
    forwarded.set_params(Vec::new());

    assert_eq!(context.response().header("x-origin"), Some("yes"));
    assert_eq!(context.params(), ["7"]);
    assert_eq!(context.logic().map(|logic| logic.name()), Some("origin"));
    assert_eq!(context.depth(), 0);
    assert_eq!(forwarded.response().body(), Some("forwarded to #other"));

    let seen = forwarder.seen.lock().expect("lock");
    assert_eq!(
        seen.as_slice(),
        [(
            "#other".to_owned(),
            vec!["a".to_owned(), "b".to_owned()],
            None,
            1
        )]
    );
}

#[rstest]
fn forward_to_a_logic_keeps_it_selected(mut context: Context) {
    let forwarder = Arc::new(EchoForwarder::default());
    context.set_forwarder(forwarder.clone());

    context
        .forward(Logic::new("inline"), Vec::new())
        .expect("forward succeeds");

    let seen = forwarder.seen.lock().expect("lock");
    assert_eq!(seen.first().and_then(|entry| entry.2.as_deref()), Some("inline"));
}

#[rstest]
fn capture_records_error_and_status(mut context: Context) {
    let error = Arc::new(DispatchError::from(HttpEvent::not_found("gone")));
    context.capture(Arc::clone(&error), StatusCode::NOT_FOUND);

    assert_eq!(context.response().status(), Some(StatusCode::NOT_FOUND));
    assert!(
        context
            .error()
            .is_some_and(|captured| Arc::ptr_eq(captured, &error))
    );
}

#[rstest]
fn end_emits_final_response(mut context: Context) {
    context.response_mut().set_pending(json!("done"));
    let emitted = context.end();
    assert_eq!(emitted.status, StatusCode::OK);
    assert_eq!(emitted.body, "done");
}

#[rstest]
fn summary_describes_the_exchange(mut context: Context) {
    context.set_logic(Some(Arc::new(Logic::new("users.show"))));
    context.set_user(Some(Identity::new("ada", 3)));

    let summary = context.summary();

    assert_eq!(summary["method"], json!("POST"));
    assert_eq!(summary["path"], json!("/users/7"));
    assert_eq!(summary["logic"], json!("users.show"));
    assert_eq!(summary["user"]["rank"], json!(3));
    assert_eq!(summary["error"], serde_json::Value::Null);
}
