//! Unit tests for the static templater.

use rstest::{fixture, rstest};
use serde_json::{Map, Value, json};

use super::*;

fn vars(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[fixture]
fn templater() -> StaticTemplater {
    StaticTemplater::new()
        .with_view("greeting", "<p>Hello {{ name }}!</p>")
        .with_view("nested", "{{ user.profile.city }} / {{ tags.1 }}")
        .with_view("helpers", r#"<a href="{{ url users "7" }}">{{ shout }}</a>"#)
        .with_view("globals", "{{ ctx.path }}")
        .with_view("broken", "{{ name ")
        .with_view("unknown_helper", "{{ missing arg }}")
}

#[fixture]
fn scope() -> TemplateScope {
    let mut scope = TemplateScope::new();
    scope.set_helper("url", |args| Ok(format!("http://localhost/{}", args.join("/"))));
    scope.set_helper("shout", |_| Ok("HEY".to_owned()));
    scope.set_var("ctx", json!({ "path": "/home" }));
    scope
}

#[rstest]
#[case::plain("greeting", json!({ "name": "Ada" }), "<p>Hello Ada!</p>")]
#[case::missing_var("greeting", json!({}), "<p>Hello !</p>")]
#[case::dotted(
    "nested",
    json!({ "user": { "profile": { "city": "Oslo" } }, "tags": ["a", "b"] }),
    "Oslo / b"
)]
#[case::helpers("helpers", json!({}), r#"<a href="http://localhost/users/7">HEY</a>"#)]
#[case::scope_globals("globals", json!({}), "/home")]
fn renders_views(
    templater: StaticTemplater,
    scope: TemplateScope,
    #[case] view: &str,
    #[case] input: Value,
    #[case] expected: &str,
) {
    let html = templater.render(view, &vars(input), &scope).expect("renders");
    assert_eq!(html, expected);
}

#[rstest]
fn render_vars_shadow_scope_globals(templater: StaticTemplater, scope: TemplateScope) {
    let html = templater
        .render("globals", &vars(json!({ "ctx": { "path": "/local" } })), &scope)
        .expect("renders");
    assert_eq!(html, "/local");
}

#[rstest]
#[case::unknown_view("nope")]
#[case::unclosed_tag("broken")]
#[case::unknown_helper("unknown_helper")]
fn reports_template_errors(templater: StaticTemplater, scope: TemplateScope, #[case] view: &str) {
    let error = templater
        .render(view, &Map::new(), &scope)
        .expect_err("render fails");
    assert!(matches!(error, DispatchError::Template { .. }));
}

#[test]
fn scope_reports_missing_helpers() {
    let scope = TemplateScope::new();
    assert!(!scope.has_helper("url"));
    assert!(scope.call("url", &[]).is_none());
}
