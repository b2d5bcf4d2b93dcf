//! Unit tests for the pattern router.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;

fn route(router: &mut PatternRouter, name: &str, pattern: &str) {
    let parsed = HttpPattern::parse(pattern).expect("pattern");
    router.add(parsed, Arc::new(Logic::new(name)));
}

#[fixture]
fn router() -> PatternRouter {
    let mut router = PatternRouter::new();
    route(&mut router, "users.show", "GET /users/{id}");
    route(&mut router, "users.me", "GET /users/me");
    route(&mut router, "users.create", "POST /users");
    route(&mut router, "ping", "* /ping");
    router
}

#[rstest]
#[case::param("GET /users/7", "users.show", &["7"])]
#[case::literal_beats_param("GET /users/me", "users.me", &[])]
#[case::method_specific("POST /users", "users.create", &[])]
#[case::any_method("PATCH /ping", "ping", &[])]
fn finds_matching_logic(
    router: PatternRouter,
    #[case] query: &str,
    #[case] name: &str,
    #[case] params: &[&str],
) {
    let found = router.find(query).expect("route matches");
    assert_eq!(found.logic().name(), name);
    assert_eq!(found.params(), params);
}

#[rstest]
#[case::unknown_path("GET /posts")]
#[case::wrong_method("DELETE /users")]
#[case::malformed_query("nonsense")]
#[case::unknown_method("BREW /ping")]
fn misses_return_none(router: PatternRouter, #[case] query: &str) {
    assert!(router.find(query).is_none());
}

#[test]
fn ties_go_to_first_registration() {
    let mut router = PatternRouter::new();
    route(&mut router, "first", "GET /items/{id}");
    route(&mut router, "second", "GET /items/{slug}");

    let found = router.find("GET /items/a").expect("route matches");

    assert_eq!(found.logic().name(), "first");
    assert_eq!(found.pattern().as_str(), "GET /items/{id}");
    assert_eq!(router.len(), 2);
}
