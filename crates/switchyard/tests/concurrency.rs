//! Concurrent dispatch against a shared dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rstest::rstest;
use switchyard::{
    Context, Invocable, Kernel, LogicPatch, LogicSpec, MethodRef, RenderMode, Reply, Request,
    Resolver, Rest, StatusCode,
};

/// Resolver that is slow to bind and counts every bind it performs.
#[derive(Default)]
struct SlowResolver {
    binds: AtomicUsize,
}

impl Resolver for SlowResolver {
    fn of(&self, method: &MethodRef) -> Option<Invocable> {
        let MethodRef::Named(name) = method else {
            return None;
        };
        if name != "users.show" {
            return None;
        }
        self.binds.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Some(
            Invocable::new(|params, _| Ok(Reply::from(format!("user {}", params.join("/")))))
                .annotate("http", "GET /users/{id}")
                .annotate("access", 0),
        )
    }
}

#[rstest]
#[case::two(2)]
#[case::eight(8)]
fn concurrent_requests_bind_reflected_logic_once(#[case] callers: usize) {
    let resolver = Arc::new(SlowResolver::default());
    let rest = Rest::builder()
        .with_resolver(Arc::clone(&resolver))
        .set(
            "users",
            LogicSpec::declared(
                LogicPatch::new()
                    .with_http("GET /users/{id}")
                    .expect("pattern"),
                "users.show",
            ),
        )
        .build()
        .expect("builds");
    let barrier = Barrier::new(callers);

    let bodies: Vec<(String, String)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..callers)
            .map(|caller| {
                let dispatcher = rest.clone();
                let gate = &barrier;
                scope.spawn(move || {
                    let path = format!("/users/{caller}");
                    gate.wait();
                    let emitted = dispatcher
                        .run(Some(Context::new(Request::get(&path).expect("valid request"))))
                        .into_result()
                        .expect("rendered")
                        .end();
                    assert_eq!(emitted.status, StatusCode::OK);
                    (format!("user {caller}"), emitted.body)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("caller thread panicked"))
            .collect()
    });

    assert_eq!(resolver.binds.load(Ordering::SeqCst), 1);
    for (expected, body) in bodies {
        assert_eq!(body, expected);
    }
}

#[test]
fn discovered_metadata_does_not_leak_into_the_shared_logic() {
    let rest = Rest::builder()
        .set(
            "secret",
            LogicSpec::declared(
                LogicPatch::new()
                    .with_http("GET /secret")
                    .expect("pattern"),
                MethodRef::Invocable(
                    Invocable::new(|_, _| Ok(Reply::from("hidden"))).annotate("render", "json"),
                ),
            ),
        )
        .build()
        .expect("builds");

    let emitted = rest
        .run(Some(Context::new(Request::get("/secret").expect("valid request"))))
        .into_result()
        .expect("rendered")
        .end();

    assert_eq!(emitted.body, r#""hidden""#);
    let shared = rest.logic("secret").expect("registered");
    assert_eq!(shared.render(), RenderMode::Text);
}
