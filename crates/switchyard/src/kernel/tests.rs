//! Unit tests for the kernel lifecycle and recovery tables.

use std::io;
use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::context::Forwarder;
use crate::errors::HttpEvent;
use crate::http::{Request, Response};
use crate::logic::{Logic, LogicRef};
use crate::tests::support::{RecordingReporter, ReportEvent};

/// Re-entry point that answers with the target name, or fails when the
/// target is called `fails`.
struct Replay;

impl Forwarder for Replay {
    fn forward(&self, mut context: Context, target: LogicRef) -> Result<Context, DispatchError> {
        if target.to_string() == "#fails" {
            return Err(DispatchError::application(io::Error::other("recovery broke")));
        }
        context.set_logic(Some(Arc::new(Logic::new(target.to_string()))));
        let body = format!("recovered by {target}");
        context.response_mut().set_pending(body.into());
        context.response_mut().render_text();
        Ok(context)
    }
}

/// Kernel whose pipeline always fails with a scripted error.
struct ScriptedKernel {
    failure: fn() -> Option<DispatchError>,
    recovery: Recovery,
    reporter: Arc<RecordingReporter>,
}

impl Kernel for ScriptedKernel {
    fn context(&self) -> Result<Context, DispatchError> {
        Request::get("/scripted").map(Context::new)
    }

    fn before(&self, context: Context) -> Context {
        let mut stamped = stamp_logger(context);
        stamped.set_forwarder(Arc::new(Replay));
        stamped
    }

    fn proceed(&self, context: &mut Context) -> Result<(), DispatchError> {
        match (self.failure)() {
            Some(error) => Err(error),
            None => {
                context.set_response(Response::text("ok"));
                Ok(())
            }
        }
    }

    fn recovery(&self) -> &Recovery {
        &self.recovery
    }

    fn reporter(&self) -> &dyn DispatchReporter {
        self.reporter.as_ref()
    }
}

fn kernel(failure: fn() -> Option<DispatchError>, recovery: Recovery) -> ScriptedKernel {
    ScriptedKernel {
        failure,
        recovery,
        reporter: Arc::new(RecordingReporter::default()),
    }
}

fn not_found() -> Option<DispatchError> {
    Some(HttpEvent::not_found("nothing here").into())
}

fn io_failure() -> Option<DispatchError> {
    Some(DispatchError::application(io::Error::other("disk")))
}

fn success() -> Option<DispatchError> {
    None
}

#[fixture]
fn recovery() -> Recovery {
    let mut recovery = Recovery::new();
    recovery.on_event(StatusCode::NOT_FOUND, LogicRef::from("missing"));
    recovery.on_error(ErrorCategory::of::<io::Error>(), LogicRef::from("io"));
    recovery.on_error(ErrorCategory::any(), LogicRef::from("fallback"));
    recovery
}

#[rstest]
fn successful_runs_are_rendered(recovery: Recovery) {
    let kernel = kernel(success, recovery);

    let outcome = kernel.run(None);

    assert_eq!(outcome.kind(), OutcomeKind::Rendered);
    let context = outcome.into_result().expect("rendered");
    assert_eq!(context.response().body(), Some("ok"));
    assert_eq!(
        kernel.reporter.events(),
        [
            ReportEvent::RunStarted("GET /scripted".to_owned()),
            ReportEvent::RunFinished(OutcomeKind::Rendered),
        ]
    );
}

#[rstest]
fn events_forward_to_their_status_target(recovery: Recovery) {
    let kernel = kernel(not_found, recovery);

    let outcome = kernel.run(None);

    assert_eq!(outcome.kind(), OutcomeKind::Recovered);
    let context = outcome.into_result().expect("recovered");
    assert_eq!(context.response().status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(context.response().body(), Some("recovered by #missing"));
    assert_eq!(
        context.error().and_then(|error| error.status()),
        Some(StatusCode::NOT_FOUND)
    );
    assert!(
        kernel
            .reporter
            .events()
            .contains(&ReportEvent::RecoveryStarted("#missing".to_owned()))
    );
}

#[rstest]
fn unregistered_events_reach_the_caller() {
    let kernel = kernel(not_found, Recovery::new());

    let outcome = kernel.run(None);

    let DispatchOutcome::Unrecovered(unrecovered) = outcome else {
        panic!("expected unrecovered outcome");
    };
    assert_eq!(unrecovered.error.status(), Some(StatusCode::NOT_FOUND));
    assert!(unrecovered.context.is_some());
    assert!(
        kernel
            .reporter
            .events()
            .contains(&ReportEvent::RecoveryMissing(Some(404)))
    );
}

#[rstest]
fn errors_match_categories_in_registration_order(recovery: Recovery) {
    let kernel = kernel(io_failure, recovery);

    let context = kernel.run(None).into_result().expect("recovered");

    assert_eq!(context.response().body(), Some("recovered by #io"));
    assert_eq!(
        context.response().status(),
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    );
}

#[rstest]
fn disabling_catch_leaves_errors_unrecovered(mut recovery: Recovery) {
    recovery.set_catch(false);
    let kernel = kernel(io_failure, recovery);

    let outcome = kernel.run(None);

    assert_eq!(outcome.kind(), OutcomeKind::Unrecovered);
    assert!(matches!(
        outcome.into_result(),
        Err(DispatchError::Application(_))
    ));
}

#[rstest]
fn disabling_catch_keeps_event_recovery(mut recovery: Recovery) {
    recovery.set_catch(false);
    let kernel = kernel(not_found, recovery);

    assert_eq!(kernel.run(None).kind(), OutcomeKind::Recovered);
}

#[test]
fn failing_recovery_is_not_recovered_again() {
    let mut recovery = Recovery::new();
    recovery.on_error(ErrorCategory::any(), LogicRef::from("fails"));
    let kernel = kernel(io_failure, recovery);

    let outcome = kernel.run(None);

    let DispatchOutcome::Unrecovered(unrecovered) = outcome else {
        panic!("expected unrecovered outcome");
    };
    assert!(unrecovered.error.to_string().contains("recovery broke"));
    let events = kernel.reporter.events();
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, ReportEvent::RecoveryStarted(_)))
            .count(),
        1
    );
    assert_eq!(events.last(), Some(&ReportEvent::RunFinished(OutcomeKind::Unrecovered)));
}

#[test]
fn supplied_contexts_skip_the_factory() {
    let kernel = kernel(success, Recovery::new());
    let supplied = Context::new(Request::post("/supplied").expect("valid request"));

    kernel.run(Some(supplied)).into_result().expect("rendered");

    assert_eq!(
        kernel.reporter.events().first(),
        Some(&ReportEvent::RunStarted("POST /supplied".to_owned()))
    );
}

#[test]
fn categories_see_through_source_chains() {
    let wrapped = DispatchError::application(io::Error::other("inner"));
    assert!(ErrorCategory::of::<io::Error>().matches(&wrapped));
    assert!(!ErrorCategory::of::<std::fmt::Error>().matches(&wrapped));
    assert!(ErrorCategory::any().matches(&wrapped));
}
