//! Structured reporting for kernel lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::DispatchError;
use crate::http::Request;
use crate::kernel::{DISPATCH_TARGET, OutcomeKind};
use crate::logic::LogicRef;

/// Observer trait used to surface run lifecycle events to telemetry sinks.
pub trait DispatchReporter: Send + Sync {
    /// Invoked once a context is available, before the pipeline runs.
    fn run_started(&self, request: &Request);

    /// Invoked when a run ends, whatever its outcome.
    fn run_finished(&self, outcome: OutcomeKind, elapsed: Duration);

    /// Invoked when a failure is handed to a recovery logic.
    fn recovery_started(&self, trigger: &DispatchError, target: &LogicRef);

    /// Invoked when a failure leaves the run unrecovered.
    fn recovery_missing(&self, failure: &DispatchError);
}

impl<T> DispatchReporter for Arc<T>
where
    T: DispatchReporter + ?Sized,
{
    fn run_started(&self, request: &Request) {
        (**self).run_started(request);
    }

    fn run_finished(&self, outcome: OutcomeKind, elapsed: Duration) {
        (**self).run_finished(outcome, elapsed);
    }

    fn recovery_started(&self, trigger: &DispatchError, target: &LogicRef) {
        (**self).recovery_started(trigger, target);
    }

    fn recovery_missing(&self, failure: &DispatchError) {
        (**self).recovery_missing(failure);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDispatchReporter;

impl StructuredDispatchReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DispatchReporter for StructuredDispatchReporter {
    fn run_started(&self, request: &Request) {
        tracing::debug!(
            target: DISPATCH_TARGET,
            event = "run_started",
            method = %request.method(),
            path = %request.path(),
            "kernel run started"
        );
    }

    fn run_finished(&self, outcome: OutcomeKind, elapsed: Duration) {
        tracing::info!(
            target: DISPATCH_TARGET,
            event = "run_finished",
            outcome = %outcome,
            elapsed = ?elapsed,
            "kernel run finished"
        );
    }

    fn recovery_started(&self, trigger: &DispatchError, target: &LogicRef) {
        tracing::debug!(
            target: DISPATCH_TARGET,
            event = "recovery_started",
            status = ?trigger.status().map(|status| status.as_u16()),
            error = %trigger,
            recovery = %target,
            "failure has a recovery logic"
        );
    }

    fn recovery_missing(&self, failure: &DispatchError) {
        if failure.is_event() {
            tracing::debug!(
                target: DISPATCH_TARGET,
                event = "recovery_missing",
                error = %failure,
                "http event raised, no recovery logic"
            );
        } else {
            tracing::error!(
                target: DISPATCH_TARGET,
                event = "recovery_missing",
                error = %failure,
                "unrecovered dispatch failure"
            );
        }
    }
}
