//! Shared doubles for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use crate::errors::DispatchError;
use crate::http::Request;
use crate::kernel::OutcomeKind;
use crate::logic::LogicRef;
use crate::reporter::DispatchReporter;

/// Lifecycle event captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReportEvent {
    RunStarted(String),
    RunFinished(OutcomeKind),
    RecoveryStarted(String),
    RecoveryMissing(Option<u16>),
}

/// Reporter that records every event for later assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub(crate) fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().expect("reporter lock poisoned").clone()
    }

    fn push(&self, event: ReportEvent) {
        self.events
            .lock()
            .expect("reporter lock poisoned")
            .push(event);
    }
}

impl DispatchReporter for RecordingReporter {
    fn run_started(&self, request: &Request) {
        self.push(ReportEvent::RunStarted(request.route_query()));
    }

    fn run_finished(&self, outcome: OutcomeKind, _elapsed: Duration) {
        self.push(ReportEvent::RunFinished(outcome));
    }

    fn recovery_started(&self, _trigger: &DispatchError, target: &LogicRef) {
        self.push(ReportEvent::RecoveryStarted(target.to_string()));
    }

    fn recovery_missing(&self, failure: &DispatchError) {
        self.push(ReportEvent::RecoveryMissing(
            failure.status().map(|status| status.as_u16()),
        ));
    }
}
