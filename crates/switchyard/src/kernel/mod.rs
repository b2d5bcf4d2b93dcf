//! Request lifecycle shared by every dispatcher.
//!
//! [`Kernel::run`] drives one request through a fixed sequence:
//!
//! 1. obtain a [`Context`] (supplied by the caller or built by
//!    [`Kernel::context`]);
//! 2. stamp cross-cutting fields in [`Kernel::before`];
//! 3. delegate to [`Kernel::proceed`];
//! 4. on failure, consult the [`Recovery`] tables and, when a target is
//!    registered, re-dispatch onto it through [`Context::forward`];
//! 5. always call [`Kernel::after`] and report the elapsed time.
//!
//! The result is a [`DispatchOutcome`], so the recovery path is visible in
//! the return type. A recovery pass that itself fails is reported as
//! [`DispatchOutcome::Unrecovered`] and is never offered to the tables
//! again; together with the forward depth limit this stops a recovery logic
//! from forwarding into its own failure indefinitely.

mod recovery;

use std::sync::Arc;
use std::time::Instant;

use strum::Display;

pub use self::recovery::{ErrorCategory, Recovery};
use crate::context::Context;
use crate::errors::DispatchError;
use crate::http::StatusCode;
use crate::reporter::DispatchReporter;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Which path a run took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeKind {
    /// The pipeline completed on the first pass.
    Rendered,
    /// A failure was recovered by forwarding to a recovery logic.
    Recovered,
    /// The failure reached the caller.
    Unrecovered,
}

/// Failure that escaped a run.
#[derive(Debug)]
pub struct Unrecovered {
    /// The failure handed back to the caller.
    pub error: DispatchError,
    /// Context as it stood when the failure escaped, if one was obtained.
    pub context: Option<Box<Context>>,
}

/// Result of [`Kernel::run`].
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The pipeline produced the response directly.
    Rendered(Context),
    /// A recovery logic produced the response.
    Recovered(Context),
    /// No recovery applied.
    Unrecovered(Unrecovered),
}

impl DispatchOutcome {
    fn unrecovered(error: DispatchError, context: Option<Context>) -> Self {
        Self::Unrecovered(Unrecovered {
            error,
            context: context.map(Box::new),
        })
    }

    /// Path the run took.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Rendered(_) => OutcomeKind::Rendered,
            Self::Recovered(_) => OutcomeKind::Recovered,
            Self::Unrecovered(_) => OutcomeKind::Unrecovered,
        }
    }

    /// Final context, when one exists.
    #[must_use]
    pub fn context(&self) -> Option<&Context> {
        match self {
            Self::Rendered(context) | Self::Recovered(context) => Some(context),
            Self::Unrecovered(unrecovered) => unrecovered.context.as_deref(),
        }
    }

    /// Collapses the outcome into a `Result`, discarding whether recovery
    /// happened.
    ///
    /// # Errors
    ///
    /// Returns the escaped failure for [`DispatchOutcome::Unrecovered`].
    pub fn into_result(self) -> Result<Context, DispatchError> {
        match self {
            Self::Rendered(context) | Self::Recovered(context) => Ok(context),
            Self::Unrecovered(unrecovered) => Err(unrecovered.error),
        }
    }
}

/// Abstract request lifecycle.
pub trait Kernel {
    /// Builds a context for the current request when the caller supplied
    /// none.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RequestSource`] when no request is available.
    fn context(&self) -> Result<Context, DispatchError>;

    /// Stamps cross-cutting fields before the pipeline runs.
    fn before(&self, context: Context) -> Context {
        stamp_logger(context)
    }

    /// Runs the dispatch pipeline.
    ///
    /// # Errors
    ///
    /// Returns the failure that interrupted the pipeline.
    fn proceed(&self, context: &mut Context) -> Result<(), DispatchError>;

    /// Called on the way out of every run, including failed ones.
    fn after(&self, _context: Option<&Context>) {}

    /// Event and error recovery tables.
    fn recovery(&self) -> &Recovery;

    /// Lifecycle observer.
    fn reporter(&self) -> &dyn DispatchReporter;

    /// Serves one request.
    fn run(&self, context: Option<Context>) -> DispatchOutcome {
        let started = Instant::now();

        let acquired = match context {
            Some(supplied) => Ok(supplied),
            None => self.context(),
        };
        let mut current = match acquired {
            Ok(fresh) => self.before(fresh),
            Err(error) => {
                self.reporter().recovery_missing(&error);
                self.after(None);
                let outcome = DispatchOutcome::unrecovered(error, None);
                self.reporter().run_finished(outcome.kind(), started.elapsed());
                return outcome;
            }
        };

        let span = current.logger().clone();
        let _entered = span.enter();
        self.reporter().run_started(current.request());

        let outcome = match self.proceed(&mut current) {
            Ok(()) => DispatchOutcome::Rendered(current),
            Err(error) => self.recover(current, error),
        };

        self.after(outcome.context());
        self.reporter().run_finished(outcome.kind(), started.elapsed());
        outcome
    }

    /// Offers `error` to the recovery tables and forwards to the matching
    /// target.
    ///
    /// The captured response status is the event's status, or `500` for
    /// application errors.
    fn recover(&self, mut context: Context, error: DispatchError) -> DispatchOutcome {
        let Some(target) = self.recovery().target_for(&error).cloned() else {
            self.reporter().recovery_missing(&error);
            return DispatchOutcome::unrecovered(error, Some(context));
        };

        self.reporter().recovery_started(&error, &target);
        let status = error.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        context.capture(Arc::new(error), status);

        match context.forward(target, Vec::new()) {
            Ok(recovered) => DispatchOutcome::Recovered(recovered),
            Err(failure) => {
                self.reporter().recovery_missing(&failure);
                DispatchOutcome::unrecovered(failure, Some(context))
            }
        }
    }
}

/// Gives `context` a dispatch span unless it already carries one.
#[must_use]
pub fn stamp_logger(mut context: Context) -> Context {
    if context.logger().is_none() {
        let span = tracing::info_span!(
            target: DISPATCH_TARGET,
            "dispatch",
            method = %context.request().method(),
            path = %context.request().path(),
        );
        context.set_logger(span);
    }
    context
}

#[cfg(test)]
mod tests;
