//! Recovery tables consulted when a pipeline pass fails.

use std::any::type_name;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use crate::errors::DispatchError;
use crate::http::StatusCode;
use crate::logic::LogicRef;

type Matcher = fn(&(dyn StdError + 'static)) -> bool;

/// Category of application failure, matched against an error and every
/// error in its `source()` chain.
#[derive(Clone, Copy)]
pub struct ErrorCategory {
    name: &'static str,
    matches: Matcher,
}

impl ErrorCategory {
    /// Matches failures that are, or were caused by, an `E`.
    #[must_use]
    pub fn of<E: StdError + 'static>() -> Self {
        Self {
            name: type_name::<E>(),
            matches: is_a::<E>,
        }
    }

    /// Matches every failure.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            name: "*",
            matches: always,
        }
    }

    /// Type name the category was built from.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` when `error` belongs to this category.
    #[must_use]
    pub fn matches(&self, error: &DispatchError) -> bool {
        error.chain().any(|link| (self.matches)(link))
    }
}

fn is_a<E: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<E>()
}

const fn always(_error: &(dyn StdError + 'static)) -> bool {
    true
}

impl fmt::Debug for ErrorCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("ErrorCategory").field(&self.name).finish()
    }
}

/// Event and error recovery tables plus the kernel-wide `catch` switch.
#[derive(Debug, Clone)]
pub struct Recovery {
    events: BTreeMap<StatusCode, LogicRef>,
    errors: Vec<(ErrorCategory, LogicRef)>,
    catch: bool,
}

impl Default for Recovery {
    fn default() -> Self {
        Self {
            events: BTreeMap::new(),
            errors: Vec::new(),
            catch: true,
        }
    }
}

impl Recovery {
    /// Creates empty tables with error recovery enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes events with `status` to `target`, replacing any earlier entry.
    pub fn on_event(&mut self, status: StatusCode, target: LogicRef) {
        self.events.insert(status, target);
    }

    /// Appends an error category; earlier registrations win.
    pub fn on_error(&mut self, category: ErrorCategory, target: LogicRef) {
        self.errors.push((category, target));
    }

    /// Enables or disables the error table. Events are unaffected.
    pub const fn set_catch(&mut self, catch: bool) {
        self.catch = catch;
    }

    /// Whether application errors are offered to the error table.
    #[must_use]
    pub const fn catches(&self) -> bool {
        self.catch
    }

    /// Recovery target for `failure`, if any.
    ///
    /// Events are looked up by status. Other failures are matched against
    /// the error table in registration order, but only while `catch` is on.
    #[must_use]
    pub fn target_for(&self, failure: &DispatchError) -> Option<&LogicRef> {
        match failure.status() {
            Some(status) => self.events.get(&status),
            None if self.catch => self
                .errors
                .iter()
                .find(|(category, _)| category.matches(failure))
                .map(|(_, target)| target),
            None => None,
        }
    }
}
