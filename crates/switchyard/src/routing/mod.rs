//! Route matching from `"METHOD /path"` queries to logic units.
//!
//! The dispatcher only depends on the [`Router`] trait. [`PatternRouter`] is
//! the in-crate implementation: it scans registered [`HttpPattern`]s and
//! prefers the match with the most literal segments, falling back to
//! registration order on ties.

use std::fmt;
use std::sync::Arc;

use crate::http::HttpMethod;
use crate::logic::{HttpPattern, Logic};

/// Successful route lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    logic: Arc<Logic>,
    params: Vec<String>,
    pattern: HttpPattern,
}

impl RouteMatch {
    /// Creates a match result.
    #[must_use]
    pub const fn new(logic: Arc<Logic>, params: Vec<String>, pattern: HttpPattern) -> Self {
        Self {
            logic,
            params,
            pattern,
        }
    }

    /// Matched logic.
    #[must_use]
    pub const fn logic(&self) -> &Arc<Logic> {
        &self.logic
    }

    /// Positional parameters captured from the path.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Pattern that matched.
    #[must_use]
    pub const fn pattern(&self) -> &HttpPattern {
        &self.pattern
    }
}

/// Route matcher used by the dispatcher.
pub trait Router: Send + Sync {
    /// Registers `logic` under `pattern`.
    fn add(&mut self, pattern: HttpPattern, logic: Arc<Logic>);

    /// Finds the logic for a `"METHOD /path"` query.
    fn find(&self, query: &str) -> Option<RouteMatch>;
}

/// Linear matcher preferring the most specific pattern.
#[derive(Default)]
pub struct PatternRouter {
    routes: Vec<(HttpPattern, Arc<Logic>)>,
}

impl PatternRouter {
    /// Creates an empty router.
    #[must_use]
    pub const fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` when no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for PatternRouter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(
                self.routes
                    .iter()
                    .map(|(pattern, logic)| format!("{pattern} -> #{}", logic.name())),
            )
            .finish()
    }
}

impl Router for PatternRouter {
    fn add(&mut self, pattern: HttpPattern, logic: Arc<Logic>) {
        self.routes.push((pattern, logic));
    }

    fn find(&self, query: &str) -> Option<RouteMatch> {
        let (verb, path) = query.split_once(' ')?;
        let method = verb.parse::<HttpMethod>().ok()?;

        let mut best: Option<(usize, RouteMatch)> = None;
        for (pattern, logic) in &self.routes {
            let Some(params) = pattern.matches(method, path) else {
                continue;
            };
            let specificity = pattern.specificity();
            if best
                .as_ref()
                .is_some_and(|(current, _)| *current >= specificity)
            {
                continue;
            }
            best = Some((
                specificity,
                RouteMatch::new(Arc::clone(logic), params, pattern.clone()),
            ));
        }
        best.map(|(_, found)| found)
    }
}

#[cfg(test)]
mod tests;
