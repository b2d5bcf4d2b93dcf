//! Per-request working state and its re-entrant continuation.
//!
//! A [`Context`] holds one request/response exchange while it moves through
//! the pipeline. [`Context::forward`] is the only way to hand work to another
//! logic unit: it snapshots the context, points the copy at the new target
//! and asks the kernel's [`Forwarder`] to run the whole pipeline again on it.
//! The caller's context is never observed or mutated by the continuation.
//!
//! Cloning copies the request, response, route, params, user and captured
//! error by value. The logic is shared through an `Arc` but logic units are
//! never mutated in place, so sharing is indistinguishable from copying. The
//! tracing span and the forwarder are shared by reference.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::Span;

use crate::auth::Identity;
use crate::errors::DispatchError;
use crate::http::{Emitted, Request, Response, StatusCode};
use crate::logic::{Logic, LogicRef};
use crate::routing::RouteMatch;
use crate::templating::TemplateScope;

/// Re-entry point used by [`Context::forward`].
pub trait Forwarder: Send + Sync {
    /// Runs the pipeline on `context` with `target` as its logic.
    ///
    /// # Errors
    ///
    /// Returns any failure raised by the re-entered pipeline.
    fn forward(&self, context: Context, target: LogicRef) -> Result<Context, DispatchError>;
}

/// Submitted values selected by [`Context::post_value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostValues<'a> {
    /// Every submitted value (no keys requested).
    All(&'a BTreeMap<String, String>),
    /// The single requested value.
    One(Option<&'a str>),
    /// Requested values in key order.
    Many(Vec<Option<&'a str>>),
}

/// State of a single request exchange.
#[derive(Clone)]
pub struct Context {
    request: Request,
    response: Response,
    route: Option<RouteMatch>,
    params: Vec<String>,
    logic: Option<Arc<Logic>>,
    user: Option<Identity>,
    error: Option<Arc<DispatchError>>,
    logger: Span,
    forwarder: Option<Arc<dyn Forwarder>>,
    depth: u32,
    template_scope: Option<TemplateScope>,
}

impl Context {
    /// Creates a context for `request` with an empty response.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::new(),
            route: None,
            params: Vec::new(),
            logic: None,
            user: None,
            error: None,
            logger: Span::none(),
            forwarder: None,
            depth: 0,
            template_scope: None,
        }
    }

    /// Replaces the response.
    #[must_use]
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = response;
        self
    }

    /// Request being served.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Response under construction.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// Mutable access to the response.
    pub const fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Replaces the response.
    pub fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    /// Route match, when the request was routed.
    #[must_use]
    pub const fn route(&self) -> Option<&RouteMatch> {
        self.route.as_ref()
    }

    /// Stores a route match and adopts its params and logic.
    pub fn set_route(&mut self, route: RouteMatch) {
        self.params = route.params().to_vec();
        self.logic = Some(Arc::clone(route.logic()));
        self.route = Some(route);
    }

    /// Positional parameters for the logic method.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Replaces the positional parameters.
    pub fn set_params(&mut self, params: Vec<String>) {
        self.params = params;
    }

    /// Logic driving this pass.
    #[must_use]
    pub const fn logic(&self) -> Option<&Arc<Logic>> {
        self.logic.as_ref()
    }

    /// Sets or clears the logic.
    pub fn set_logic(&mut self, logic: Option<Arc<Logic>>) {
        self.logic = logic;
    }

    /// Authenticated caller.
    #[must_use]
    pub const fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    /// Sets the authenticated caller.
    pub fn set_user(&mut self, user: Option<Identity>) {
        self.user = user;
    }

    /// Failure that triggered the current recovery pass.
    #[must_use]
    pub const fn error(&self) -> Option<&Arc<DispatchError>> {
        self.error.as_ref()
    }

    /// Records a failure and the status the recovery response should carry.
    pub fn capture(&mut self, error: Arc<DispatchError>, status: StatusCode) {
        self.error = Some(error);
        self.response.set_status(status);
    }

    /// Span that scopes this request's log events.
    #[must_use]
    pub const fn logger(&self) -> &Span {
        &self.logger
    }

    /// Replaces the span.
    pub fn set_logger(&mut self, logger: Span) {
        self.logger = logger;
    }

    /// Returns `true` once a kernel has attached its re-entry point.
    #[must_use]
    pub const fn has_forwarder(&self) -> bool {
        self.forwarder.is_some()
    }

    /// Attaches the re-entry point used by [`Context::forward`].
    pub fn set_forwarder(&mut self, forwarder: Arc<dyn Forwarder>) {
        self.forwarder = Some(forwarder);
    }

    /// Number of forwards between the root context and this one.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Request-scoped template bindings, when a presentation layer set them.
    #[must_use]
    pub const fn template_scope(&self) -> Option<&TemplateScope> {
        self.template_scope.as_ref()
    }

    /// Stores request-scoped template bindings.
    pub fn set_template_scope(&mut self, scope: TemplateScope) {
        self.template_scope = Some(scope);
    }

    /// Builds a URL on the request's origin from path parts joined by `/`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidUri`] when the result is not a valid
    /// URL.
    pub fn make_url(&self, parts: &[&str]) -> Result<String, DispatchError> {
        self.request.uri().make(&parts.join("/"))
    }

    /// Reads submitted values: all of them for no keys, one for a single key,
    /// or an ordered list for several.
    #[must_use]
    pub fn post_value<'a>(&'a self, keys: &[&str]) -> PostValues<'a> {
        match keys {
            [] => PostValues::All(self.request.values()),
            [key] => PostValues::One(self.request.value(key)),
            many => PostValues::Many(many.iter().map(|key| self.request.value(key)).collect()),
        }
    }

    /// Independent copy of this context.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Re-runs the pipeline on a snapshot of this context targeting
    /// `target`, with `args` as its positional parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MissingForwarder`] when no kernel has
    /// attached a re-entry point, or whatever the re-entered pipeline fails
    /// with.
    pub fn forward(
        &self,
        target: impl Into<LogicRef>,
        args: Vec<String>,
    ) -> Result<Self, DispatchError> {
        let forwarder = self
            .forwarder
            .as_ref()
            .map(Arc::clone)
            .ok_or(DispatchError::MissingForwarder)?;
        let destination = target.into();

        let mut continuation = self.snapshot();
        continuation.params = args;
        continuation.logic = match &destination {
            LogicRef::Logic(logic) => Some(Arc::clone(logic)),
            LogicRef::Name(_) | LogicRef::Method(_) => None,
        };
        continuation.depth = self.depth.saturating_add(1);

        forwarder.forward(continuation, destination)
    }

    /// Finalises the response for emission.
    #[must_use]
    pub fn end(self) -> Emitted {
        self.response.finalize()
    }

    /// JSON view of the context for templates and diagnostics.
    #[must_use]
    pub fn summary(&self) -> Value {
        json!({
            "method": self.request.method().to_string(),
            "path": self.request.path(),
            "logic": self.logic.as_ref().map(|logic| logic.name().to_owned()),
            "params": self.params,
            "user": self.user,
            "error": self.error.as_ref().map(ToString::to_string),
            "depth": self.depth,
        })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Context")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("route", &self.route)
            .field("params", &self.params)
            .field("logic", &self.logic.as_ref().map(|logic| logic.name()))
            .field("user", &self.user)
            .field("error", &self.error)
            .field("depth", &self.depth)
            .field("forwarder", &self.forwarder.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
