//! Binding of method references to invocable handlers.
//!
//! A logic unit starts life with a [`MethodRef`]: a handler name, a bare
//! closure, or an already-built [`Invocable`]. The [`Resolver`] turns the
//! reference into an [`Invocable`] that exposes its declared
//! [`Annotations`]. [`HandlerTable`] is the explicit-registration resolver:
//! handlers are registered by name together with their metadata instead of
//! being discovered by reflection.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::errors::DispatchError;
use crate::http::Response;

/// Declared metadata for a handler, keyed by attribute name.
pub type Annotations = BTreeMap<String, Value>;

/// Signature of a logic method: positional parameters plus the context.
pub type HandlerFn = dyn Fn(&[String], &Context) -> Result<Reply, DispatchError> + Send + Sync;

/// Value returned by a logic method.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A finished response that replaces the context's response outright.
    Response(Response),
    /// Raw content left for the render stage.
    Content(Value),
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Value> for Reply {
    fn from(content: Value) -> Self {
        Self::Content(content)
    }
}

impl From<String> for Reply {
    fn from(content: String) -> Self {
        Self::Content(Value::String(content))
    }
}

impl From<&str> for Reply {
    fn from(content: &str) -> Self {
        Self::Content(Value::String(content.to_owned()))
    }
}

/// A resolved, callable handler with its declared metadata.
#[derive(Clone)]
pub struct Invocable {
    handler: Arc<HandlerFn>,
    annotations: Annotations,
}

impl Invocable {
    /// Wraps a handler with no annotations.
    #[must_use]
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&[String], &Context) -> Result<Reply, DispatchError> + Send + Sync + 'static,
    {
        Self::from_shared(Arc::new(handler))
    }

    const fn from_shared(handler: Arc<HandlerFn>) -> Self {
        Self {
            handler,
            annotations: Annotations::new(),
        }
    }

    /// Attaches a single annotation.
    #[must_use]
    pub fn annotate(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Declared metadata.
    #[must_use]
    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Invokes the handler.
    ///
    /// # Errors
    ///
    /// Propagates whatever the handler returns.
    pub fn call(&self, params: &[String], context: &Context) -> Result<Reply, DispatchError> {
        (self.handler)(params, context)
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Invocable")
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

/// Unresolved reference to a logic method.
#[derive(Clone)]
pub enum MethodRef {
    /// Handler registered under a name in the resolver.
    Named(String),
    /// Bare closure with no metadata.
    Closure(Arc<HandlerFn>),
    /// Handler that is already invocable.
    Invocable(Invocable),
}

impl MethodRef {
    /// Wraps a bare closure.
    #[must_use]
    pub fn closure<F>(handler: F) -> Self
    where
        F: Fn(&[String], &Context) -> Result<Reply, DispatchError> + Send + Sync + 'static,
    {
        Self::Closure(Arc::new(handler))
    }
}

impl From<&str> for MethodRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for MethodRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<Invocable> for MethodRef {
    fn from(invocable: Invocable) -> Self {
        Self::Invocable(invocable)
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => formatter.debug_tuple("Named").field(name).finish(),
            Self::Closure(_) => formatter.write_str("Closure(..)"),
            Self::Invocable(invocable) => formatter
                .debug_tuple("Invocable")
                .field(invocable)
                .finish(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => formatter.write_str(name),
            Self::Closure(_) => formatter.write_str("<closure>"),
            Self::Invocable(_) => formatter.write_str("<invocable>"),
        }
    }
}

/// Turns method references into invocables.
pub trait Resolver: Send + Sync {
    /// Resolves `method`, returning `None` when it cannot be bound.
    fn of(&self, method: &MethodRef) -> Option<Invocable>;
}

/// Resolver backed by an explicit name → handler table.
///
/// Closures and invocables resolve to themselves; names resolve only when
/// registered.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Invocable>,
}

impl HandlerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, invocable: Invocable) -> Self {
        self.insert(name, invocable);
        self
    }

    /// Registers a handler under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, invocable: Invocable) {
        self.handlers.insert(name.into(), invocable);
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_set()
            .entries(self.handlers.keys())
            .finish()
    }
}

impl Resolver for HandlerTable {
    fn of(&self, method: &MethodRef) -> Option<Invocable> {
        match method {
            MethodRef::Named(name) => self.handlers.get(name).cloned(),
            MethodRef::Closure(handler) => Some(Invocable::from_shared(Arc::clone(handler))),
            MethodRef::Invocable(invocable) => Some(invocable.clone()),
        }
    }
}

impl<T: Resolver + ?Sized> Resolver for Arc<T> {
    fn of(&self, method: &MethodRef) -> Option<Invocable> {
        (**self).of(method)
    }
}
