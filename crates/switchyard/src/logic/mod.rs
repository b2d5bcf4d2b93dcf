//! Logic units: named operations the dispatcher can route to.
//!
//! A [`Logic`] carries its route pattern, required access rank, render mode,
//! optional view and a bindable method. The method starts as a raw
//! [`MethodRef`] and is bound to an [`Invocable`] at most once per unit: the
//! binding lives in a `OnceCell`, so concurrent first dispatches of a shared
//! unit resolve through the [`Resolver`] exactly once and all observe the
//! same result.
//!
//! Metadata discovered while binding is never written back into the shared
//! unit. The pipeline applies it to a request-private copy instead.

mod patch;
mod pattern;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

pub use self::patch::{LogicPatch, RenderMode};
pub use self::pattern::{HttpPattern, MethodFilter, Segment};
use crate::errors::{DispatchError, HttpEvent};
use crate::resolver::{Invocable, MethodRef, Resolver};

/// Result of binding a logic method.
#[derive(Debug, Clone)]
pub struct Binding {
    invocable: Invocable,
    discovered: LogicPatch,
}

impl Binding {
    /// Callable handler.
    #[must_use]
    pub const fn invocable(&self) -> &Invocable {
        &self.invocable
    }

    /// Attributes read from the handler's annotations.
    #[must_use]
    pub const fn discovered(&self) -> &LogicPatch {
        &self.discovered
    }
}

#[derive(Debug, Clone, Default)]
struct Method {
    raw: Option<MethodRef>,
    bound: OnceCell<Binding>,
}

/// A named operation.
#[derive(Debug, Clone)]
pub struct Logic {
    name: String,
    http: Option<HttpPattern>,
    access: u32,
    render: RenderMode,
    view: Option<String>,
    method: Method,
}

impl Logic {
    /// Creates a public, text-rendered logic with no method.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            http: None,
            access: 0,
            render: RenderMode::default(),
            view: None,
            method: Method::default(),
        }
    }

    /// Creates a logic from statically declared attributes.
    #[must_use]
    pub fn declare(name: impl Into<String>, patch: &LogicPatch, method: Option<MethodRef>) -> Self {
        let mut logic = Self::new(name);
        logic.apply_patch(patch);
        logic.method.raw = method;
        logic
    }

    /// Creates a logic by resolving `method` immediately and applying its
    /// declared annotations.
    ///
    /// # Errors
    ///
    /// Returns a not-implemented event when the resolver cannot bind
    /// `method`, or an annotation error when its metadata is malformed.
    pub fn resolve(
        name: impl Into<String>,
        method: MethodRef,
        resolver: &dyn Resolver,
    ) -> Result<Self, DispatchError> {
        let mut logic = Self::new(name);
        let invocable = resolver.of(&method).ok_or_else(|| {
            HttpEvent::not_implemented(format!("invalid method for #{}", logic.name))
        })?;
        let patch = LogicPatch::from_annotations(invocable.annotations())?;
        logic.apply_patch(&patch);
        logic.method = Method {
            raw: Some(method),
            bound: OnceCell::with_value(Binding {
                invocable,
                discovered: LogicPatch::new(),
            }),
        };
        Ok(logic)
    }

    /// Replaces the raw method, discarding any binding.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<MethodRef>) -> Self {
        self.method = Method {
            raw: Some(method.into()),
            bound: OnceCell::new(),
        };
        self
    }

    /// Applies every set field of `patch`.
    pub fn apply_patch(&mut self, patch: &LogicPatch) {
        if let Some(http) = &patch.http {
            self.http = Some(http.clone());
        }
        if let Some(access) = patch.access {
            self.access = access;
        }
        if let Some(render) = patch.render {
            self.render = render;
        }
        if let Some(view) = &patch.view {
            self.view = Some(view.clone());
        }
    }

    /// Consuming form of [`Logic::apply_patch`].
    #[must_use]
    pub fn with_patch(mut self, patch: &LogicPatch) -> Self {
        self.apply_patch(patch);
        self
    }

    /// Returns `true` if applying `patch` would change any attribute.
    #[must_use]
    pub fn would_change(&self, patch: &LogicPatch) -> bool {
        patch.http.as_ref().is_some_and(|http| self.http.as_ref() != Some(http))
            || patch.access.is_some_and(|access| access != self.access)
            || patch.render.is_some_and(|render| render != self.render)
            || patch.view.as_ref().is_some_and(|view| self.view.as_ref() != Some(view))
    }

    /// Binds the method, resolving it on first use only.
    ///
    /// # Errors
    ///
    /// Returns a not-implemented event when there is no method or the
    /// resolver cannot bind it. A failed bind is retried on the next call.
    pub fn bind(&self, resolver: &dyn Resolver) -> Result<&Binding, DispatchError> {
        self.method.bound.get_or_try_init(|| {
            let raw = self.method.raw.as_ref().ok_or_else(|| {
                HttpEvent::not_implemented(format!("no method declared for #{}", self.name))
            })?;
            let invocable = resolver.of(raw).ok_or_else(|| {
                HttpEvent::not_implemented(format!("invalid method for #{}", self.name))
            })?;
            let discovered = LogicPatch::from_annotations(invocable.annotations())?;
            Ok(Binding {
                invocable,
                discovered,
            })
        })
    }

    /// Returns `true` once the method has been bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.method.bound.get().is_some()
    }

    /// Unique name within a dispatcher.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route pattern, if the logic is directly routable.
    #[must_use]
    pub const fn http(&self) -> Option<&HttpPattern> {
        self.http.as_ref()
    }

    /// Required access rank; `0` is public.
    #[must_use]
    pub const fn access(&self) -> u32 {
        self.access
    }

    /// Render mode.
    #[must_use]
    pub const fn render(&self) -> RenderMode {
        self.render
    }

    /// Template view, if any.
    #[must_use]
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// Raw method reference.
    #[must_use]
    pub const fn method(&self) -> Option<&MethodRef> {
        self.method.raw.as_ref()
    }
}

/// How a logic is registered with a dispatcher.
#[derive(Debug, Clone)]
pub enum LogicSpec {
    /// Static attributes plus an optional method bound lazily on first
    /// dispatch.
    Declared {
        /// Declared attributes.
        patch: LogicPatch,
        /// Method to bind later.
        method: Option<MethodRef>,
    },
    /// A method resolved at build time; attributes come from its annotations.
    Reflect(MethodRef),
}

impl LogicSpec {
    /// Declares a logic with a lazily bound method.
    #[must_use]
    pub fn declared(patch: LogicPatch, method: impl Into<MethodRef>) -> Self {
        Self::Declared {
            patch,
            method: Some(method.into()),
        }
    }

    /// Registers a logic resolved from its method's annotations.
    #[must_use]
    pub fn reflect(method: impl Into<MethodRef>) -> Self {
        Self::Reflect(method.into())
    }

    /// Turns the spec into a logic named `name`.
    ///
    /// # Errors
    ///
    /// Reflected specs fail as [`Logic::resolve`] does.
    pub fn into_logic(self, name: &str, resolver: &dyn Resolver) -> Result<Logic, DispatchError> {
        match self {
            Self::Declared { patch, method } => Ok(Logic::declare(name, &patch, method)),
            Self::Reflect(method) => Logic::resolve(name, method, resolver),
        }
    }
}

impl From<MethodRef> for LogicSpec {
    fn from(method: MethodRef) -> Self {
        Self::Reflect(method)
    }
}

impl From<Invocable> for LogicSpec {
    fn from(invocable: Invocable) -> Self {
        Self::Reflect(MethodRef::Invocable(invocable))
    }
}

/// Target of a forward or a recovery.
#[derive(Debug, Clone)]
pub enum LogicRef {
    /// A registered logic, looked up by name.
    Name(String),
    /// An unregistered method wrapped in an ephemeral logic.
    Method(MethodRef),
    /// A logic used as-is.
    Logic(Arc<Logic>),
}

impl From<&str> for LogicRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for LogicRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<MethodRef> for LogicRef {
    fn from(method: MethodRef) -> Self {
        Self::Method(method)
    }
}

impl From<Logic> for LogicRef {
    fn from(logic: Logic) -> Self {
        Self::Logic(Arc::new(logic))
    }
}

impl From<Arc<Logic>> for LogicRef {
    fn from(logic: Arc<Logic>) -> Self {
        Self::Logic(logic)
    }
}

impl fmt::Display for LogicRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(formatter, "#{name}"),
            Self::Method(method) => write!(formatter, "{method}"),
            Self::Logic(logic) => write!(formatter, "#{}", logic.name()),
        }
    }
}
