//! The REST dispatcher: a [`Kernel`] with a five-stage pipeline.
//!
//! [`Rest::builder`] collects logic specs, collaborators and recovery
//! targets. [`RestBuilder::build`] resolves reflected specs, registers
//! routable logic units with the router and freezes everything into a
//! [`Rest`] handle. The handle is cheap to clone and safe to share between
//! threads; no request path mutates its registry, router or recovery tables.
//!
//! Each pass through [`Kernel::proceed`] runs, in order:
//!
//! 1. **route**: match `"METHOD /path"` unless a forward already chose the
//!    logic (`404` when nothing matches);
//! 2. **guard**: compare the statically declared access rank with the
//!    caller's rank (`401` anonymous, `403` under-ranked);
//! 3. **resolve**: bind the method once per logic unit (`501` when it cannot
//!    be bound) and apply discovered metadata to a request-private copy,
//!    guarding again if that raised the access rank;
//! 4. **execute**: call the method with the positional parameters and the
//!    context;
//! 5. **render**: hand pending content to the [`RenderStage`].

mod pipeline;
mod render;

use std::fmt;
use std::sync::Arc;

use switchyard_config::KernelConfig;
use tracing::{debug, info};
use uuid::Uuid;

pub use self::render::{BaseRender, RenderStage};
pub(crate) use self::render::render_base;
use crate::auth::{Anonymous, Auth};
use crate::context::{Context, Forwarder};
use crate::errors::DispatchError;
use crate::http::{RequestSource, StatusCode};
use crate::kernel::{DISPATCH_TARGET, ErrorCategory, Kernel, Recovery, stamp_logger};
use crate::logic::{Logic, LogicRef, LogicSpec};
use crate::reporter::{DispatchReporter, StructuredDispatchReporter};
use crate::resolver::{HandlerTable, Resolver};
use crate::routing::{PatternRouter, Router};

/// Frozen dispatcher state shared by every handle and forwarded context.
pub(crate) struct RestCore<S> {
    logics: Vec<(String, Arc<Logic>)>,
    router: Box<dyn Router>,
    auth: Arc<dyn Auth>,
    resolver: Arc<dyn Resolver>,
    requests: Option<Arc<dyn RequestSource>>,
    recovery: Recovery,
    reporter: Arc<dyn DispatchReporter>,
    renderer: S,
    max_forward_depth: u32,
}

impl<S: RenderStage> RestCore<S> {
    fn logic(&self, name: &str) -> Result<Arc<Logic>, DispatchError> {
        self.logics
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, logic)| Arc::clone(logic))
            .ok_or_else(|| DispatchError::unknown_logic(name))
    }

    fn proceed(&self, context: &mut Context) -> Result<(), DispatchError> {
        pipeline::route(self.router.as_ref(), context)?;
        pipeline::guard(self.auth.as_ref(), context)?;
        if pipeline::resolve(self.resolver.as_ref(), context)? {
            pipeline::guard(self.auth.as_ref(), context)?;
        }
        pipeline::execute(self.resolver.as_ref(), context)?;
        self.renderer.render(context)
    }

    /// Resolves a forward target to a logic unit.
    ///
    /// Bare methods become ephemeral units named after the captured event's
    /// status, or a random id when there is none.
    fn target(&self, context: &Context, target: LogicRef) -> Result<Arc<Logic>, DispatchError> {
        match target {
            LogicRef::Logic(logic) => Ok(logic),
            LogicRef::Name(name) => self.logic(&name),
            LogicRef::Method(method) => {
                let name = context
                    .error()
                    .and_then(|error| error.status())
                    .map_or_else(|| Uuid::new_v4().to_string(), |status| status.to_string());
                Logic::resolve(name, method, self.resolver.as_ref()).map(Arc::new)
            }
        }
    }
}

impl<S: RenderStage> Forwarder for RestCore<S> {
    fn forward(&self, context: Context, target: LogicRef) -> Result<Context, DispatchError> {
        if context.depth() > self.max_forward_depth {
            return Err(DispatchError::ForwardDepthExceeded {
                depth: context.depth(),
                limit: self.max_forward_depth,
            });
        }

        let logic = self.target(&context, target)?;
        debug!(
            target: DISPATCH_TARGET,
            logic = logic.name(),
            depth = context.depth(),
            "forwarding"
        );
        let mut continuation = self.renderer.prepare(context);
        continuation.set_logic(Some(logic));
        self.proceed(&mut continuation)?;
        Ok(continuation)
    }
}

/// Dispatcher handle.
pub struct Rest<S = BaseRender> {
    core: Arc<RestCore<S>>,
}

impl<S> Clone for Rest<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S> fmt::Debug for Rest<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Rest")
            .field(
                "logics",
                &self
                    .core
                    .logics
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("recovery", &self.core.recovery)
            .field("max_forward_depth", &self.core.max_forward_depth)
            .finish_non_exhaustive()
    }
}

impl Rest {
    /// Starts configuring a dispatcher with JSON/text rendering.
    #[must_use]
    pub fn builder() -> RestBuilder {
        RestBuilder::new(BaseRender)
    }
}

impl<S: RenderStage + 'static> Rest<S> {
    /// Looks up a registered logic unit.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownLogic`] when `name` is not registered.
    pub fn logic(&self, name: &str) -> Result<Arc<Logic>, DispatchError> {
        self.core.logic(name)
    }

    /// Registered logic names in registration order.
    pub fn logic_names(&self) -> impl Iterator<Item = &str> {
        self.core.logics.iter().map(|(name, _)| name.as_str())
    }

    /// Re-enters the pipeline on `context` with `target` as its logic.
    ///
    /// # Errors
    ///
    /// Returns the failure raised by the re-entered pipeline, or
    /// [`DispatchError::ForwardDepthExceeded`] past the configured depth.
    pub fn forward(
        &self,
        context: Context,
        target: impl Into<LogicRef>,
    ) -> Result<Context, DispatchError> {
        self.core.forward(self.before(context), target.into())
    }

    /// Maximum number of nested forwards per run.
    #[must_use]
    pub fn max_forward_depth(&self) -> u32 {
        self.core.max_forward_depth
    }
}

impl<S: RenderStage + 'static> Kernel for Rest<S> {
    fn context(&self) -> Result<Context, DispatchError> {
        debug!(target: DISPATCH_TARGET, "generating context");
        let source = self
            .core
            .requests
            .as_ref()
            .ok_or_else(|| DispatchError::request_source("no request source configured"))?;
        source.current().map(Context::new)
    }

    fn before(&self, mut context: Context) -> Context {
        if !context.has_forwarder() {
            let forwarder: Arc<dyn Forwarder> = self.core.clone();
            context.set_forwarder(forwarder);
        }
        self.core.renderer.prepare(stamp_logger(context))
    }

    fn proceed(&self, context: &mut Context) -> Result<(), DispatchError> {
        self.core.proceed(context)
    }

    fn recovery(&self) -> &Recovery {
        &self.core.recovery
    }

    fn reporter(&self) -> &dyn DispatchReporter {
        self.core.reporter.as_ref()
    }
}

/// Mutable configuration for a [`Rest`] dispatcher.
pub struct RestBuilder<S = BaseRender> {
    specs: Vec<(String, LogicSpec)>,
    router: Box<dyn Router>,
    auth: Arc<dyn Auth>,
    resolver: Arc<dyn Resolver>,
    requests: Option<Arc<dyn RequestSource>>,
    recovery: Recovery,
    reporter: Arc<dyn DispatchReporter>,
    renderer: S,
    max_forward_depth: u32,
}

impl<S> RestBuilder<S> {
    pub(crate) fn new(renderer: S) -> Self {
        Self {
            specs: Vec::new(),
            router: Box::new(PatternRouter::new()),
            auth: Arc::new(Anonymous),
            resolver: Arc::new(HandlerTable::new()),
            requests: None,
            recovery: Recovery::new(),
            reporter: Arc::new(StructuredDispatchReporter::new()),
            renderer,
            max_forward_depth: switchyard_config::DEFAULT_MAX_FORWARD_DEPTH,
        }
    }

    /// Swaps the render stage, keeping everything else.
    pub(crate) fn with_renderer<T>(self, renderer: T) -> RestBuilder<T> {
        RestBuilder {
            specs: self.specs,
            router: self.router,
            auth: self.auth,
            resolver: self.resolver,
            requests: self.requests,
            recovery: self.recovery,
            reporter: self.reporter,
            renderer,
            max_forward_depth: self.max_forward_depth,
        }
    }

    /// Registers a logic unit. A later registration under the same name
    /// replaces the earlier one in place.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, spec: impl Into<LogicSpec>) -> Self {
        let key = name.into();
        let entry = spec.into();
        match self.specs.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => {
                debug!(target: DISPATCH_TARGET, logic = %key, "replacing logic");
                slot.1 = entry;
            }
            None => self.specs.push((key, entry)),
        }
        self
    }

    /// Registers several logic units.
    #[must_use]
    pub fn merge<I, N, L>(self, specs: I) -> Self
    where
        I: IntoIterator<Item = (N, L)>,
        N: Into<String>,
        L: Into<LogicSpec>,
    {
        specs
            .into_iter()
            .fold(self, |builder, (name, spec)| builder.set(name, spec))
    }

    /// Recovers events carrying `status` by forwarding to `target`.
    #[must_use]
    pub fn on_event(mut self, status: impl Into<StatusCode>, target: impl Into<LogicRef>) -> Self {
        self.recovery.on_event(status.into(), target.into());
        self
    }

    /// Recovers failures caused by an `E` by forwarding to `target`.
    #[must_use]
    pub fn on_error<E>(mut self, target: impl Into<LogicRef>) -> Self
    where
        E: std::error::Error + 'static,
    {
        self.recovery.on_error(ErrorCategory::of::<E>(), target.into());
        self
    }

    /// Recovers every application failure not matched by an earlier
    /// category.
    #[must_use]
    pub fn on_any_error(mut self, target: impl Into<LogicRef>) -> Self {
        self.recovery.on_error(ErrorCategory::any(), target.into());
        self
    }

    /// Enables or disables the error recovery table.
    #[must_use]
    pub const fn catch(mut self, catch: bool) -> Self {
        self.recovery.set_catch(catch);
        self
    }

    /// Applies runtime configuration.
    #[must_use]
    pub const fn configure(mut self, config: &KernelConfig) -> Self {
        self.recovery.set_catch(config.catch_errors());
        self.max_forward_depth = config.max_forward_depth();
        self
    }

    /// Sets the ceiling on nested forwards.
    #[must_use]
    pub const fn max_forward_depth(mut self, depth: u32) -> Self {
        self.max_forward_depth = depth;
        self
    }

    /// Sets the authentication provider.
    #[must_use]
    pub fn with_auth(mut self, auth: impl Auth + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Sets the method resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Sets the route matcher. Routes are registered at build time.
    #[must_use]
    pub fn with_router(mut self, router: impl Router + 'static) -> Self {
        self.router = Box::new(router);
        self
    }

    /// Sets the source used when [`Kernel::run`] is called without a
    /// context.
    #[must_use]
    pub fn with_request_source(mut self, source: impl RequestSource + 'static) -> Self {
        self.requests = Some(Arc::new(source));
        self
    }

    /// Sets the lifecycle observer.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl DispatchReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }
}

impl<S: RenderStage + 'static> RestBuilder<S> {
    /// Resolves reflected specs, registers routes and freezes the
    /// dispatcher.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised while resolving a reflected spec.
    pub fn build(self) -> Result<Rest<S>, DispatchError> {
        let Self {
            specs,
            mut router,
            auth,
            resolver,
            requests,
            recovery,
            reporter,
            renderer,
            max_forward_depth,
        } = self;

        let mut logics = Vec::with_capacity(specs.len());
        for (name, spec) in specs {
            let logic = Arc::new(spec.into_logic(&name, resolver.as_ref())?);
            if let Some(pattern) = logic.http() {
                router.add(pattern.clone(), Arc::clone(&logic));
            }
            logics.push((name, logic));
        }
        info!(
            target: DISPATCH_TARGET,
            logics = logics.len(),
            max_forward_depth,
            catch = recovery.catches(),
            "dispatcher built"
        );

        Ok(Rest {
            core: Arc::new(RestCore {
                logics,
                router,
                auth,
                resolver,
                requests,
                recovery,
                reporter,
                renderer,
                max_forward_depth,
            }),
        })
    }
}
