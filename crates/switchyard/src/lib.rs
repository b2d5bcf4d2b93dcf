//! Request dispatch kernel for small web applications.
//!
//! A [`Kernel`] owns the request lifecycle: it builds a [`Context`] for the
//! incoming request, stamps it with a logger, runs the pipeline and, when the
//! pipeline fails, looks up a recovery target and runs the pipeline again for
//! it. [`Rest`] is the concrete dispatcher. Its pipeline routes the request to
//! a [`Logic`] unit, guards it against the caller's access rank, binds the
//! unit's method through a [`Resolver`], executes it and renders whatever
//! content it produced as JSON or text. [`App`] swaps the render stage for one
//! that feeds pending content into a [`Templater`] view.
//!
//! Logic units are registered up front on a [`RestBuilder`]. They may be
//! declared with explicit metadata or reflected from method annotations; the
//! annotations of a method are discovered once, on first use, and applied to
//! a request-private copy so concurrent requests never observe each other's
//! state.
//!
//! ```rust
//! use switchyard::{Context, Kernel, LogicPatch, LogicSpec, MethodRef, Reply, Request, Rest};
//!
//! # fn main() -> Result<(), switchyard::DispatchError> {
//! let hello = LogicSpec::declared(
//!     LogicPatch::new().with_http("GET /hello/{name}")?,
//!     MethodRef::closure(|params, _| Ok(Reply::from(format!("hello {}", params.join(" "))))),
//! );
//! let rest = Rest::builder().set("hello", hello).build()?;
//!
//! let context = Context::new(Request::get("/hello/ada")?);
//! let emitted = rest.run(Some(context)).into_result()?.end();
//! assert_eq!(emitted.body, "hello ada");
//! # Ok(())
//! # }
//! ```
//!
//! Diagnostics are emitted through `tracing` under the
//! `switchyard::dispatch` target; [`telemetry::initialise`] installs a
//! subscriber configured from [`switchyard_config::KernelConfig`].

mod app;
mod auth;
mod context;
mod errors;
mod http;
mod kernel;
mod logic;
mod reporter;
mod resolver;
mod rest;
mod routing;
pub mod telemetry;
mod templating;

pub use app::{App, TemplateRender};
pub use auth::{Anonymous, Auth, Identity, TokenAuth};
pub use context::{Context, Forwarder, PostValues};
pub use errors::{DispatchError, HttpEvent};
pub use http::{
    Emitted, HttpMethod, Request, RequestSource, Response, ResponseWriter, StatusCode, Uri,
};
pub use kernel::{
    DispatchOutcome, ErrorCategory, Kernel, OutcomeKind, Recovery, Unrecovered, stamp_logger,
};
pub use logic::{
    Binding, HttpPattern, Logic, LogicPatch, LogicRef, LogicSpec, MethodFilter, RenderMode,
    Segment,
};
pub use reporter::{DispatchReporter, StructuredDispatchReporter};
pub use resolver::{
    Annotations, HandlerFn, HandlerTable, Invocable, MethodRef, Reply, Resolver,
};
pub use rest::{BaseRender, RenderStage, Rest, RestBuilder};
pub use routing::{PatternRouter, RouteMatch, Router};
pub use switchyard_config::{KernelConfig, LogFormat};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use templating::{Helper, StaticTemplater, TemplateScope, Templater};

#[cfg(test)]
mod tests;
