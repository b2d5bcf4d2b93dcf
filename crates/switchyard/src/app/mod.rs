//! Presentation extension: template-backed rendering on top of [`Rest`].
//!
//! An [`App`] is a [`Rest`] dispatcher, built with
//! [`RestBuilder::with_templater`], whose render stage hands pending
//! content to a [`Templater`] whenever the logic declares a view. Before each
//! pass it builds a request-scoped [`TemplateScope`] holding:
//!
//! - `url`: joins its arguments with [`Context::make_url`];
//! - `call`: forwards to the named logic with the remaining arguments and
//!   yields the forwarded response body;
//! - `ctx`: a summary of the current context, refreshed at render time.
//!
//! Without a view, rendering falls back to the JSON/text behaviour of
//! [`BaseRender`](crate::rest::BaseRender).

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::Context;
use crate::errors::DispatchError;
use crate::kernel::DISPATCH_TARGET;
use crate::rest::{BaseRender, RenderStage, Rest, RestBuilder, render_base};
use crate::templating::{TemplateScope, Templater};

/// A dispatcher with template rendering.
pub type App = Rest<TemplateRender>;

/// Render stage that prefers templates over JSON/text.
#[derive(Clone)]
pub struct TemplateRender {
    templater: Arc<dyn Templater>,
}

impl TemplateRender {
    /// Wraps a templater.
    #[must_use]
    pub fn new(templater: impl Templater + 'static) -> Self {
        Self {
            templater: Arc::new(templater),
        }
    }
}

impl fmt::Debug for TemplateRender {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("TemplateRender").finish_non_exhaustive()
    }
}

impl RenderStage for TemplateRender {
    fn prepare(&self, mut context: Context) -> Context {
        let mut scope = TemplateScope::new();

        let for_url = context.snapshot();
        scope.set_helper("url", move |args| {
            let parts: Vec<&str> = args.iter().map(String::as_str).collect();
            for_url.make_url(&parts)
        });

        let for_call = context.snapshot();
        scope.set_helper("call", move |args| {
            let Some((target, forwarded_args)) = args.split_first() else {
                return Err(DispatchError::template("call", "missing logic name"));
            };
            let forwarded = for_call.forward(target.as_str(), forwarded_args.to_vec())?;
            Ok(forwarded.response().body().unwrap_or_default().to_owned())
        });

        scope.set_var("ctx", context.summary());
        context.set_template_scope(scope);
        context
    }

    fn render(&self, context: &mut Context) -> Result<(), DispatchError> {
        if !context.response().is_raw() {
            return Ok(());
        }
        let Some(view) = context
            .logic()
            .and_then(|logic| logic.view())
            .filter(|view| !view.is_empty())
            .map(str::to_owned)
        else {
            return render_base(context);
        };

        let mut scope = context.template_scope().cloned().unwrap_or_default();
        scope.set_var("ctx", context.summary());
        let vars = template_vars(context.response().content());
        let html = self.templater.render(&view, &vars, &scope)?;

        context.response_mut().render_html(html);
        debug!(target: DISPATCH_TARGET, view = %view, "template rendered");
        Ok(())
    }
}

/// Coerces pending content into template variables: objects are used as-is,
/// null yields no variables and anything else is exposed as `value`.
fn template_vars(content: &Value) -> Map<String, Value> {
    match content {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut vars = Map::new();
            vars.insert("value".to_owned(), other.clone());
            vars
        }
    }
}

impl RestBuilder<BaseRender> {
    /// Switches to template rendering with `templater`.
    #[must_use]
    pub fn with_templater(
        self,
        templater: impl Templater + 'static,
    ) -> RestBuilder<TemplateRender> {
        self.with_renderer(TemplateRender::new(templater))
    }
}
