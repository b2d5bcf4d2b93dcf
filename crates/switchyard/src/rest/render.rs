//! Final pipeline stage: turning pending content into a body.

use tracing::debug;

use crate::context::Context;
use crate::errors::DispatchError;
use crate::kernel::DISPATCH_TARGET;
use crate::logic::RenderMode;

/// Render behaviour plugged into a dispatcher.
pub trait RenderStage: Send + Sync {
    /// Prepares request-scoped state before the pipeline runs.
    fn prepare(&self, context: Context) -> Context {
        context
    }

    /// Renders pending content. Must leave the response rendered, so a second
    /// call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when serialisation or templating fails.
    fn render(&self, context: &mut Context) -> Result<(), DispatchError>;
}

/// JSON or text rendering chosen by the logic's render mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseRender;

impl RenderStage for BaseRender {
    fn render(&self, context: &mut Context) -> Result<(), DispatchError> {
        render_base(context)
    }
}

/// Shared JSON/text rendering used by every render stage.
pub(crate) fn render_base(context: &mut Context) -> Result<(), DispatchError> {
    if !context.response().is_raw() {
        return Ok(());
    }
    let mode = context
        .logic()
        .map(|logic| logic.render())
        .ok_or(DispatchError::MissingLogic { stage: "render" })?;

    if mode == RenderMode::Json {
        context.response_mut().render_json()?;
        debug!(target: DISPATCH_TARGET, "json response generated");
    } else {
        context.response_mut().render_text();
        debug!(target: DISPATCH_TARGET, mode = %mode, "content passed through");
    }
    context.response_mut().clear_raw();
    Ok(())
}
