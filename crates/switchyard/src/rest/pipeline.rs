//! Route, guard, resolve and execute stages of the dispatch pipeline.

use std::sync::Arc;

use tracing::debug;

use crate::auth::Auth;
use crate::context::Context;
use crate::errors::{DispatchError, HttpEvent};
use crate::kernel::DISPATCH_TARGET;
use crate::logic::Logic;
use crate::resolver::{Reply, Resolver};
use crate::routing::Router;

fn require(context: &Context, stage: &'static str) -> Result<Arc<Logic>, DispatchError> {
    context
        .logic()
        .cloned()
        .ok_or(DispatchError::MissingLogic { stage })
}

/// Selects the logic from the request, unless a forward already chose one.
pub(crate) fn route(router: &dyn Router, context: &mut Context) -> Result<(), DispatchError> {
    if let Some(logic) = context.logic() {
        debug!(
            target: DISPATCH_TARGET,
            logic = logic.name(),
            "logic already selected, skipping route matching"
        );
        return Ok(());
    }

    let query = context.request().route_query();
    let found = router
        .find(&query)
        .ok_or_else(|| HttpEvent::not_found(format!("no route found for query {query}")))?;
    debug!(
        target: DISPATCH_TARGET,
        logic = found.logic().name(),
        query = %query,
        "route found"
    );
    context.set_route(found);
    Ok(())
}

/// Rejects callers ranked below the logic's access rank and records the
/// authenticated identity.
pub(crate) fn guard(auth: &dyn Auth, context: &mut Context) -> Result<(), DispatchError> {
    let logic = require(context, "guard")?;
    let required = logic.access();
    let request = context.request();

    if required > 0 {
        let rank = auth.rank(request);
        if required > rank {
            let message = format!(
                "access denied (#{}: {required}, user: {rank})",
                logic.name()
            );
            let event = if auth.valid(request) {
                HttpEvent::forbidden(message)
            } else {
                HttpEvent::unauthorized(message)
            };
            return Err(event.into());
        }
    }

    let user = if auth.valid(request) {
        auth.user(request)
    } else {
        None
    };
    context.set_user(user);
    debug!(
        target: DISPATCH_TARGET,
        logic = logic.name(),
        access = required,
        "access granted"
    );
    Ok(())
}

/// Binds the logic method and applies discovered metadata to a
/// request-private copy of the logic.
///
/// Returns `true` when the discovered metadata raised the access rank, in
/// which case the caller must guard again.
pub(crate) fn resolve(
    resolver: &dyn Resolver,
    context: &mut Context,
) -> Result<bool, DispatchError> {
    let logic = require(context, "resolve")?;
    let discovered = logic.bind(resolver)?.discovered();
    if !logic.would_change(discovered) {
        return Ok(false);
    }

    let raised = discovered
        .access
        .is_some_and(|access| access > logic.access());
    let private = logic.as_ref().clone().with_patch(discovered);
    debug!(
        target: DISPATCH_TARGET,
        logic = private.name(),
        access = private.access(),
        render = %private.render(),
        "annotations applied to request copy"
    );
    context.set_logic(Some(Arc::new(private)));
    Ok(raised)
}

/// Invokes the bound method with the positional parameters and the context.
pub(crate) fn execute(resolver: &dyn Resolver, context: &mut Context) -> Result<(), DispatchError> {
    let logic = require(context, "execute")?;
    let reply = logic
        .bind(resolver)?
        .invocable()
        .call(context.params(), context)?;

    match reply {
        Reply::Response(response) => {
            context.set_response(response);
            debug!(
                target: DISPATCH_TARGET,
                logic = logic.name(),
                "response provided by logic"
            );
        }
        Reply::Content(content) => {
            context.response_mut().set_pending(content);
            debug!(
                target: DISPATCH_TARGET,
                logic = logic.name(),
                "raw content provided by logic"
            );
        }
    }
    Ok(())
}
