//! View rendering for the presentation extension.
//!
//! A [`Templater`] turns a view identifier plus a variable mapping into HTML.
//! Request-scoped bindings (helpers such as `url` and `call`, and globals
//! such as `ctx`) travel in a [`TemplateScope`] built per request, so a
//! templater shared across threads never holds request state.
//!
//! [`StaticTemplater`] is a minimal engine over in-memory view sources. It
//! understands two tag forms:
//!
//! - `{{ name }}` or `{{ name.field.0 }}` interpolates a variable, looking in
//!   the render variables first and the scope globals second. Missing
//!   variables render as empty text.
//! - `{{ helper arg "quoted arg" }}` calls a scope helper with literal
//!   arguments. A single bare word that names no variable but names a helper
//!   calls that helper with no arguments.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::DispatchError;

/// Request-scoped helper callable from templates.
pub type Helper = dyn Fn(&[String]) -> Result<String, DispatchError> + Send + Sync;

/// Bindings injected into templates for one request.
#[derive(Clone, Default)]
pub struct TemplateScope {
    vars: Map<String, Value>,
    helpers: BTreeMap<String, Arc<Helper>>,
}

impl TemplateScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a global variable.
    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Global variables.
    #[must_use]
    pub const fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }

    /// Registers a helper, replacing any previous one of the same name.
    pub fn set_helper<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&[String]) -> Result<String, DispatchError> + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    /// Returns `true` when a helper named `name` exists.
    #[must_use]
    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Calls a helper, returning `None` when it does not exist.
    #[must_use]
    pub fn call(&self, name: &str, args: &[String]) -> Option<Result<String, DispatchError>> {
        self.helpers.get(name).map(|helper| helper(args))
    }
}

impl fmt::Debug for TemplateScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TemplateScope")
            .field("vars", &self.vars.keys().collect::<Vec<_>>())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Template engine used by the presentation extension.
pub trait Templater: Send + Sync {
    /// Renders `view` with `vars` and the request-scoped bindings.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Template`] when the view is unknown or fails
    /// to render.
    fn render(
        &self,
        view: &str,
        vars: &Map<String, Value>,
        scope: &TemplateScope,
    ) -> Result<String, DispatchError>;
}

impl<T: Templater + ?Sized> Templater for Arc<T> {
    fn render(
        &self,
        view: &str,
        vars: &Map<String, Value>,
        scope: &TemplateScope,
    ) -> Result<String, DispatchError> {
        (**self).render(view, vars, scope)
    }
}

/// Interpolating templater over in-memory view sources.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplater {
    views: HashMap<String, String>,
}

impl StaticTemplater {
    /// Creates a templater with no views.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the source of `view`.
    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>, source: impl Into<String>) -> Self {
        self.views.insert(view.into(), source.into());
        self
    }
}

impl Templater for StaticTemplater {
    fn render(
        &self,
        view: &str,
        vars: &Map<String, Value>,
        scope: &TemplateScope,
    ) -> Result<String, DispatchError> {
        let source = self
            .views
            .get(view)
            .ok_or_else(|| DispatchError::template(view, "view not found"))?;

        let mut output = String::with_capacity(source.len());
        let mut rest = source.as_str();
        while let Some(open) = rest.find("{{") {
            let (literal, tagged) = rest.split_at(open);
            output.push_str(literal);
            let inner = tagged.get(2..).unwrap_or_default();
            let close = inner
                .find("}}")
                .ok_or_else(|| DispatchError::template(view, "unclosed '{{' tag"))?;
            let (expression, tail) = inner.split_at(close);
            output.push_str(&evaluate(view, expression.trim(), vars, scope)?);
            rest = tail.get(2..).unwrap_or_default();
        }
        output.push_str(rest);
        Ok(output)
    }
}

fn evaluate(
    view: &str,
    expression: &str,
    vars: &Map<String, Value>,
    scope: &TemplateScope,
) -> Result<String, DispatchError> {
    let words = split_words(expression);
    let Some((head, args)) = words.split_first() else {
        return Err(DispatchError::template(view, "empty tag"));
    };

    if args.is_empty() {
        if let Some(value) = lookup(head, vars).or_else(|| lookup(head, scope.vars())) {
            return Ok(display(value));
        }
        return scope.call(head, &[]).unwrap_or_else(|| Ok(String::new()));
    }

    scope
        .call(head, args)
        .unwrap_or_else(|| Err(DispatchError::template(view, format!("unknown helper '{head}'"))))
}

fn lookup<'a>(path: &str, vars: &'a Map<String, Value>) -> Option<&'a Value> {
    let mut keys = path.split('.');
    let first = vars.get(keys.next()?)?;
    keys.try_fold(first, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn split_words(expression: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in expression.chars() {
        if ch == '"' {
            quoted = !quoted;
        } else if ch.is_whitespace() && !quoted {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests;
