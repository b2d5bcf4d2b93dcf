//! Typed partial updates applied to a [`Logic`](super::Logic).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tracing::debug;

use super::pattern::HttpPattern;
use crate::errors::DispatchError;
use crate::kernel::DISPATCH_TARGET;
use crate::resolver::Annotations;

/// Annotation keys that document a handler rather than configure it.
const DOCUMENTATION_KEYS: &[&str] = &["param", "return", "throws"];

/// How pending content is turned into a response body.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RenderMode {
    /// Content is passed through as text.
    #[default]
    Text,
    /// Content is serialised as JSON.
    Json,
    /// Content feeds a template view.
    Template,
}

/// Partial update of a logic's attributes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicPatch {
    /// Route pattern.
    pub http: Option<HttpPattern>,
    /// Required access rank.
    pub access: Option<u32>,
    /// Render mode.
    pub render: Option<RenderMode>,
    /// Template view identifier.
    pub view: Option<String>,
}

impl LogicPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the route pattern.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidPattern`] if `pattern` does not parse.
    pub fn with_http(mut self, pattern: &str) -> Result<Self, DispatchError> {
        self.http = Some(HttpPattern::parse(pattern)?);
        Ok(self)
    }

    /// Sets the required access rank.
    #[must_use]
    pub const fn with_access(mut self, rank: u32) -> Self {
        self.access = Some(rank);
        self
    }

    /// Sets the render mode.
    #[must_use]
    pub const fn with_render(mut self, mode: RenderMode) -> Self {
        self.render = Some(mode);
        self
    }

    /// Sets the template view.
    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Returns `true` when applying the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.http.is_none() && self.access.is_none() && self.render.is_none() && self.view.is_none()
    }

    /// Reads a patch from declared handler metadata.
    ///
    /// Recognised keys are `http`, `access`, `render` and `view` (or its
    /// alias `html`). Documentation keys are dropped and anything else is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidAnnotation`] or
    /// [`DispatchError::InvalidPattern`] when a recognised key carries a value
    /// of the wrong shape.
    pub fn from_annotations(annotations: &Annotations) -> Result<Self, DispatchError> {
        let mut patch = Self::new();
        for (key, value) in annotations {
            match key.as_str() {
                "http" => patch = patch.with_http(string_value(key, value)?)?,
                "access" => patch.access = Some(rank_value(key, value)?),
                "render" => {
                    let mode = string_value(key, value)?
                        .parse::<RenderMode>()
                        .map_err(|error| {
                            DispatchError::invalid_annotation(key, error.to_string())
                        })?;
                    patch.render = Some(mode);
                }
                "view" | "html" => patch.view = Some(string_value(key, value)?.to_owned()),
                doc if DOCUMENTATION_KEYS.contains(&doc) => {}
                other => debug!(
                    target: DISPATCH_TARGET,
                    annotation = other,
                    "ignoring unrecognised annotation"
                ),
            }
        }
        Ok(patch)
    }
}

fn string_value<'a>(key: &str, value: &'a Value) -> Result<&'a str, DispatchError> {
    value
        .as_str()
        .ok_or_else(|| DispatchError::invalid_annotation(key, "expected a string"))
}

fn rank_value(key: &str, value: &Value) -> Result<u32, DispatchError> {
    let wide = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    wide.and_then(|rank| u32::try_from(rank).ok())
        .ok_or_else(|| DispatchError::invalid_annotation(key, "expected a non-negative integer"))
}
