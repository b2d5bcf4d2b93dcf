//! Error types for dispatch failures.
//!
//! Failures fall into two families. [`HttpEvent`]s carry a status code and
//! represent expected protocol conditions (no route, access denied, nothing
//! bound). Everything else is an application or infrastructure error. The
//! kernel offers each family to its own recovery table.

use std::error::Error as StdError;

use thiserror::Error;

use crate::http::StatusCode;

/// Status-carrying protocol event raised inside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("http {status}: {message}")]
pub struct HttpEvent {
    status: StatusCode,
    message: String,
}

impl HttpEvent {
    /// Creates an event with an arbitrary status.
    #[must_use]
    pub fn with_status(status: impl Into<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }

    /// No route matched the request (`404`).
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    /// Caller is not authenticated and the logic requires a rank (`401`).
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, message)
    }

    /// Caller is authenticated but under-ranked (`403`).
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, message)
    }

    /// The logic method could not be bound (`501`).
    #[must_use]
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_IMPLEMENTED, message)
    }

    /// Status code carried by the event.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Errors surfaced while dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A protocol event such as not-found or access-denied.
    #[error(transparent)]
    Event(#[from] HttpEvent),

    /// Failure raised by application code inside a logic method.
    #[error("application error: {0}")]
    Application(#[source] Box<dyn StdError + Send + Sync>),

    /// No logic is registered under the requested name.
    #[error("logic '{name}' is not registered")]
    UnknownLogic {
        /// Name that was looked up.
        name: String,
    },

    /// A pipeline stage ran before a logic was selected.
    #[error("no logic selected before the {stage} stage")]
    MissingLogic {
        /// Stage that required the logic.
        stage: &'static str,
    },

    /// `forward` was called on a context that never passed through a kernel.
    #[error("context has no forwarder")]
    MissingForwarder,

    /// Nested forwards exceeded the configured ceiling.
    #[error("forward depth {depth} exceeds limit {limit}")]
    ForwardDepthExceeded {
        /// Depth the rejected forward would have reached.
        depth: u32,
        /// Configured limit.
        limit: u32,
    },

    /// The kernel could not obtain a request to serve.
    #[error("failed to acquire request: {message}")]
    RequestSource {
        /// Description of the failure.
        message: String,
    },

    /// A URI could not be parsed or built.
    #[error("invalid uri '{uri}': {message}")]
    InvalidUri {
        /// Offending input.
        uri: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A route pattern could not be parsed.
    #[error("invalid http pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Description of the problem.
        message: String,
    },

    /// A declared annotation carries a value of the wrong shape.
    #[error("annotation '{key}' is invalid: {message}")]
    InvalidAnnotation {
        /// Annotation key.
        key: String,
        /// Description of the problem.
        message: String,
    },

    /// The templater failed to render a view.
    #[error("template '{view}' failed to render: {message}")]
    Template {
        /// View identifier.
        view: String,
        /// Description of the failure.
        message: String,
    },

    /// Response serialisation failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}

impl DispatchError {
    /// Wraps an application error.
    #[must_use]
    pub fn application<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Application(Box::new(error))
    }

    /// Creates an unknown logic error.
    #[must_use]
    pub fn unknown_logic(name: impl Into<String>) -> Self {
        Self::UnknownLogic { name: name.into() }
    }

    /// Creates a request source error.
    #[must_use]
    pub fn request_source(message: impl Into<String>) -> Self {
        Self::RequestSource {
            message: message.into(),
        }
    }

    /// Creates an invalid URI error.
    #[must_use]
    pub fn invalid_uri(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid annotation error.
    #[must_use]
    pub fn invalid_annotation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAnnotation {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(view: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            view: view.into(),
            message: message.into(),
        }
    }

    /// Status code when this error is an [`HttpEvent`].
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Event(event) => Some(event.status()),
            _ => None,
        }
    }

    /// Returns `true` for protocol events.
    #[must_use]
    pub const fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    /// Iterates over this error and its `source()` chain.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        std::iter::successors(Some(self as &(dyn StdError + 'static)), |&error| {
            error.source()
        })
    }
}

#[cfg(test)]
mod tests;
