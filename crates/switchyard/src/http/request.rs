//! Inbound request value and its URI helper.

use std::collections::BTreeMap;

use url::Url;

use super::method::HttpMethod;
use crate::errors::DispatchError;

/// Origin assumed for requests built from a bare path.
const DEFAULT_ORIGIN: &str = "http://localhost/";

/// Absolute request location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    url: Url,
}

impl Uri {
    /// Parses an absolute URL, or a path relative to `http://localhost/`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidUri`] when the target cannot be parsed.
    pub fn parse(target: &str) -> Result<Self, DispatchError> {
        let parsed = match Url::parse(target) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(DEFAULT_ORIGIN).and_then(|base| base.join(target))
            }
            Err(error) => Err(error),
        };
        parsed
            .map(|url| Self { url })
            .map_err(|error| DispatchError::invalid_uri(target, error.to_string()))
    }

    /// Path component, always starting with `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Builds an absolute URL for `path` on the same origin.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidUri`] if the joined location is not a
    /// valid URL.
    pub fn make(&self, path: &str) -> Result<String, DispatchError> {
        let absolute = format!("/{}", path.trim_start_matches('/'));
        self.url
            .join(&absolute)
            .map(String::from)
            .map_err(|error| DispatchError::invalid_uri(absolute.as_str(), error.to_string()))
    }

    /// Underlying parsed URL.
    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.url
    }
}

/// Request as seen by the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: HttpMethod,
    uri: Uri,
    headers: BTreeMap<String, String>,
    values: BTreeMap<String, String>,
}

impl Request {
    /// Builds a request for `method` and `target`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidUri`] when `target` is not a URL or
    /// absolute path.
    pub fn new(method: HttpMethod, target: &str) -> Result<Self, DispatchError> {
        Ok(Self {
            method,
            uri: Uri::parse(target)?,
            headers: BTreeMap::new(),
            values: BTreeMap::new(),
        })
    }

    /// Shorthand for a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`Request::new`].
    pub fn get(target: &str) -> Result<Self, DispatchError> {
        Self::new(HttpMethod::Get, target)
    }

    /// Shorthand for a `POST` request.
    ///
    /// # Errors
    ///
    /// See [`Request::new`].
    pub fn post(target: &str) -> Result<Self, DispatchError> {
        Self::new(HttpMethod::Post, target)
    }

    /// Adds a header. Names are stored lowercase.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Adds a submitted form value.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Request method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Request location.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All submitted values.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// A single submitted value.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Route matcher query in the form `"METHOD /path"`.
    #[must_use]
    pub fn route_query(&self) -> String {
        format!("{} {}", self.method, self.path())
    }
}

/// Supplies the request a kernel should serve when it builds its own context.
pub trait RequestSource: Send + Sync {
    /// Returns the current inbound request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RequestSource`] when no request is available.
    fn current(&self) -> Result<Request, DispatchError>;
}

impl<F> RequestSource for F
where
    F: Fn() -> Result<Request, DispatchError> + Send + Sync,
{
    fn current(&self) -> Result<Request, DispatchError> {
        self()
    }
}
