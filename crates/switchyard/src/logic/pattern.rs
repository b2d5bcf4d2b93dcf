//! HTTP route patterns of the form `"METHOD /path/{param}"`.

use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;

use crate::errors::DispatchError;
use crate::http::HttpMethod;

/// Method constraint of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFilter {
    /// Matches every method (`*` or `ANY`).
    Any,
    /// Matches a single method.
    Only(HttpMethod),
}

impl MethodFilter {
    fn accepts(self, method: HttpMethod) -> bool {
        match self {
            Self::Any => true,
            Self::Only(expected) => expected == method,
        }
    }
}

/// One path segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Captures any non-empty request segment as a positional parameter.
    Param(String),
}

/// Parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpPattern {
    source: String,
    method: MethodFilter,
    segments: Vec<Segment>,
}

impl HttpPattern {
    /// Parses `"METHOD /path"`. Segments wrapped in braces capture
    /// parameters, e.g. `"GET /users/{id}"`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidPattern`] when the method is unknown,
    /// the path is not absolute, or a segment is malformed.
    pub fn parse(pattern: &str) -> Result<Self, DispatchError> {
        let invalid = |message: &str| DispatchError::invalid_pattern(pattern, message);

        let (method_token, raw_path) = pattern
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| invalid("expected 'METHOD /path'"))?;
        let method = match method_token {
            "*" => MethodFilter::Any,
            other if other.eq_ignore_ascii_case("any") => MethodFilter::Any,
            other => HttpMethod::from_str(other)
                .map(MethodFilter::Only)
                .map_err(|_| invalid("unknown method"))?,
        };

        let path = raw_path.trim();
        if !path.starts_with('/') {
            return Err(invalid("path must start with '/'"));
        }

        let segments = split_path(path)
            .map(|segment| parse_segment(segment).ok_or_else(|| invalid("malformed segment")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: pattern.trim().to_owned(),
            method,
            segments,
        })
    }

    /// Returns the extracted parameters when `method` and `path` match.
    ///
    /// Literal segments compare against the raw path; parameters are
    /// percent-decoded.
    #[must_use]
    pub fn matches(&self, method: HttpMethod, path: &str) -> Option<Vec<String>> {
        if !self.method.accepts(method) {
            return None;
        }

        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) => {
                    params.push(percent_decode_str(part).decode_utf8_lossy().into_owned());
                }
            }
        }
        Some(params)
    }

    /// Number of literal segments; more literals means a more specific route.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Literal(_)))
            .count()
    }

    /// Method constraint.
    #[must_use]
    pub const fn method(&self) -> MethodFilter {
        self.method
    }

    /// Parsed path segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for HttpPattern {
    type Err = DispatchError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        Self::parse(pattern)
    }
}

impl fmt::Display for HttpPattern {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.source)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn parse_segment(segment: &str) -> Option<Segment> {
    match segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(name) if is_identifier(name) => Some(Segment::Param(name.to_owned())),
        Some(_) => None,
        None if segment.contains(['{', '}']) => None,
        None => Some(Segment::Literal(segment.to_owned())),
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}
