//! Response value, its rendered form, and the emitter.
//!
//! A [`Response`] may hold *pending* content produced by a logic method. Such
//! a response is flagged raw until a render pass turns the content into a
//! body. [`Response::finalize`] produces the [`Emitted`] form that
//! [`ResponseWriter`] serialises onto a byte stream.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde_json::Value;

use super::status::StatusCode;
use crate::errors::DispatchError;

const CONTENT_TYPE: &str = "content-type";

/// Response under construction by the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    status: Option<StatusCode>,
    headers: BTreeMap<String, String>,
    content: Value,
    body: Option<String>,
    raw: bool,
}

impl Response {
    /// Creates an empty response with no status set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a plain text response.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::new().with_body(body.into(), "text/plain; charset=utf-8")
    }

    /// Creates an HTML response.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::new().with_body(body.into(), "text/html; charset=utf-8")
    }

    /// Creates a JSON response from a value.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::SerializeResponse`] if the value cannot be
    /// encoded.
    pub fn json(content: Value) -> Result<Self, DispatchError> {
        let mut response = Self {
            content,
            raw: true,
            ..Self::default()
        };
        response.render_json()?;
        Ok(response)
    }

    fn with_body(mut self, body: String, content_type: &str) -> Self {
        self.body = Some(body);
        self.headers
            .insert(CONTENT_TYPE.to_owned(), content_type.to_owned());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the status code in place.
    pub const fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Explicitly set status, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Sets a header. Names are stored lowercase.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Content awaiting rendering (or last rendered).
    #[must_use]
    pub const fn content(&self) -> &Value {
        &self.content
    }

    /// Rendered body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// `true` while content is waiting for a render pass.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.raw
    }

    /// Stores pending content and flags the response as unrendered.
    pub fn set_pending(&mut self, content: Value) {
        self.content = content;
        self.raw = true;
    }

    /// Serialises pending content as the JSON body, keeping status and headers.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::SerializeResponse`] if encoding fails.
    pub fn render_json(&mut self) -> Result<(), DispatchError> {
        let body = serde_json::to_string(&self.content)?;
        self.set_rendered(body, "application/json");
        Ok(())
    }

    /// Passes pending content through as a text body.
    pub fn render_text(&mut self) {
        let body = text_of(&self.content);
        self.set_rendered(body, "text/plain; charset=utf-8");
    }

    /// Replaces the body with rendered HTML.
    pub fn render_html(&mut self, body: String) {
        self.set_rendered(body, "text/html; charset=utf-8");
    }

    /// Clears the unrendered flag without touching the body.
    pub const fn clear_raw(&mut self) {
        self.raw = false;
    }

    fn set_rendered(&mut self, body: String, content_type: &str) {
        self.body = Some(body);
        self.headers
            .entry(CONTENT_TYPE.to_owned())
            .or_insert_with(|| content_type.to_owned());
        self.raw = false;
    }

    /// Produces the final emitted form. Unset status becomes `200`; pending
    /// content that never went through a render pass is emitted as text.
    #[must_use]
    pub fn finalize(mut self) -> Emitted {
        if self.raw {
            self.render_text();
        }
        Emitted {
            status: self.status.unwrap_or(StatusCode::OK),
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        }
    }
}

/// Text form of pending content: strings verbatim, null as empty, anything
/// else as compact JSON.
fn text_of(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Finalised response ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    /// Final status code.
    pub status: StatusCode,
    /// Response headers, lowercase names.
    pub headers: BTreeMap<String, String>,
    /// Response body.
    pub body: String,
}

/// Writer that serialises emitted responses to a stream.
///
/// Output uses HTTP/1.1 framing: a status line, one line per header, a
/// `content-length` header, a blank line and the body.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes an emitted response and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn write_response(&mut self, response: &Emitted) -> io::Result<()> {
        // The separating space is required even when the reason is empty.
        write!(
            self.writer,
            "HTTP/1.1 {} {}\r\n",
            response.status,
            response.status.reason()
        )?;
        for (name, value) in &response.headers {
            write!(self.writer, "{name}: {value}\r\n")?;
        }
        write!(self.writer, "content-length: {}\r\n\r\n", response.body.len())?;
        self.writer.write_all(response.body.as_bytes())?;
        self.writer.flush()
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
