use std::fmt;

/// Numeric HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// `200 OK`
    pub const OK: Self = Self(200);
    /// `401 Unauthorized`
    pub const UNAUTHORIZED: Self = Self(401);
    /// `403 Forbidden`
    pub const FORBIDDEN: Self = Self(403);
    /// `404 Not Found`
    pub const NOT_FOUND: Self = Self(404);
    /// `500 Internal Server Error`
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);
    /// `501 Not Implemented`
    pub const NOT_IMPLEMENTED: Self = Self(501);

    /// Wraps a raw status code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Canonical reason phrase, empty for codes without one.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            503 => "Service Unavailable",
            _ => "",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
