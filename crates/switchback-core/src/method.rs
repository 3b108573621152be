//! HTTP method type.

use std::fmt;

/// HTTP request method.
///
/// The engine only routes the methods listed here; anything else is
/// rejected when the request envelope is built, before any route
/// lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
}

impl Method {
    /// All supported methods, in canonical order.
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
        Method::Options,
        Method::Trace,
    ];

    /// The uppercase wire name of this method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }

    /// Parse a method token as it appears on the request line.
    ///
    /// Matching is case-insensitive so that host adapters can pass the
    /// token through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MethodParseError`] for any token outside the supported
    /// set (including `CONNECT`).
    pub fn parse(token: &str) -> Result<Self, MethodParseError> {
        let upper = token.to_ascii_uppercase();
        match upper.as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            _ => Err(MethodParseError { token: upper }),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = MethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::parse(s)
    }
}

/// Error returned when a request line carries an unsupported method token.
#[derive(Debug, Clone)]
pub struct MethodParseError {
    token: String,
}

impl MethodParseError {
    /// The rejected token, uppercased.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for MethodParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported HTTP method: {}", self.token)
    }
}

impl std::error::Error for MethodParseError {}
