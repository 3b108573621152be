//! HTTP response types.
//!
//! A [`Response`] is a status, a header list, and a body that is
//! either buffered or a live channel of chunks. Handlers usually go
//! through [`IntoResponse`] or the [`Response::json`] / [`Response::text`]
//! constructors rather than assembling parts by hand.

use serde::Serialize;

use crate::streaming::BodyStream;

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 200 OK
    pub const OK: StatusCode = StatusCode(200);
    /// 201 Created
    pub const CREATED: StatusCode = StatusCode(201);
    /// 202 Accepted
    pub const ACCEPTED: StatusCode = StatusCode(202);
    /// 204 No Content
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    /// 301 Moved Permanently
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);
    /// 302 Found
    pub const FOUND: StatusCode = StatusCode(302);
    /// 304 Not Modified
    pub const NOT_MODIFIED: StatusCode = StatusCode(304);
    /// 400 Bad Request
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    /// 401 Unauthorized
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    /// 403 Forbidden
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    /// 404 Not Found
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    /// 405 Method Not Allowed
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    /// 409 Conflict
    pub const CONFLICT: StatusCode = StatusCode(409);
    /// 422 Unprocessable Entity
    pub const UNPROCESSABLE_ENTITY: StatusCode = StatusCode(422);
    /// 500 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    /// 502 Bad Gateway
    pub const BAD_GATEWAY: StatusCode = StatusCode(502);
    /// 503 Service Unavailable
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    /// Build a status code from a raw u16, if it is in a valid range.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<StatusCode> {
        if (100..=599).contains(&code) {
            Some(StatusCode(code))
        } else {
            None
        }
    }

    /// The numeric code.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Whether this is a 2xx code.
    #[must_use]
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Canonical reason phrase, or an empty string for codes without
    /// a well-known one.
    #[must_use]
    pub fn canonical_reason(self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            409 => "Conflict",
            422 => "Unprocessable Entity",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            _ => "",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response body.
#[derive(Debug)]
pub enum ResponseBody {
    /// No body.
    Empty,
    /// Fully buffered body.
    Bytes(Vec<u8>),
    /// Chunks produced concurrently with delivery.
    Stream(BodyStream),
}

impl ResponseBody {
    /// Buffered bytes, or `None` for empty and streaming bodies.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// One outbound HTTP response.
///
/// The head (status and headers) is fixed once the response is handed
/// back to the dispatcher; a streaming body keeps producing chunks
/// after that, but cannot change the head.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: ResponseBody,
}

impl Response {
    /// Create an empty response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Create an empty `200 OK` response.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Create a `text/plain` response.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .header("content-type", "text/plain; charset=utf-8")
            .body(ResponseBody::Bytes(body.into().into_bytes()))
    }

    /// Create an `application/json` response by serializing a value.
    ///
    /// # Errors
    ///
    /// Returns the serialization error unchanged, so handlers can
    /// bubble it with `?`.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::ok()
            .header("content-type", "application/json")
            .body(ResponseBody::Bytes(body)))
    }

    /// Set a header, replacing any existing value under the same
    /// (case-insensitive) name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Replace the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// All headers, in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Look up a header value by name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Borrow the body.
    #[must_use]
    pub fn body_ref(&self) -> &ResponseBody {
        &self.body
    }

    /// Decompose into status, headers, and body.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, Vec<(String, String)>, ResponseBody) {
        (self.status, self.headers, self.body)
    }
}

/// Conversion into a [`Response`], used at the pipeline boundary so
/// handlers can return plain values.
pub trait IntoResponse {
    /// Convert into a response.
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for Vec<u8> {
    fn into_response(self) -> Response {
        Response::ok()
            .header("content-type", "application/octet-stream")
            .body(ResponseBody::Bytes(self))
    }
}

impl IntoResponse for serde_json::Value {
    fn into_response(self) -> Response {
        match Response::json(&self) {
            Ok(response) => response,
            // `Value` map keys are always strings, so this arm is
            // unreachable for well-formed values.
            Err(_) => Response::new(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    fn into_response(self) -> Response {
        self.1.into_response().with_status(self.0)
    }
}

impl<T: IntoResponse> IntoResponse for Option<T> {
    fn into_response(self) -> Response {
        match self {
            Some(value) => value.into_response(),
            None => Response::ok(),
        }
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_consts() {
        assert_eq!(StatusCode::OK.as_u16(), 200);
        assert_eq!(StatusCode::METHOD_NOT_ALLOWED.as_u16(), 405);
        assert!(StatusCode::OK.is_success());
        assert!(!StatusCode::NOT_FOUND.is_success());
    }

    #[test]
    fn from_u16_bounds() {
        assert_eq!(StatusCode::from_u16(200), Some(StatusCode::OK));
        assert!(StatusCode::from_u16(99).is_none());
        assert!(StatusCode::from_u16(600).is_none());
    }

    #[test]
    fn canonical_reasons() {
        assert_eq!(StatusCode::OK.canonical_reason(), "OK");
        assert_eq!(
            StatusCode::METHOD_NOT_ALLOWED.canonical_reason(),
            "Method Not Allowed"
        );
        assert_eq!(StatusCode(418).canonical_reason(), "");
    }

    #[test]
    fn header_builder_replaces_same_name() {
        let response = Response::ok()
            .header("Content-Type", "text/plain")
            .header("content-type", "application/json");
        assert_eq!(response.headers().len(), 1);
        assert_eq!(
            response.header_value("CONTENT-TYPE"),
            Some("application/json")
        );
    }

    #[test]
    fn text_sets_content_type_and_body() {
        let response = Response::text("hi");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.header_value("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(response.body_ref().as_bytes(), Some(b"hi".as_slice()));
    }

    #[test]
    fn json_serializes_value() {
        let response = Response::json(&serde_json::json!({"ok": true})).unwrap();
        assert_eq!(
            response.header_value("content-type"),
            Some("application/json")
        );
        assert_eq!(
            response.body_ref().as_bytes(),
            Some(br#"{"ok":true}"#.as_slice())
        );
    }

    #[test]
    fn into_response_for_str_and_status() {
        let text = "hello".into_response();
        assert_eq!(text.status(), StatusCode::OK);
        assert_eq!(text.body_ref().as_bytes(), Some(b"hello".as_slice()));

        let empty = StatusCode::NO_CONTENT.into_response();
        assert_eq!(empty.status(), StatusCode::NO_CONTENT);
        assert!(matches!(empty.body_ref(), ResponseBody::Empty));
    }

    #[test]
    fn into_response_tuple_overrides_status() {
        let response = (StatusCode::CREATED, "made").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body_ref().as_bytes(), Some(b"made".as_slice()));
    }

    #[test]
    fn into_response_none_is_empty_ok() {
        let response = None::<String>.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(matches!(response.body_ref(), ResponseBody::Empty));
    }

    #[test]
    fn into_parts_roundtrip() {
        let response = Response::text("x").with_status(StatusCode::ACCEPTED);
        let (status, headers, body) = response.into_parts();
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(headers.len(), 1);
        assert!(matches!(body, ResponseBody::Bytes(b) if b == b"x"));
    }
}
