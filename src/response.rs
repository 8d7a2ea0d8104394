//! The response model returned by every endpoint and middleware layer, and the
//! [`IntoResponse`] conversion trait.
//!
//! Endpoints never write to the connection. They build a [`Response`] (status,
//! serializable body, headers) and return it; the encoding middleware is the
//! only layer that turns it into bytes on the wire.

use std::collections::HashMap;

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::api_error::ApiError;

// ── Payload ───────────────────────────────────────────────────────────────────

/// A response body, serialized once at construction.
///
/// A body that cannot be represented as JSON is kept as the serializer's error
/// text; the encoding middleware turns it into the raw 500 fallback.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Payload {
    Json(Value),
    Unencodable(String),
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing response, before encoding.
///
/// `status` and `body` are fixed at construction. Headers can be added later
/// with [`set_header`](Response::set_header); they are copied verbatim onto the
/// wire response.
///
/// ```rust
/// use http::StatusCode;
/// use portico::Response;
/// use serde_json::json;
///
/// let mut res = Response::new(StatusCode::CREATED, json!({"id": 42}), None);
/// res.set_header("location", "/items/42");
///
/// assert_eq!(res.header("location"), "/items/42");
/// assert_eq!(res.header("etag"), "");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    status: StatusCode,
    body: Payload,
    headers: HashMap<String, String>,
}

impl Response {
    /// Builds a response. Never fails: a body that does not serialize is
    /// reported when the response is encoded.
    pub fn new(
        status: StatusCode,
        body: impl Serialize,
        headers: Option<HashMap<String, String>>,
    ) -> Self {
        let body = match serde_json::to_value(body) {
            Ok(value) => Payload::Json(value),
            Err(e) => Payload::Unencodable(e.to_string()),
        };
        Self { status, body, headers: headers.unwrap_or_default() }
    }

    /// `200 OK` with `body`.
    pub fn ok(body: impl Serialize) -> Self {
        Self::new(StatusCode::OK, body, None)
    }

    /// `302 Found` to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(StatusCode::FOUND, location.into(), None)
    }

    /// `301 Moved Permanently` to `location`.
    pub fn moved_permanently(location: impl Into<String>) -> Self {
        Self::new(StatusCode::MOVED_PERMANENTLY, location.into(), None)
    }

    pub fn status(&self) -> StatusCode { self.status }

    /// The JSON body, or `None` if the body could not be serialized.
    pub fn body(&self) -> Option<&Value> {
        match &self.body {
            Payload::Json(value) => Some(value),
            Payload::Unencodable(_) => None,
        }
    }

    pub fn headers(&self) -> &HashMap<String, String> { &self.headers }

    /// Sets `key` to `value`. The last write for a key wins.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Returns the header value for `key` (exact match), or `""` if unset.
    pub fn header(&self, key: &str) -> &str {
        self.headers.get(key).map(String::as_str).unwrap_or("")
    }

    pub(crate) fn payload(&self) -> &Payload { &self.body }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into the value an endpoint hands back to the pipeline.
///
/// `None` means "no response": the logging and encoding layers then do
/// nothing at all and the connection receives an empty `200 OK`.
///
/// # Example: returning `Result` from an endpoint
///
/// ```rust
/// use portico::{ApiError, Request, Response};
/// use http::StatusCode;
///
/// async fn get_item(req: Request) -> Result<Response, ApiError> {
///     let id: u64 = req
///         .param("id")
///         .and_then(|id| id.parse().ok())
///         .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "id must be numeric", "items", 1))?;
///     Ok(Response::ok(serde_json::json!({ "id": id })))
/// }
/// ```
pub trait IntoResponse {
    fn into_response(self) -> Option<Response>;
}

impl IntoResponse for Response {
    fn into_response(self) -> Option<Response> { Some(self) }
}

impl IntoResponse for Option<Response> {
    fn into_response(self) -> Option<Response> { self }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Option<Response> { Some(self.into()) }
}

impl<T: IntoResponse> IntoResponse for Result<T, ApiError> {
    fn into_response(self) -> Option<Response> {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}
