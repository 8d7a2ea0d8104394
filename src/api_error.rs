//! Structured API errors and the error-response constructors.
//!
//! Every error a client sees has the same JSON shape:
//!
//! ```json
//! {"status":401,"message":"token is not provided","code":"JWT middleware.401100","system":"JWT middleware"}
//! ```
//!
//! `code` is always `system + "." + status + subcode`. It is computed in the
//! constructor and cannot be set any other way, so identical inputs always
//! produce identical codes and logs can be correlated without a registry.

use http::StatusCode;
use serde::Serialize;

use crate::response::Response;

/// A structured error value, serialized as the body of an error [`Response`].
///
/// Empty fields are omitted from the JSON encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    #[serde(skip_serializing_if = "is_zero")]
    status: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
}

fn is_zero(status: &u16) -> bool {
    *status == 0
}

impl ApiError {
    /// Builds an error for `status`, deriving `code` from `system`, the
    /// numeric status and `subcode`.
    ///
    /// ```rust
    /// use portico::ApiError;
    /// use http::StatusCode;
    ///
    /// let err = ApiError::new(StatusCode::UNAUTHORIZED, "token is not provided", "JWT middleware", 100);
    /// assert_eq!(err.code(), "JWT middleware.401100");
    /// ```
    pub fn new(
        status: StatusCode,
        message: impl Into<String>,
        system: impl Into<String>,
        subcode: u32,
    ) -> Self {
        let system = system.into();
        let code = format!("{system}.{}{subcode}", status.as_u16());
        Self { status: status.as_u16(), message: message.into(), code, system }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn message(&self) -> &str { &self.message }
    pub fn code(&self) -> &str { &self.code }
    pub fn system(&self) -> &str { &self.system }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        Response::new(err.status(), &err, None)
    }
}

// ── Error-response constructors ───────────────────────────────────────────────

/// The sanctioned way to produce error responses. Each constructor fixes the
/// HTTP status and wraps an [`ApiError`] as the body.
impl Response {
    /// Error response with an arbitrary status.
    pub fn error(status: StatusCode, code: u32, message: impl Into<String>, system: impl Into<String>) -> Self {
        ApiError::new(status, message, system, code).into()
    }

    /// `400 Bad Request`.
    pub fn bad_request(code: u32, message: impl Into<String>, system: impl Into<String>) -> Self {
        Self::error(StatusCode::BAD_REQUEST, code, message, system)
    }

    /// `401 Unauthorized`.
    pub fn unauthorized(code: u32, message: impl Into<String>, system: impl Into<String>) -> Self {
        Self::error(StatusCode::UNAUTHORIZED, code, message, system)
    }

    /// `404 Not Found`.
    pub fn not_found(code: u32, message: impl Into<String>, system: impl Into<String>) -> Self {
        Self::error(StatusCode::NOT_FOUND, code, message, system)
    }

    /// `500 Internal Server Error`.
    pub fn internal_server(code: u32, message: impl Into<String>, system: impl Into<String>) -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, code, message, system)
    }
}
