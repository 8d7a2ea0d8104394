//! Request/response logging.
//!
//! One `tracing` event per request, emitted after the downstream call:
//! `warn` for statuses ≥ 300, `debug` otherwise. Requests that got no
//! response are not logged. The response is only observed, never changed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use http::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::endpoint::{BoxFuture, BoxedEndpoint, ErasedEndpoint};
use crate::request::Request;
use crate::response::{Payload, Response};

/// Logged in place of the body for multipart uploads, which are not buffered.
pub const UPLOAD_PLACEHOLDER: &str = "file uploading - logs rejected";

pub(crate) struct Logging {
    inner: BoxedEndpoint,
}

impl Logging {
    pub(crate) fn wrap(inner: BoxedEndpoint) -> BoxedEndpoint {
        Arc::new(Self { inner })
    }
}

impl ErasedEndpoint for Logging {
    fn call(&self, mut req: Request) -> BoxFuture<Option<Response>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let start = Instant::now();

            let (body, form) = if is_upload(&req) {
                (UPLOAD_PLACEHOLDER.to_owned(), form(&req, b""))
            } else {
                match req.bytes().await {
                    Ok(bytes) => (String::from_utf8_lossy(&bytes).into_owned(), form(&req, &bytes)),
                    Err(e) => {
                        warn!(error = %e, "failed to buffer request body");
                        (String::new(), form(&req, b""))
                    }
                }
            };
            let entry = Entry::capture(&req, body, form);

            let response = inner.call(req).await?;
            entry.emit(&response, start.elapsed());
            Some(response)
        })
    }
}

/// Request metadata captured before the request is handed downstream.
struct Entry {
    method: Method,
    uri: String,
    host: String,
    headers: String,
    form: String,
    body: String,
}

impl Entry {
    fn capture(req: &Request, body: String, form: String) -> Self {
        let headers = req
            .headers()
            .iter()
            .map(|(name, value)| format!("{name}: {}", String::from_utf8_lossy(value.as_bytes())))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            method: req.method().clone(),
            uri: req.uri().to_string(),
            host: req.host().to_owned(),
            headers,
            form,
            body,
        }
    }

    fn emit(&self, response: &Response, duration: Duration) {
        // An unencodable body reaches the client as a 500 carrying the error text.
        let (status, rendered) = match response.payload() {
            Payload::Json(value) => (response.status().as_u16(), value.to_string()),
            Payload::Unencodable(msg) => (StatusCode::INTERNAL_SERVER_ERROR.as_u16(), msg.clone()),
        };

        macro_rules! event {
            ($level:ident) => {
                $level!(
                    method = %self.method,
                    uri = %self.uri,
                    host = %self.host,
                    headers = %self.headers,
                    form = %self.form,
                    body = %self.body,
                    ?duration,
                    status,
                    response = %rendered,
                    "request handled"
                )
            };
        }

        if status >= 300 {
            event!(warn);
        } else {
            event!(debug);
        }
    }
}

fn is_upload(req: &Request) -> bool {
    req.header(CONTENT_TYPE.as_str())
        .map(media_type)
        .is_some_and(|media| media.starts_with("multipart/"))
}

/// `type/subtype` of a content-type value, lowercased, without parameters.
fn media_type(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Form values of a `POST`, URL-encoded and sorted by key: the urlencoded body
/// followed by the query string. Empty for every other method.
fn form(req: &Request, body: &[u8]) -> String {
    if req.method() != Method::POST {
        return String::new();
    }

    let mut pairs: Vec<(String, String)> = Vec::new();
    let urlencoded = req
        .header(CONTENT_TYPE.as_str())
        .is_some_and(|ct| media_type(ct) == "application/x-www-form-urlencoded");
    if urlencoded {
        pairs.extend(serde_urlencoded::from_bytes::<Vec<(String, String)>>(body).unwrap_or_default());
    }
    if let Some(query) = req.uri().query() {
        pairs.extend(serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_default());
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}
