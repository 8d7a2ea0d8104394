//! JSON encoding: the outermost layer and the only one that produces bytes.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::warn;

use crate::endpoint::BoxedEndpoint;
use crate::request::Request;
use crate::response::{Payload, Response};

/// Content type of every encoded response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// The response as written to the connection.
pub type WireResponse = http::Response<Full<Bytes>>;

/// A fully composed route: encoding around logging around authentication
/// around the terminal endpoint. Built by [`compose`](crate::middleware::compose).
#[derive(Clone)]
pub struct Encoding {
    inner: BoxedEndpoint,
}

impl Encoding {
    pub(crate) fn new(inner: BoxedEndpoint) -> Self {
        Self { inner }
    }

    /// Runs the inner pipeline and encodes its response.
    pub async fn serve(&self, req: Request) -> WireResponse {
        let path = req.path().to_owned();
        let reply = self.inner.call(req).await;
        encode(reply, &path)
    }
}

/// Turns a pipeline result into a wire response.
///
/// `None` leaves the wire response untouched (empty `200`). `301`/`302` become
/// redirects to the body string; everything else is written as JSON.
pub(crate) fn encode(reply: Option<Response>, request_path: &str) -> WireResponse {
    let mut wire = WireResponse::default();
    let Some(response) = reply else {
        return wire;
    };

    let headers = wire.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    for (name, value) in response.headers() {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "skipping invalid response header"),
        }
    }

    let status = response.status();
    if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
        let Some(target) = response.body().and_then(|body| body.as_str()) else {
            return internal_error(wire, "redirect target is not a string");
        };
        let location = resolve_location(request_path, target);
        let Ok(location) = HeaderValue::try_from(location) else {
            return internal_error(wire, "redirect target is not a valid header value");
        };
        wire.headers_mut().insert(LOCATION, location);
        *wire.status_mut() = status;
        return wire;
    }

    let encoded = match response.payload() {
        Payload::Json(value) => serde_json::to_vec(value).map_err(|e| e.to_string()),
        Payload::Unencodable(msg) => Err(msg.clone()),
    };
    match encoded {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            *wire.status_mut() = status;
            *wire.body_mut() = Full::new(Bytes::from(bytes));
            wire
        }
        Err(msg) => internal_error(wire, &msg),
    }
}

/// Plain-text `500` carrying the raw error text. Used only when encoding
/// itself failed, so it deliberately bypasses the JSON error shape.
fn internal_error(mut wire: WireResponse, msg: &str) -> WireResponse {
    warn!(error = %msg, "response encoding failed");
    let headers = wire.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    *wire.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    *wire.body_mut() = Full::new(Bytes::from(format!("{msg}\n")));
    wire
}

/// Resolves a redirect target the way browsers would read it relative to the
/// request: targets with a scheme or host are kept as-is, relative paths are
/// joined to the request path's directory, and dot segments are removed.
fn resolve_location(request_path: &str, target: &str) -> String {
    if has_scheme(target) || target.starts_with("//") {
        return target.to_owned();
    }

    let (path, query) = match target.find('?') {
        Some(i) => target.split_at(i),
        None => (target, ""),
    };
    let joined = if path.starts_with('/') {
        path.to_owned()
    } else {
        let dir = request_path.rfind('/').map_or("/", |i| &request_path[..=i]);
        format!("{dir}{path}")
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut cleaned = format!("/{}", segments.join("/"));
    let trailing = joined.ends_with('/') || joined.ends_with("/.") || joined.ends_with("/..");
    if trailing && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    cleaned + query
}

/// `true` if `target` starts with `scheme:`, where the scheme is a letter
/// followed by letters, digits, `+`, `-` or `.`.
fn has_scheme(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use serde_json::json;
    use std::collections::HashMap;

    async fn body_of(wire: WireResponse) -> Bytes {
        wire.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn no_response_writes_nothing() {
        let wire = encode(None, "/items");
        assert_eq!(wire.status(), StatusCode::OK);
        assert!(wire.headers().is_empty());
        assert!(body_of(wire).await.is_empty());
    }

    #[tokio::test]
    async fn json_body_with_status_and_copied_headers() {
        let mut res = Response::new(StatusCode::CREATED, json!({"id": 42}), None);
        res.set_header("location", "/items/42");
        let wire = encode(Some(res), "/items");

        assert_eq!(wire.status(), StatusCode::CREATED);
        assert_eq!(wire.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(wire.headers()["location"], "/items/42");
        assert_eq!(body_of(wire).await, Bytes::from_static(b"{\"id\":42}\n"));
    }

    #[test]
    fn response_headers_may_override_content_type() {
        let headers = HashMap::from([("Content-Type".to_owned(), "application/problem+json".to_owned())]);
        let wire = encode(Some(Response::new(StatusCode::OK, (), Some(headers))), "/");
        assert_eq!(wire.headers()[CONTENT_TYPE], "application/problem+json");
    }

    #[test]
    fn invalid_headers_are_skipped() {
        let mut res = Response::ok(());
        res.set_header("bad header", "x");
        res.set_header("x-ok", "line\nbreak");
        res.set_header("x-fine", "yes");
        let wire = encode(Some(res), "/");
        assert_eq!(wire.headers().len(), 2);
        assert_eq!(wire.headers()["x-fine"], "yes");
    }

    #[rstest]
    #[case(Response::redirect("/login"), StatusCode::FOUND, "/login")]
    #[case(Response::moved_permanently("https://example.com/new"), StatusCode::MOVED_PERMANENTLY, "https://example.com/new")]
    #[tokio::test]
    async fn redirects_skip_json_encoding(
        #[case] res: Response,
        #[case] status: StatusCode,
        #[case] location: &str,
    ) {
        let wire = encode(Some(res), "/items/42");
        assert_eq!(wire.status(), status);
        assert_eq!(wire.headers()[LOCATION], location);
        assert!(body_of(wire).await.is_empty());
    }

    #[tokio::test]
    async fn redirect_with_non_string_body_is_a_raw_500() {
        let res = Response::new(StatusCode::FOUND, json!({"to": "/login"}), None);
        let wire = encode(Some(res), "/");
        assert_eq!(wire.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(wire).await, Bytes::from_static(b"redirect target is not a string\n"));
    }

    #[tokio::test]
    async fn unencodable_body_is_a_raw_500() {
        let body = HashMap::from([((1u8, 2u8), 3u8)]);
        let wire = encode(Some(Response::new(StatusCode::OK, body, None)), "/");

        assert_eq!(wire.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(wire.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(wire.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        let text = body_of(wire).await;
        assert!(std::str::from_utf8(&text).unwrap().contains("key must be a string"));
    }

    #[rstest]
    #[case("/items/42", "/login", "/login")]
    #[case("/items/42", "edit", "/items/edit")]
    #[case("/items/42/", "edit", "/items/42/edit")]
    #[case("/items/42", "../orders?page=2", "/orders?page=2")]
    #[case("/a/b", "./c/", "/a/c/")]
    #[case("/a/b", "/x/../y", "/y")]
    #[case("/", "https://example.com", "https://example.com")]
    #[case("/", "//cdn.example.com/x", "//cdn.example.com/x")]
    #[case("/items/42", "mailto:ops@example.com", "mailto:ops@example.com")]
    #[case("/items/42", "urn:isbn:0451450523", "urn:isbn:0451450523")]
    #[case("/items/42", "a/b:c", "/items/a/b:c")]
    #[case("/items/42", "1x:y", "/items/1x:y")]
    fn location_resolution(#[case] request: &str, #[case] target: &str, #[case] expected: &str) {
        assert_eq!(resolve_location(request, target), expected);
    }
}
