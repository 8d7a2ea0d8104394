//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use serde::de::DeserializeOwned;

use crate::claims::Claims;
use crate::error::Error;

/// Request body: still on the connection, or already read into memory.
enum Body {
    Streaming(Incoming),
    Buffered(Bytes),
}

/// An incoming HTTP request, as seen by middlewares and endpoints.
///
/// The body is not read until someone asks for it. [`bytes`](Request::bytes)
/// reads it once and keeps it, so several layers can observe the same payload.
pub struct Request {
    parts: http::request::Parts,
    body: Body,
    params: HashMap<String, String>,
    claims: Option<Claims>,
}

impl Request {
    pub(crate) fn streaming(req: hyper::Request<Incoming>, params: HashMap<String, String>) -> Self {
        let (parts, body) = req.into_parts();
        Self { parts, body: Body::Streaming(body), params, claims: None }
    }

    /// Builds a request from an in-memory `http::Request`.
    ///
    /// ```rust
    /// use portico::Request;
    ///
    /// let req = Request::from_http(
    ///     http::Request::post("/items")
    ///         .header("content-type", "application/json")
    ///         .body(bytes::Bytes::from_static(br#"{"name":"lamp"}"#))
    ///         .unwrap(),
    /// );
    /// assert_eq!(req.path(), "/items");
    /// ```
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self { parts, body: Body::Buffered(body), params: HashMap::new(), claims: None }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }

    /// First value of header `name` (case-insensitive), if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Host` header, falling back to the URI authority (HTTP/2).
    pub fn host(&self) -> &str {
        self.header(http::header::HOST.as_str())
            .or_else(|| self.parts.uri.host())
            .unwrap_or("")
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/items/{id}`, `req.param("id")` on `/items/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Claims of the verified bearer token. `None` on public routes.
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub(crate) fn set_claims(&mut self, claims: Claims) {
        self.claims = Some(claims);
    }

    /// Reads the whole body, buffering it for later callers.
    ///
    /// If reading fails the body is gone: later calls see an empty body.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        let bytes = match std::mem::replace(&mut self.body, Body::Buffered(Bytes::new())) {
            Body::Buffered(bytes) => bytes,
            Body::Streaming(incoming) => incoming.collect().await?.to_bytes(),
        };
        self.body = Body::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Deserializes the JSON body.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn post(body: &'static [u8]) -> Request {
        Request::from_http(
            http::Request::post("http://example.com/items?x=1")
                .header("Content-Type", "application/json")
                .body(Bytes::from_static(body))
                .unwrap(),
        )
    }

    #[test]
    fn exposes_request_line_and_headers() {
        let req = post(b"");
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/items");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.host(), "example.com");
        assert!(req.claims().is_none());
    }

    #[tokio::test]
    async fn body_can_be_read_more_than_once() {
        let mut req = post(br#"{"name":"lamp"}"#);
        assert_eq!(req.bytes().await.unwrap(), Bytes::from_static(br#"{"name":"lamp"}"#));
        assert_eq!(req.bytes().await.unwrap().len(), 15);

        #[derive(Deserialize)]
        struct Item { name: String }
        let item: Item = req.json().await.unwrap();
        assert_eq!(item.name, "lamp");
    }
}
