//! Middleware layer.
//!
//! Every registered endpoint is wrapped in the same fixed stack, outermost
//! first:
//!
//! ```text
//! Encoding            ← writes the wire response, handles redirects
//!   Logging           ← buffers the body, times the call, one event per request
//!     Authentication  ← bearer token → claims → authorization decision
//!       endpoint      ← application code
//! ```
//!
//! A response flows back outward unchanged, except when authentication
//! short-circuits with its own `401`.

mod authentication;
mod encoding;
mod logging;

use std::sync::Arc;

pub use authentication::{Authenticator, DEFAULT_PUBLIC_PATHS, SYSTEM, Verdict};
pub use encoding::{Encoding, JSON_CONTENT_TYPE, WireResponse};
pub use logging::UPLOAD_PLACEHOLDER;

use crate::endpoint::Endpoint;
use authentication::Authentication;
use logging::Logging;

pub(crate) use encoding::encode;

/// Wraps `endpoint` as `Encoding(Logging(Authentication(endpoint)))`.
///
/// [`Server::handle`](crate::Server::handle) calls this for every route; use it
/// directly when plugging the pipeline into another router.
pub fn compose(endpoint: impl Endpoint, auth: Arc<Authenticator>) -> Encoding {
    let authenticated = Authentication::wrap(endpoint.into_boxed_endpoint(), auth);
    Encoding::new(Logging::wrap(authenticated))
}
