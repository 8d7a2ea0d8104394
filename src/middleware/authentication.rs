//! Bearer-token authentication and claims-based authorization.
//!
//! Every request ends in one of two states:
//!
//! - **pass-through**: the path is public, or the token is authentic and its
//!   claims grant the request. The wrapped endpoint runs and its response is
//!   forwarded untouched.
//! - **rejected**: a structured `401` (or `500` if the verifier itself blew
//!   up) is returned and the endpoint never runs.
//!
//! | code | message |
//! |---|---|
//! | 100 | token is not provided |
//! | 101 | token is not valid |
//! | 102 | method is not allowed |
//! | 103 | *claims decoder error* |
//! | 104 | authorization header is malformed |
//! | 105 | *verifier panic message* (500) |

use std::collections::HashSet;
use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::{HeaderValue, Method};
use tracing::{debug, error};

use crate::authorize::{AclAuthorizer, Authorize};
use crate::claims::Claims;
use crate::endpoint::{BoxFuture, BoxedEndpoint, ErasedEndpoint};
use crate::request::Request;
use crate::response::Response;
use crate::token::{TokenError, VerifyKey};

/// The `system` reported in every error this layer produces.
pub const SYSTEM: &str = "JWT middleware";

/// Paths that skip authentication unless configured otherwise.
pub const DEFAULT_PUBLIC_PATHS: [&str; 2] = ["/token", "/authenticate"];

/// Outcome of [`Authenticator::check`].
#[derive(Debug)]
pub enum Verdict {
    /// Public path: the `Authorization` header was not looked at.
    Public,
    /// Authentic token whose claims grant the request.
    Granted(Claims),
    /// Refused; the response is returned without calling the endpoint.
    Rejected(Response),
}

/// Shared, read-only authentication state: the verification key, the
/// authorization decider and the public path allow-list.
pub struct Authenticator {
    key: VerifyKey,
    authorizer: Arc<dyn Authorize>,
    public_paths: HashSet<String>,
}

impl Authenticator {
    /// Verifies with `key`, authorizes with [`AclAuthorizer`], and lets
    /// [`DEFAULT_PUBLIC_PATHS`] through.
    pub fn new(key: VerifyKey) -> Self {
        Self {
            key,
            authorizer: Arc::new(AclAuthorizer),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    pub fn with_authorizer(mut self, authorizer: impl Authorize) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Replaces the public path allow-list. Matching is exact on the request
    /// path; the query string is ignored.
    pub fn with_public_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(path)
    }

    /// Runs the authentication state machine for one request.
    pub fn check(&self, method: &Method, path: &str, authorization: Option<&HeaderValue>) -> Verdict {
        if self.is_public(path) {
            return Verdict::Public;
        }
        match self.authenticate(method, path, authorization) {
            Ok(claims) => Verdict::Granted(claims),
            Err(rejection) => {
                debug!(%method, path, code = rejection.code(), "request rejected");
                Verdict::Rejected(rejection.into_response())
            }
        }
    }

    fn authenticate(
        &self,
        method: &Method,
        path: &str,
        authorization: Option<&HeaderValue>,
    ) -> Result<Claims, Rejection> {
        let value = match authorization {
            None => return Err(Rejection::NotProvided),
            Some(value) => value.to_str().map_err(|_| Rejection::Malformed)?,
        };
        if value.trim().is_empty() {
            return Err(Rejection::NotProvided);
        }
        let token = bearer_token(value).ok_or(Rejection::Malformed)?;

        let claims = self.key.verify(token).map_err(|e| match e {
            TokenError::Invalid(_) => Rejection::Invalid,
            TokenError::Claims(msg) => Rejection::Claims(msg),
            TokenError::Internal(msg) => {
                error!(error = %msg, "token verification panicked");
                Rejection::Internal(msg)
            }
        })?;

        if !self.authorizer.authorize(&claims, method, path) {
            return Err(Rejection::NotAllowed);
        }
        Ok(claims)
    }
}

/// Isolates the token from `Bearer <token>`. Anything that is not exactly a
/// scheme and a token is refused.
fn bearer_token(value: &str) -> Option<&str> {
    let mut segments = value.split_whitespace();
    match (segments.next(), segments.next(), segments.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

enum Rejection {
    NotProvided,
    Invalid,
    NotAllowed,
    Claims(String),
    Malformed,
    Internal(String),
}

impl Rejection {
    fn code(&self) -> u32 {
        match self {
            Self::NotProvided => 100,
            Self::Invalid => 101,
            Self::NotAllowed => 102,
            Self::Claims(_) => 103,
            Self::Malformed => 104,
            Self::Internal(_) => 105,
        }
    }

    fn into_response(self) -> Response {
        let code = self.code();
        match self {
            Self::NotProvided => Response::unauthorized(code, "token is not provided", SYSTEM),
            Self::Invalid => Response::unauthorized(code, "token is not valid", SYSTEM),
            Self::NotAllowed => Response::unauthorized(code, "method is not allowed", SYSTEM),
            Self::Claims(msg) => Response::unauthorized(code, msg, SYSTEM),
            Self::Malformed => Response::unauthorized(code, "authorization header is malformed", SYSTEM),
            Self::Internal(msg) => Response::internal_server(code, msg, SYSTEM),
        }
    }
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// Wraps an endpoint so it only runs for authenticated, authorized requests.
pub(crate) struct Authentication {
    inner: BoxedEndpoint,
    auth: Arc<Authenticator>,
}

impl Authentication {
    pub(crate) fn wrap(inner: BoxedEndpoint, auth: Arc<Authenticator>) -> BoxedEndpoint {
        Arc::new(Self { inner, auth })
    }
}

impl ErasedEndpoint for Authentication {
    fn call(&self, mut req: Request) -> BoxFuture<Option<Response>> {
        match self.auth.check(req.method(), req.path(), req.headers().get(AUTHORIZATION)) {
            Verdict::Public => self.inner.call(req),
            Verdict::Granted(claims) => {
                req.set_claims(claims);
                self.inner.call(req)
            }
            Verdict::Rejected(response) => Box::pin(async move { Some(response) }),
        }
    }
}
