//! # portico
//!
//! An HTTP service skeleton for JSON APIs: a configurable server with graceful
//! shutdown, a router, and a fixed middleware pipeline around every endpoint.
//!
//! ## The pipeline
//!
//! Every route runs through the same three layers, outermost first:
//!
//! - **Encoding**: writes the [`Response`] as JSON, or as a redirect for
//!   `301`/`302`
//! - **Logging**: one structured [`tracing`] event per request, with the
//!   request body, timing and the response
//! - **Authentication**: verifies the `Authorization: Bearer <jwt>` header and
//!   asks an [`Authorize`] decider whether the token's claims allow the
//!   request; paths on the public allow-list skip the check
//!
//! Endpoints are plain async functions returning a [`Response`], an
//! [`ApiError`], a `Result` of the two, or `Option<Response>` when nothing
//! should be written.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use portico::{ApiError, Config, Request, Response, Server, VerifyKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), portico::Error> {
//!     let config = Config::from_env()?;
//!     let key = VerifyKey::hmac(b"secret");
//!
//!     Server::new(config, key)
//!         .handle(Method::GET,  "/items/{id}", get_item)
//!         .handle(Method::POST, "/items",      create_item)
//!         .listen_and_serve()
//!         .await
//! }
//!
//! async fn get_item(req: Request) -> Result<Response, ApiError> {
//!     match req.param("id") {
//!         Some("42") => Ok(Response::ok(serde_json::json!({ "id": 42 }))),
//!         _ => Err(ApiError::new(StatusCode::NOT_FOUND, "no such item", "items", 1)),
//!     }
//! }
//!
//! async fn create_item(mut req: Request) -> Result<Response, ApiError> {
//!     let item: serde_json::Value = req
//!         .json()
//!         .await
//!         .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string(), "items", 2))?;
//!     Ok(Response::new(StatusCode::CREATED, item, None))
//! }
//! ```

mod action;
mod api_error;
mod authorize;
mod claims;
mod config;
mod endpoint;
mod error;
mod request;
mod response;
mod router;
mod server;
mod token;

pub mod middleware;

pub use action::Action;
pub use api_error::ApiError;
pub use authorize::{AclAuthorizer, Authorize};
pub use claims::{Acl, Claims, Permissions, User};
pub use config::Config;
pub use endpoint::Endpoint;
pub use error::Error;
pub use request::Request;
pub use response::{IntoResponse, Response};
pub use router::{Mux, Route, Router};
pub use server::{ROUTER_SYSTEM, Server};
pub use token::{TokenError, VerifyKey};
