//! Endpoint trait and type erasure.
//!
//! # How endpoints and middlewares are stored
//!
//! The router holds endpoints of *different* types, and every middleware wraps
//! "whatever is inside it". Both need one uniform type, so endpoints are erased
//! behind a trait object (`dyn ErasedEndpoint`):
//!
//! ```text
//! async fn get_item(req: Request) -> Response { … }   ← user writes this
//!        ↓ server.handle(Method::GET, "/items/{id}", get_item)
//! get_item.into_boxed_endpoint()                      ← Endpoint blanket impl
//!        ↓
//! Arc::new(FnEndpoint(get_item))                      ← stored as BoxedEndpoint
//!        ↓ wrapped by Authentication, then Logging     ← also BoxedEndpoints
//! endpoint.call(req) at request time                  ← one vtable call per layer
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` let tokio move the future across worker threads.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface shared by endpoints and middlewares.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Endpoint` trait's `into_boxed_endpoint` method.
#[doc(hidden)]
pub trait ErasedEndpoint {
    fn call(&self, req: Request) -> BoxFuture<Option<Response>>;
}

/// A type-erased endpoint shared across concurrent requests.
#[doc(hidden)]
pub type BoxedEndpoint = Arc<dyn ErasedEndpoint + Send + Sync + 'static>;

// ── Public Endpoint trait ─────────────────────────────────────────────────────

/// Implemented for every valid terminal endpoint.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Endpoints that need state capture it, typically behind an `Arc`:
///
/// ```rust
/// use std::sync::Arc;
/// use portico::{Request, Response};
///
/// let greeting = Arc::new(String::from("hello"));
/// let endpoint = move |_req: Request| {
///     let greeting = Arc::clone(&greeting);
///     async move { Response::ok(greeting.as_str()) }
/// };
/// # fn assert_endpoint(_: impl portico::Endpoint) {}
/// # assert_endpoint(endpoint);
/// ```
pub trait Endpoint: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_endpoint(self) -> BoxedEndpoint;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Endpoint for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_endpoint(self) -> BoxedEndpoint {
        Arc::new(FnEndpoint(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete endpoint function to the trait-object world.
struct FnEndpoint<F>(F);

impl<F, Fut, R> ErasedEndpoint for FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Option<Response>> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
