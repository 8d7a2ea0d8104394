//! Request routing.
//!
//! Route matching is a capability, not part of the pipeline: anything that can
//! register `(method, path) → route` and resolve an incoming request can back a
//! [`Server`](crate::Server) through the [`Mux`] trait. [`Router`] is the
//! default implementation: one radix tree per HTTP method, O(path-length)
//! lookup.

use std::collections::HashMap;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::middleware::Encoding;

/// Result of resolving a request against a [`Mux`].
pub enum Route {
    Found(Encoding, HashMap<String, String>),
    /// The path is registered, but not for this method.
    MethodNotAllowed,
    NotFound,
}

/// A routing table.
pub trait Mux: Send + Sync + 'static {
    fn register(&mut self, method: Method, path: &str, route: Encoding) -> Result<(), Error>;
    fn route(&self, method: &Method, path: &str) -> Route;
}

/// The default [`Mux`], backed by [`matchit`].
///
/// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Encoding>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Mux for Router {
    fn register(&mut self, method: Method, path: &str, route: Encoding) -> Result<(), Error> {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .map_err(|source| Error::Route { path: path.to_owned(), source })
    }

    fn route(&self, method: &Method, path: &str) -> Route {
        if let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) {
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Route::Found(matched.value.clone(), params);
        }
        if self.routes.values().any(|tree| tree.at(path).is_ok()) {
            Route::MethodNotAllowed
        } else {
            Route::NotFound
        }
    }
}
