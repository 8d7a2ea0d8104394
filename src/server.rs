//! Route registration, the HTTP listener, and graceful shutdown.
//!
//! # Shutdown
//!
//! [`Server::listen_and_serve`] runs the accept loop on a background task and
//! waits for Ctrl-C or SIGTERM on the caller's task. On a signal it cancels
//! the loop, which:
//!
//! 1. stops accepting connections,
//! 2. asks every open connection to finish its in-flight request and close,
//!    waiting at most `shutdown_timeout`,
//! 3. aborts whatever is still running and returns.
//!
//! The caller in turn waits at most `graceful_timeout` for the task.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::middleware::{self, Authenticator, WireResponse};
use crate::request::Request;
use crate::response::Response;
use crate::router::{Mux, Route, Router};
use crate::token::VerifyKey;

/// The `system` reported by errors produced while routing.
pub const ROUTER_SYSTEM: &str = "router";

/// The HTTP server: a routing table whose every entry runs through the
/// authentication, logging and encoding middlewares.
///
/// ```rust,no_run
/// use http::Method;
/// use portico::{Config, Request, Response, Server, VerifyKey};
///
/// #[tokio::main]
/// async fn main() -> Result<(), portico::Error> {
///     let key = VerifyKey::rsa_pem(&std::fs::read("public.pem")?)?;
///
///     Server::new(Config::default(), key)
///         .handle(Method::GET, "/items/{id}", get_item)
///         .listen_and_serve()
///         .await
/// }
///
/// async fn get_item(req: Request) -> Response {
///     Response::ok(serde_json::json!({ "id": req.param("id") }))
/// }
/// ```
pub struct Server<M = Router> {
    config: Config,
    auth: Arc<Authenticator>,
    mux: M,
}

impl Server<Router> {
    /// A server verifying tokens with `key` and authorizing them against their
    /// ACL claims.
    pub fn new(config: Config, key: VerifyKey) -> Self {
        Self::with_parts(config, Authenticator::new(key), Router::new())
    }
}

impl<M: Mux> Server<M> {
    /// A server with a custom authenticator (e.g. another
    /// [`Authorize`](crate::Authorize) decider) or router. The public path
    /// allow-list always comes from `config`.
    pub fn with_parts(config: Config, auth: Authenticator, mux: M) -> Self {
        let auth = auth.with_public_paths(config.public_paths().iter().cloned());
        Self { config, auth: Arc::new(auth), mux }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers `endpoint` for `method` + `path`, wrapped as
    /// `Encoding(Logging(Authentication(endpoint)))`. Returns `self` for
    /// chaining.
    ///
    /// # Panics
    ///
    /// Panics if the router refuses `path` (bad syntax, or a conflict with an
    /// existing route). Routes are registered at startup, so this is a
    /// programming error.
    pub fn handle(mut self, method: Method, path: &str, endpoint: impl Endpoint) -> Self {
        let route = middleware::compose(endpoint, Arc::clone(&self.auth));
        self.mux
            .register(method, path, route)
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Binds the configured address, serves until Ctrl-C / SIGTERM, then shuts
    /// down gracefully.
    ///
    /// A bind failure is returned immediately. Failures after the shutdown
    /// signal are logged, not returned.
    pub async fn listen_and_serve(self) -> Result<(), Error> {
        let listener = TcpListener::bind(self.config.socket_addr()?).await?;
        let graceful_timeout = self.config.graceful_timeout();

        let shutdown = CancellationToken::new();
        let mut task = tokio::spawn(self.serve(listener, shutdown.clone()));

        tokio::select! {
            // The accept loop only returns on its own if it failed.
            joined = &mut task => return joined?,
            signal = shutdown_signal() => signal?,
        }

        shutdown.cancel();
        match tokio::time::timeout(graceful_timeout, task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!("shutdown error: {e}"),
            Ok(Err(e)) => warn!("server task failed during shutdown: {e}"),
            Err(_) => warn!(timeout = ?graceful_timeout, "server task did not stop in time"),
        }
        Ok(())
    }

    /// Serves connections from `listener` until `shutdown` is cancelled, then
    /// drains open connections for at most `shutdown_timeout`.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), Error> {
        let span = info_span!("server", api_version = %self.config.api_version());
        self.accept_loop(listener, shutdown).instrument(span).await
    }

    async fn accept_loop(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), Error> {
        let addr = listener.local_addr()?;
        let Server { config, mux, .. } = self;
        let mux = Arc::new(mux);
        let timeout = config.timeout();

        let mut builder = ConnBuilder::new(TokioExecutor::new());
        builder.http1().timer(TokioTimer::new()).header_read_timeout(timeout);

        let graceful = GracefulShutdown::new();
        let mut tasks = tokio::task::JoinSet::new();

        info!(%addr, "portico listening");

        loop {
            tokio::select! {
                // Check shutdown first so cancellation stops accepting at once,
                // even with connections queued.
                biased;

                () = shutdown.cancelled() => {
                    info!(in_flight = tasks.len(), "shutdown requested, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let mux = Arc::clone(&mux);
                    let svc = service_fn(move |req| {
                        let mux = Arc::clone(&mux);
                        async move { Ok::<_, Infallible>(dispatch(mux.as_ref(), req, timeout).await) }
                    });

                    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), svc);
                    let conn = graceful.watch(conn.into_owned());
                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set does not grow
                // without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        let drain = config.shutdown_timeout();
        if tokio::time::timeout(drain, graceful.shutdown()).await.is_err() {
            warn!(timeout = ?drain, open = tasks.len(), "shutdown timed out, abandoning open connections");
            tasks.abort_all();
        }
        while tasks.join_next().await.is_some() {}

        info!("portico stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one wire response. Routing failures and
/// timeouts are encoded like any other error response.
async fn dispatch<M: Mux>(mux: &M, req: hyper::Request<Incoming>, timeout: Duration) -> WireResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = match mux.route(&method, &path) {
        Route::Found(route, params) => {
            let request = Request::streaming(req, params);
            match tokio::time::timeout(timeout, route.serve(request)).await {
                Ok(wire) => return wire,
                Err(_) => {
                    warn!(%method, path, timeout = ?timeout, "request timed out");
                    Response::error(StatusCode::SERVICE_UNAVAILABLE, 3, "request timed out", ROUTER_SYSTEM)
                }
            }
        }
        Route::MethodNotAllowed => {
            Response::error(StatusCode::METHOD_NOT_ALLOWED, 2, "method not allowed for route", ROUTER_SYSTEM)
        }
        Route::NotFound => Response::not_found(1, "route not found", ROUTER_SYSTEM),
    };
    middleware::encode(Some(response), &path)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = sigterm.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
