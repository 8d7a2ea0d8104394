//! Unified error type.

/// The error type returned by portico's fallible operations.
///
/// Request-level failures (401, 404, etc.) are expressed as
/// [`Response`](crate::Response) values built from [`ApiError`](crate::ApiError),
/// never as `Error`s. This type surfaces infrastructure failures: binding a
/// port, registering a route, loading a key or configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid address `{0}`")]
    Address(String),

    #[error("invalid route `{path}`: {source}")]
    Route {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("invalid verification key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),

    #[error("reading request body: {0}")]
    Body(#[from] hyper::Error),

    #[error("decoding request body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("server task: {0}")]
    Task(#[from] tokio::task::JoinError),
}
