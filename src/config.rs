//! Server configuration.
//!
//! ```rust
//! use portico::Config;
//! use std::time::Duration;
//!
//! let config = Config::default()
//!     .with_addr("127.0.0.1:3000")
//!     .with_shutdown_timeout(Duration::from_secs(5));
//!
//! assert_eq!(config.api_version(), "v1");
//! ```
//!
//! | Setting | Default | Env override |
//! |---|---|---|
//! | `addr` | `:8080` | `PORTICO_ADDR` |
//! | `timeout` | 20 s | `PORTICO_TIMEOUT_SECS` |
//! | `shutdown_timeout` | 20 s | `PORTICO_SHUTDOWN_TIMEOUT_SECS` |
//! | `graceful_timeout` | 21 s | `PORTICO_GRACEFUL_TIMEOUT_SECS` |
//! | `api_version` | `v1` | `PORTICO_API_VERSION` |
//! | `public_paths` | `/token`, `/authenticate` | `PORTICO_PUBLIC_PATHS` (comma separated) |

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Error;
use crate::middleware::DEFAULT_PUBLIC_PATHS;

pub const DEFAULT_ADDR: &str = ":8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_GRACEFUL_TIMEOUT_SECS: u64 = 21;
pub const DEFAULT_API_VERSION: &str = "v1";

const ENV_PREFIX: &str = "PORTICO_";

#[derive(Clone, Debug)]
pub struct Config {
    addr: String,
    timeout: Duration,
    shutdown_timeout: Duration,
    graceful_timeout: Duration,
    api_version: String,
    public_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_TIMEOUT_SECS),
            api_version: DEFAULT_API_VERSION.to_owned(),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

impl Config {
    /// Defaults, overridden by any `PORTICO_*` variables that are set.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let var = |key: &str| lookup(&format!("{ENV_PREFIX}{key}"));
        let secs = |key: &str| -> Result<Option<Duration>, Error> {
            var(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|e| Error::Config(format!("{ENV_PREFIX}{key}={raw}: {e}")))
                })
                .transpose()
        };

        let mut config = Self::default();
        if let Some(addr) = var("ADDR") {
            config.addr = addr;
        }
        if let Some(timeout) = secs("TIMEOUT_SECS")? {
            config.timeout = timeout;
        }
        if let Some(timeout) = secs("SHUTDOWN_TIMEOUT_SECS")? {
            config.shutdown_timeout = timeout;
        }
        if let Some(timeout) = secs("GRACEFUL_TIMEOUT_SECS")? {
            config.graceful_timeout = timeout;
        }
        if let Some(version) = var("API_VERSION") {
            config.api_version = version;
        }
        if let Some(paths) = var("PUBLIC_PATHS") {
            config.public_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect();
        }
        config.socket_addr()?;
        Ok(config)
    }

    /// Bind address. `:port` binds every interface.
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// HTTP/1 header read timeout, and the bound on one pipeline invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long open connections may drain once shutdown begins.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// How long to wait for the listener task after cancelling it.
    pub fn with_graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Paths served without authentication. Exact match on the request path.
    pub fn with_public_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn addr(&self) -> &str { &self.addr }
    pub fn timeout(&self) -> Duration { self.timeout }
    pub fn shutdown_timeout(&self) -> Duration { self.shutdown_timeout }
    pub fn graceful_timeout(&self) -> Duration { self.graceful_timeout }
    pub fn api_version(&self) -> &str { &self.api_version }
    pub fn public_paths(&self) -> &[String] { &self.public_paths }

    /// Parses [`addr`](Config::addr). A leading `:` means `0.0.0.0`.
    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        let addr = match self.addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => self.addr.clone(),
        };
        addr.parse().map_err(|_| Error::Address(self.addr.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn documented_defaults() {
        let config = Config::default();
        assert_eq!(config.addr(), ":8080");
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(20));
        assert_eq!(config.graceful_timeout(), Duration::from_secs(21));
        assert_eq!(config.api_version(), "v1");
        assert_eq!(config.public_paths(), ["/token", "/authenticate"]);
        assert_eq!(config.socket_addr().unwrap(), "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn env_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PORTICO_ADDR", "127.0.0.1:9000"),
            ("PORTICO_GRACEFUL_TIMEOUT_SECS", "5"),
            ("PORTICO_API_VERSION", "v2"),
            ("PORTICO_PUBLIC_PATHS", "/token, /health,"),
        ]))
        .unwrap();
        assert_eq!(config.addr(), "127.0.0.1:9000");
        assert_eq!(config.graceful_timeout(), Duration::from_secs(5));
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(config.api_version(), "v2");
        assert_eq!(config.public_paths(), ["/token", "/health"]);
    }

    #[test]
    fn malformed_env_values_are_config_errors() {
        let err = Config::from_lookup(lookup(&[("PORTICO_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("PORTICO_TIMEOUT_SECS=soon")));

        let err = Config::from_lookup(lookup(&[("PORTICO_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, Error::Address(addr) if addr == "nowhere"));
    }
}
