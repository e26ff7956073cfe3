//! Controller configuration, read from environment variables.
//!
//! | Variable                | Default        |
//! |-------------------------|----------------|
//! | `WATCH_NAMESPACE`       | all namespaces |
//! | `HTTP_ADDR`             | `0.0.0.0:8080` |
//! | `RECONCILE_CONCURRENCY` | `4`            |
//! | `RECONCILE_DEBOUNCE_MS` | `1000`         |

use crate::error::ControllerError;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_CONCURRENCY: u16 = 4;
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace to watch; `None` watches the whole cluster
    pub namespace: Option<String>,
    /// Listen address for probes, metrics and admission
    pub http_addr: SocketAddr,
    /// Maximum number of Applications reconciled at once
    pub concurrency: u16,
    /// Quiet period collapsing bursts of watch events
    pub debounce: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let http_addr: SocketAddr = parse_or(&lookup, "HTTP_ADDR", DEFAULT_HTTP_ADDR.parse().ok())?;
        let concurrency = parse_or(&lookup, "RECONCILE_CONCURRENCY", Some(DEFAULT_CONCURRENCY))?;
        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        let debounce_ms = parse_or(&lookup, "RECONCILE_DEBOUNCE_MS", Some(DEFAULT_DEBOUNCE_MS))?;

        Ok(Self {
            namespace,
            http_addr,
            concurrency,
            debounce: Duration::from_millis(debounce_ms),
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Option<T>,
) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{} has invalid value {:?}: {}", key, raw, e))
        }),
        None => default.ok_or_else(|| ControllerError::InvalidConfig(format!("{} is required", key))),
    }
}
