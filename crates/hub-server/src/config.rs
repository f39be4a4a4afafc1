//! Configuration for the hub WebSocket server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `HUB_BIND_ADDR`         (default: "0.0.0.0")
//! - `HUB_PORT`              (default: "8080")
//! - `HUB_WS_PATH`           (default: "/ws")
//! - `HUB_MAX_PARTICIPANTS`  (default: "100")
//! - `HUB_IDLE_TIMEOUT_SECS` (default: "600")
//! - `HUB_ANNOUNCE_PRESENCE` (default: "false")
//! - `HUB_ALLOWED_ORIGINS`   (default: "", comma separated; empty accepts any origin)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use hub_core::{HubConfig, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_PARTICIPANTS};

use crate::transport::UpgradePolicy;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Path that accepts the WebSocket upgrade.
    pub ws_path: String,

    /// Maximum number of simultaneously connected participants.
    pub max_participants: usize,

    /// Silent connections are closed after this long.
    pub idle_timeout: Duration,

    /// Broadcast join/leave announcements.
    pub announce_presence: bool,

    /// Accepted `Origin` header values. Empty accepts everything.
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            ws_path: "/ws".to_string(),
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            announce_presence: false,
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults above.
    pub fn from_env() -> anyhow::Result<Self> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let ws_path = lookup("HUB_WS_PATH").unwrap_or(defaults.ws_path);
        if !ws_path.starts_with('/') {
            bail!("HUB_WS_PATH must start with '/', got {ws_path:?}");
        }

        let idle_secs = read_or_default(
            &lookup,
            "HUB_IDLE_TIMEOUT_SECS",
            defaults.idle_timeout.as_secs(),
        )?;
        if idle_secs == 0 {
            bail!("HUB_IDLE_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Config {
            bind_addr: lookup("HUB_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: read_or_default(&lookup, "HUB_PORT", defaults.port)?,
            ws_path,
            max_participants: read_or_default(
                &lookup,
                "HUB_MAX_PARTICIPANTS",
                defaults.max_participants,
            )?,
            idle_timeout: Duration::from_secs(idle_secs),
            announce_presence: read_or_default(
                &lookup,
                "HUB_ANNOUNCE_PRESENCE",
                defaults.announce_presence,
            )?,
            allowed_origins: lookup("HUB_ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig::new(self.max_participants)
            .with_idle_timeout(self.idle_timeout)
            .with_presence(self.announce_presence)
    }

    pub fn upgrade_policy(&self) -> UpgradePolicy {
        UpgradePolicy::new(self.ws_path.clone()).with_allowed_origins(self.allowed_origins.clone())
    }
}

fn read_or_default<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {val:?}")),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
