//! # Configuration
//!
//! Knobs shared by both execution contexts. The caller owns the `Config`; the
//! transport context receives the subset it needs in a `Configure` request.

use std::time::Duration;

pub const DEFAULT_SOCKET_ADDR: &str = "ws://127.0.0.1:4000/debugger";
pub const DEFAULT_BLOCKING_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_DEBUG: &str = "TETHER_DEBUG";
const ENV_SOCKET_ADDR: &str = "TETHER_SOCKET_ADDR";
const ENV_BLOCKING_TIMEOUT_MS: &str = "TETHER_BLOCKING_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Log every message crossing the context boundary and the socket.
    pub debug_enabled: bool,
    /// Address of the remote debugger.
    pub socket_addr: String,
    /// Upper bound on a single blocking exchange.
    pub blocking_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug_enabled: false,
            socket_addr: DEFAULT_SOCKET_ADDR.to_string(),
            blocking_timeout: DEFAULT_BLOCKING_TIMEOUT,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `TETHER_DEBUG`, `TETHER_SOCKET_ADDR` and
    /// `TETHER_BLOCKING_TIMEOUT_MS`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DEBUG) {
            config.debug_enabled = matches!(value.as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(addr) = lookup(ENV_SOCKET_ADDR) {
            config.socket_addr = addr;
        }
        if let Some(ms) = lookup(ENV_BLOCKING_TIMEOUT_MS).and_then(|v| v.parse::<u64>().ok()) {
            config.blocking_timeout = Duration::from_millis(ms);
        }

        config
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    pub fn with_socket_addr(mut self, addr: impl Into<String>) -> Self {
        self.socket_addr = addr.into();
        self
    }

    pub fn with_blocking_timeout(mut self, timeout: Duration) -> Self {
        self.blocking_timeout = timeout;
        self
    }

    /// The part of the configuration the transport context needs.
    pub fn transport(&self) -> Configuration {
        Configuration {
            socket_addr: self.socket_addr.clone(),
            debug_enabled: self.debug_enabled,
        }
    }
}

/// Payload of a `Configure` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub socket_addr: String,
    pub debug_enabled: bool,
}
