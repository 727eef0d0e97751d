//! # Logging
//!
//! Installs a global `tracing` subscriber. Libraries embedding tetherun that
//! already install their own subscriber should skip this.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::config::Config;

/// Installs a stderr fmt subscriber filtered by `RUST_LOG`, falling back to
/// `debug` when `config.debug_enabled` is set and `info` otherwise.
///
/// Only the first call has any effect.
pub fn init(config: &Config) {
    static INITIALISED: OnceLock<()> = OnceLock::new();

    let _ = INITIALISED.get_or_init(|| {
        let directive = if config.debug_enabled { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

        let subscriber = fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .compact()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
