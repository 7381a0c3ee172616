//! Logging support.
//!
//! Library code never installs a subscriber; it only emits
//! `tracing::{trace,debug,info,warn,error}!`. [`init`] is the one entry
//! point a binary calls, matching the teacher's one-`init()`-function
//! logging convention.

use eyre::Result;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Initializes the global `tracing` subscriber from `RUST_LOG`, falling back
/// to [`DEFAULT_LOG_LEVEL`]. Safe to call more than once; only the first
/// call takes effect.
///
/// # Panics
///
/// If the subscriber fails to install.
pub fn init() {
    static LOGGER: OnceLock<()> = OnceLock::new();
    LOGGER.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .try_init()
            .expect("failed to initialize the logger");
    });
}

/// Installs `color_eyre`'s panic and error report hooks, in addition to the
/// `tracing` subscriber. Call once from a binary's `main`.
///
/// # Panics
///
/// If either hook fails to install.
pub fn install() -> Result<()> {
    color_eyre::install()?;
    init();
    Ok(())
}
