//! Tracing subscriber setup
//!
//! The library only emits `tracing` events. Applications embedding it may
//! call [`init_tracing`] once at startup to get human-readable or JSON
//! output on stdout.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Errors
///
/// Returns an error if `level` is not a valid filter directive or a global
/// subscriber is already installed
///
/// # Examples
///
/// ```no_run
/// use chatkeep::logging::init_tracing;
///
/// init_tracing("chatkeep=debug", false).unwrap();
/// ```
pub fn init_tracing(level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init()?;
    }

    Ok(())
}
