//! Tracing setup for the `fpgaflow` binary.
//!
//! Tracing carries developer diagnostics (spawned commands, stage timings).
//! The curated build summary a user reads goes through the pipeline's
//! `Logger` sinks instead, so the two never interleave on the same stream
//! unless the caller wires them that way.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Output goes to stderr so stdout
/// stays reserved for the build summary. With `json`, each event is one
/// JSON object per line.
///
/// Only the first call in a process has any effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}
