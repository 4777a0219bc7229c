//! Tracing initialisation for toolcanon binaries.
//!
//! Call [`init_tracing`] once at program start. Later calls are ignored
//! because the global subscriber can only be set once per process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events follow the requested level; everything else stays
/// at `warn`.
const OWN_TARGETS: &[&str] = &["toolcanon_core", "toolcanon_exec", "toolcanon"];

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec![Level::WARN.as_str().to_ascii_lowercase()];
    directives.extend(
        OWN_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str().to_ascii_lowercase())),
    );
    directives.join(",")
}

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON log lines.
/// * `level`: verbosity of toolcanon's own events when `RUST_LOG` is not
///   set. Dependencies stay at `warn`.
///
/// Logs go to stderr so stdout stays reserved for results.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}
