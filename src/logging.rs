//! Logging setup
//!
//! Code logs through the `log` facade. Records are bridged into `tracing`
//! and written to stderr by a `tracing-subscriber` fmt layer, so `RUST_LOG`
//! directives work when no verbosity flag is given. Run milestones are
//! emitted as structured event lines (`message | {json}`).

use std::io::IsTerminal;

use anyhow::{Context, Result};
use log::{Level, LevelFilter};
use serde_json::Value;
use tracing_log::{AsLog, LogTracer};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

/// Map `--quiet` / `-v` counts to a level filter
pub fn level_for(quiet: bool, verbosity: u8) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Filter for the stderr layer: --quiet > -v > RUST_LOG > default "warn"
pub fn filter_for(quiet: bool, verbosity: u8) -> EnvFilter {
    if quiet || verbosity > 0 {
        EnvFilter::new(level_for(quiet, verbosity).as_str().to_lowercase())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Route `log` records to a stderr subscriber. Fails if called twice.
pub fn init(filter: EnvFilter) -> Result<()> {
    let max_level = filter
        .max_level_hint()
        .map(|level| level.as_log())
        .unwrap_or(LevelFilter::Trace);
    LogTracer::builder()
        .with_max_level(max_level)
        .init()
        .context("Failed to route log records to tracing")?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_filter(filter);
    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(stderr_layer))
        .context("Failed to install log subscriber")?;
    Ok(())
}

/// Emit a structured event line at the given level
pub fn log_event(level: Level, event: &str, data: &Value) {
    if !log::log_enabled!(level) {
        return;
    }

    let mut payload = data.clone();
    if let Value::Object(map) = &mut payload {
        map.insert("event".to_string(), Value::String(event.to_string()));
        map.insert("timestamp".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
    }
    log::log!(level, "{} | {}", event, payload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter as TraceLevel;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_for(true, 3), LevelFilter::Error);
        assert_eq!(level_for(false, 0), LevelFilter::Warn);
        assert_eq!(level_for(false, 1), LevelFilter::Info);
        assert_eq!(level_for(false, 2), LevelFilter::Debug);
        assert_eq!(level_for(false, 9), LevelFilter::Trace);
    }

    #[test]
    fn test_flags_override_environment_filter() {
        assert_eq!(filter_for(true, 2).max_level_hint(), Some(TraceLevel::ERROR));
        assert_eq!(filter_for(false, 1).max_level_hint(), Some(TraceLevel::INFO));
        assert_eq!(filter_for(false, 3).max_level_hint(), Some(TraceLevel::TRACE));
    }
}
