// src/logging.rs

//! Logging setup for `li` using `tracing` + `tracing-subscriber`.
//!
//! Level selection:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `LI_LOG`: a bare level ("debug") or full filter directives
//!    ("info,plugin_sdk::sync=debug")
//! 3. default to `info`
//!
//! A bare level applies to this crate's own targets (`plugin_sdk::build`,
//! `plugin_sdk::sync`, ...). HTTP and file-watching dependencies stay at
//! `warn` unless named explicitly in `LI_LOG`.
//!
//! Logs go to STDERR so that stdout carries only usage text and dry-run
//! plans.

use anyhow::{Context, Result, anyhow};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "LI_LOG";

/// Dependencies that log per request or per filesystem event.
const QUIET_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "notify"];

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid {LOG_ENV} filter '{directives}'"))?;

    // Module targets only help once build and sync steps log in detail.
    let verbose = matches!(
        effective_level(cli_level, env.as_deref()),
        Some(Level::DEBUG) | Some(Level::TRACE) | None
    );

    fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("logging already initialised: {err}"))
}

/// The single level in force, or `None` when `LI_LOG` carries custom
/// directives.
fn effective_level(cli_level: Option<LogLevel>, env: Option<&str>) -> Option<Level> {
    match (cli_level, env) {
        (Some(lvl), _) => Some(level_from_log_level(lvl)),
        (None, Some(raw)) if !raw.trim().is_empty() => parse_level_str(raw),
        (None, _) => Some(Level::INFO),
    }
}

/// Filter directives for the subscriber.
fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    match effective_level(cli_level, env) {
        Some(level) => level_directives(level),
        None => env.unwrap_or_default().trim().to_string(),
    }
}

fn level_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let mut directives = vec![level.clone(), format!("plugin_sdk={level}")];
    directives.extend(QUIET_DEPENDENCIES.iter().map(|dep| format!("{dep}=warn")));
    directives.join(",")
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names_case_insensitively() {
        assert_eq!(parse_level_str("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level_str(" warning "), Some(Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }

    #[test]
    fn flag_wins_over_environment() {
        let directives = filter_directives(Some(LogLevel::Debug), Some("trace"));
        assert!(directives.starts_with("debug,plugin_sdk=debug"));
    }

    #[test]
    fn bare_level_keeps_http_and_watcher_quiet() {
        let directives = filter_directives(None, Some("trace"));
        assert!(directives.contains("plugin_sdk=trace"));
        assert!(directives.contains("reqwest=warn"));
        assert!(directives.contains("notify=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn custom_directives_pass_through() {
        let raw = "warn,plugin_sdk::sync=debug";
        assert_eq!(filter_directives(None, Some(raw)), raw);
        assert_eq!(effective_level(None, Some(raw)), None);
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(effective_level(None, None), Some(Level::INFO));
        assert_eq!(effective_level(None, Some("  ")), Some(Level::INFO));
        assert!(filter_directives(None, None).starts_with("info,plugin_sdk=info"));
    }
}
