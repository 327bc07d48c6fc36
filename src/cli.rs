// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::{DEFAULT_PROJECT_CONFIG, DEFAULT_SERVER_CONFIG};

/// Command-line arguments for `li`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "li",
    version,
    about = "Build, check and live-sync a community plugin.",
    long_about = None
)]
pub struct CliArgs {
    /// Command to run (build, dev, deps, bundle, version-check, help).
    #[arg(value_name = "COMMAND")]
    pub command: Option<String>,

    /// Path to the server configuration (JSON).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SERVER_CONFIG)]
    pub server_config: String,

    /// Path to the project manifest (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PROJECT_CONFIG)]
    pub project: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LI_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the tasks the command would run, without running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Minimum server version to accept, as `major.minor`.
    #[arg(long, value_name = "VERSION")]
    pub min_version: Option<String>,

    /// Use the XML version-check response of older servers.
    #[arg(long)]
    pub legacy_version_check: bool,

    /// Do not read the server configuration; use built-in defaults.
    #[arg(long)]
    pub use_server_defaults: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_conventional_files() {
        let args = CliArgs::try_parse_from(["li", "build"]).unwrap();
        assert_eq!(args.command.as_deref(), Some("build"));
        assert_eq!(args.server_config, "server.conf.json");
        assert_eq!(args.project, "plugin.toml");
        assert!(!args.dry_run);
    }

    #[test]
    fn command_is_optional() {
        let args = CliArgs::try_parse_from(["li", "--dry-run"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.dry_run);
    }

    #[test]
    fn version_flags_parse() {
        let args = CliArgs::try_parse_from([
            "li",
            "version-check",
            "--min-version",
            "23.1",
            "--legacy-version-check",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.min_version.as_deref(), Some("23.1"));
        assert!(args.legacy_version_check);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
