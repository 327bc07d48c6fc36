// src/commands/mod.rs

//! Command registry.
//!
//! Every command maps to one entry task of the plugin catalogue. The registry
//! is fixed at compile time; an unknown name is rejected before any
//! configuration is read.

use std::fmt::Write as _;

use crate::errors::{Result, SdkError};
use crate::exec::catalogue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub about: &'static str,
    /// Task run by the command.
    pub entry_task: &'static str,
    /// After the entry task, keep watching for changes until interrupted.
    pub watch: bool,
}

pub const COMMANDS: &[Command] = &[
    Command {
        name: "build",
        about: "Build the plugin tree",
        entry_task: catalogue::PLUGIN_READY,
        watch: false,
    },
    Command {
        name: "dev",
        about: "Build, sync to the sandbox and rebuild on change",
        entry_task: catalogue::DEV,
        watch: true,
    },
    Command {
        name: "deps",
        about: "Process scripts and write dependency metadata",
        entry_task: catalogue::PLUGIN_SCRIPT_DEPS,
        watch: false,
    },
    Command {
        name: "bundle",
        about: "Build the configured bundles",
        entry_task: catalogue::PLUGIN_BUNDLES,
        watch: false,
    },
    Command {
        name: "version-check",
        about: "Check the server against the minimum supported version",
        entry_task: catalogue::VERSION_CHECK,
        watch: false,
    },
];

pub const HELP: &str = "help";

/// What the command line asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Usage,
    Run(&'static Command),
}

/// Look a command up by name. No name, or `help`, asks for usage.
pub fn resolve(name: Option<&str>) -> Result<Invocation> {
    match name {
        None | Some(HELP) => Ok(Invocation::Usage),
        Some(name) => COMMANDS
            .iter()
            .find(|c| c.name == name)
            .map(Invocation::Run)
            .ok_or_else(|| SdkError::CommandNotFound(name.to_string())),
    }
}

/// Usage text listing every command.
pub fn usage() -> String {
    let width = COMMANDS
        .iter()
        .map(|c| c.name.len())
        .chain([HELP.len()])
        .max()
        .unwrap_or(0);

    let mut out = String::from("Usage: li [OPTIONS] <command>\n\nCommands:\n");
    for cmd in COMMANDS {
        let _ = writeln!(out, "  {:<width$}  {}", cmd.name, cmd.about);
    }
    let _ = writeln!(out, "  {:<width$}  Show this message", HELP);
    out.push_str("\nRun `li --help` for the list of options.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_commands_resolve_to_entry_tasks() {
        match resolve(Some("build")).unwrap() {
            Invocation::Run(cmd) => assert_eq!(cmd.entry_task, "plugin-ready"),
            other => panic!("unexpected {other:?}"),
        }
        match resolve(Some("dev")).unwrap() {
            Invocation::Run(cmd) => assert!(cmd.watch),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_or_help_prints_usage() {
        assert_eq!(resolve(None).unwrap(), Invocation::Usage);
        assert_eq!(resolve(Some("help")).unwrap(), Invocation::Usage);
    }

    #[test]
    fn unknown_command_exits_with_nine() {
        let err = resolve(Some("foo")).unwrap_err();
        assert_eq!(err.to_string(), "Command not found: foo");
        assert_eq!(err.exit_code(), 9);
    }

    #[test]
    fn usage_lists_every_command() {
        let text = usage();
        for cmd in COMMANDS {
            assert!(text.contains(cmd.name));
        }
        assert!(text.contains("help"));
    }
}
