// src/errors.rs

//! Crate-wide error type, result alias and exit-code mapping.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid plugin point '{name}'. Valid plugin points: {valid}")]
    InvalidPluginPoint { name: String, valid: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("Template compile error in {file}:{line}: {message}")]
    TemplateCompile {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Script syntax error in {file}:{line}: {message}")]
    ScriptSyntax {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Dependency cycle detected involving module '{module}': {path}")]
    ModuleCycle { module: String, path: String },

    #[error("Module '{module}' depends on unknown module '{dependency}'")]
    UnresolvedDependency { module: String, dependency: String },

    #[error("Module '{module}' is declared by both {first:?} and {second:?}")]
    DuplicateModule {
        module: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Bundle entry file not found: {0:?}")]
    BundleEntryMissing(PathBuf),

    #[error("Cannot resolve '{specifier}' imported from {from:?}")]
    UnresolvedImport { specifier: String, from: PathBuf },

    #[error("Network error: {message}: {source}")]
    Network {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid server response: {0}")]
    InvalidServerResponse(String),

    #[error("{0}")]
    UnsupportedServerVersion(String),

    #[error("Invalid version={0}. Should be of format <major>.<minor>")]
    InvalidVersion(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SdkError {
    /// Process exit code for this error.
    ///
    /// `9` for unknown commands and malformed version strings, `1` for
    /// everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            SdkError::CommandNotFound(_) | SdkError::InvalidVersion(_) => 9,
            _ => 1,
        }
    }

    pub(crate) fn network(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        SdkError::Network {
            message: message.into(),
            source: source.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SdkError>;
