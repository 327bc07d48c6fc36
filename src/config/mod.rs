// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the data models (`model.rs`): the JSON server configuration and
//!   the TOML project manifest.
//! - Load them from disk (`loader.rs`).
//! - Validate them (`validate.rs`): plugin point names, URLs, bundle entries.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    load_project_config, load_server_config, DEFAULT_PROJECT_CONFIG, DEFAULT_SERVER_CONFIG,
};
pub use model::{
    BundleConfig, LayoutSection, ProjectConfig, RawProjectConfig, RawServerConfig, ScriptsSection,
    ServerConfig,
};
