// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ProjectConfig, RawProjectConfig, RawServerConfig, ServerConfig};
use crate::errors::{Result, SdkError};

/// Default server configuration file name.
pub const DEFAULT_SERVER_CONFIG: &str = "server.conf.json";

/// Default project manifest file name.
pub const DEFAULT_PROJECT_CONFIG: &str = "plugin.toml";

/// Template users copy to create their server configuration.
pub const SERVER_CONFIG_TEMPLATE: &str = "template.server.conf.json";

/// Read `server.conf.json` without validation.
///
/// A missing or unreadable file is a configuration error that points the
/// user at the template file.
pub fn load_server_raw(path: impl AsRef<Path>) -> Result<RawServerConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|_| missing_server_config(path))?;
    let raw: RawServerConfig = serde_json::from_str(&contents)?;
    Ok(raw)
}

/// Load and validate the server configuration.
pub fn load_server_config(path: impl AsRef<Path>) -> Result<ServerConfig> {
    let raw = load_server_raw(&path)?;
    ServerConfig::try_from(raw)
}

/// Load the project manifest. An absent manifest yields the defaults
/// (scripts pipeline disabled, no bundles).
pub fn load_project_config(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(?path, "no project manifest; using defaults");
        return ProjectConfig::try_from(RawProjectConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    let raw: RawProjectConfig = toml::from_str(&contents)?;
    ProjectConfig::try_from(raw)
}

fn missing_server_config(path: &Path) -> SdkError {
    let shown: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    SdkError::Config(format!(
        "Error reading server.conf.json at [{}]. Please use {} to create server.conf.json.",
        shown.display(),
        SERVER_CONFIG_TEMPLATE
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_server_config_points_at_template() {
        let err = load_server_config("/definitely/not/here/server.conf.json").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/definitely/not/here/server.conf.json"));
        assert!(msg.contains("template.server.conf.json"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn loads_json_server_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"serverUrl": "https://stage.example.com", "pluginToken": "t", "pluginPoints": ["text"]}}"#
        )
        .unwrap();

        let cfg = load_server_config(file.path()).unwrap();
        assert_eq!(cfg.server_url.as_deref(), Some("https://stage.example.com"));
        assert_eq!(cfg.plugin_token.as_deref(), Some("t"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(load_server_config(file.path()), Err(SdkError::Json(_))));
    }

    #[test]
    fn absent_manifest_disables_scripts() {
        let cfg = load_project_config("/no/such/plugin.toml").unwrap();
        assert!(!cfg.scripts_enabled());
    }
}
