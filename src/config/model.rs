// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::PluginPoint;

/// `server.conf.json` as read from disk, before validation.
///
/// ```json
/// {
///   "serverUrl": "https://stage.example.com",
///   "pluginToken": "abc123",
///   "community": "example",
///   "pluginPoints": ["component", "text"]
/// }
/// ```
///
/// Every key is optional; missing keys take the defaults below. Keys this
/// tool does not read (`verbose`, `force`, `localServerPort`, ...) are
/// ignored, so configs written for older tooling still load.
/// `dryRun` applies when `--dry-run` is not given.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawServerConfig {
    pub server_url: Option<String>,
    pub plugin_token: Option<String>,
    pub community: Option<String>,
    pub strict_mode: bool,
    pub dry_run: bool,
    pub plugin_points: Vec<String>,
    /// Local directory mirroring the sandbox plugin; when set, sandbox sync
    /// copies files there instead of uploading them.
    pub sandbox_plugin_dir: Option<PathBuf>,
    pub plugin_reload_url: String,
}

impl Default for RawServerConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            plugin_token: None,
            community: None,
            strict_mode: false,
            dry_run: false,
            plugin_points: Vec::new(),
            sandbox_plugin_dir: None,
            plugin_reload_url: "/t5/api/plugin".to_string(),
        }
    }
}

/// Validated server configuration.
///
/// Construct via `ServerConfig::try_from(RawServerConfig)` or the loader.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_url: Option<String>,
    pub plugin_token: Option<String>,
    pub community: Option<String>,
    pub strict_mode: bool,
    pub dry_run: bool,
    pub plugin_points: Vec<PluginPoint>,
    pub sandbox_plugin_dir: Option<PathBuf>,
    pub plugin_reload_url: String,
}

impl ServerConfig {
    pub(crate) fn new_unchecked(raw: RawServerConfig, plugin_points: Vec<PluginPoint>) -> Self {
        Self {
            server_url: raw.server_url,
            plugin_token: raw.plugin_token,
            community: raw.community,
            strict_mode: raw.strict_mode,
            dry_run: raw.dry_run,
            plugin_points,
            sandbox_plugin_dir: raw.sandbox_plugin_dir,
            plugin_reload_url: raw.plugin_reload_url,
        }
    }

    /// `http` when the server URL is plain HTTP, otherwise `https`.
    pub fn plugin_upload_protocol(&self) -> &'static str {
        match &self.server_url {
            Some(url) if url.contains("http://") => "http",
            _ => "https",
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new_unchecked(RawServerConfig::default(), Vec::new())
    }
}

/// `plugin.toml` project manifest, before validation.
///
/// ```toml
/// [scripts]
/// source_root = "src"
/// module_dependencies = ["vendor/angular.js"]
/// text_properties = ["res/lang"]
/// external_modules = ["ng"]
///
/// [[bundle]]
/// name = "widget"
/// entry = "src/activecast/ActivecastMain.js"
/// output_dir = "plugin/web/html/assets/js/activecast"
/// output_name = "widget.js"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProjectConfig {
    /// Presence of `[scripts]` enables the script/template pipeline.
    #[serde(default)]
    pub scripts: Option<ScriptsSection>,

    #[serde(default)]
    pub bundle: Vec<BundleConfig>,

    #[serde(default)]
    pub layout: LayoutSection,
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsSection {
    /// Prefix stripped from source paths when laying out processed output.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Third-party scripts copied verbatim into the scripts output.
    #[serde(default)]
    pub module_dependencies: Vec<String>,

    /// Directories holding `.properties` text files.
    #[serde(default)]
    pub text_properties: Vec<PathBuf>,

    /// Dependency names that may stay unresolved (provided by the runtime).
    #[serde(default)]
    pub external_modules: Vec<String>,

    #[serde(default = "default_true")]
    pub source_maps: bool,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            module_dependencies: Vec::new(),
            text_properties: Vec::new(),
            external_modules: Vec::new(),
            source_maps: true,
        }
    }
}

fn default_source_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_true() -> bool {
    true
}

/// `[[bundle]]` entry: one single-entry-point bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleConfig {
    pub name: String,
    pub entry: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,
}

/// `[layout]` section: where the plugin tree is written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    pub plugin_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub text_dir: PathBuf,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugin"),
            scripts_dir: PathBuf::from("plugin/res/js/angularjs"),
            metadata_dir: PathBuf::from("plugin/res/js/angularjs/metadata"),
            text_dir: PathBuf::from("plugin/res/lang/feature"),
        }
    }
}

/// Validated project manifest.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    scripts: Option<ScriptsSection>,
    bundles: Vec<BundleConfig>,
    layout: LayoutSection,
}

impl ProjectConfig {
    pub(crate) fn new_unchecked(
        scripts: Option<ScriptsSection>,
        bundles: Vec<BundleConfig>,
        layout: LayoutSection,
    ) -> Self {
        Self {
            scripts,
            bundles,
            layout,
        }
    }

    /// The script pipeline settings, if `[scripts]` is present.
    pub fn scripts(&self) -> Option<&ScriptsSection> {
        self.scripts.as_ref()
    }

    pub fn scripts_enabled(&self) -> bool {
        self.scripts.is_some()
    }

    pub fn bundles(&self) -> &[BundleConfig] {
        &self.bundles
    }

    pub fn layout(&self) -> &LayoutSection {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults_apply_to_missing_keys() {
        let raw: RawServerConfig =
            serde_json::from_str(r#"{"serverUrl": "https://x", "someFutureKey": 1}"#).unwrap();

        assert_eq!(raw.server_url.as_deref(), Some("https://x"));
        assert!(!raw.dry_run);
        assert_eq!(raw.plugin_reload_url, "/t5/api/plugin");
        assert!(!raw.strict_mode);
    }

    #[test]
    fn legacy_tuning_keys_are_accepted_and_ignored() {
        let raw: RawServerConfig = serde_json::from_str(
            r#"{"dryRun": true, "verbose": true, "force": true, "localServerPort": 8000}"#,
        )
        .unwrap();
        assert!(raw.dry_run);
    }

    #[test]
    fn upload_protocol_follows_url_scheme() {
        let mut cfg = ServerConfig::default();
        assert_eq!(cfg.plugin_upload_protocol(), "https");
        cfg.server_url = Some("http://localhost:8080".into());
        assert_eq!(cfg.plugin_upload_protocol(), "http");
    }

    #[test]
    fn project_manifest_sections_are_optional() {
        let raw: RawProjectConfig = toml::from_str("").unwrap();
        assert!(raw.scripts.is_none());
        assert!(raw.bundle.is_empty());
        assert_eq!(raw.layout.plugin_dir, PathBuf::from("plugin"));

        let raw: RawProjectConfig = toml::from_str("[scripts]\n").unwrap();
        let scripts = raw.scripts.unwrap();
        assert_eq!(scripts.source_root, PathBuf::from("src"));
        assert!(scripts.source_maps);
    }
}
