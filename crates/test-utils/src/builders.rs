use std::path::PathBuf;

use plugin_sdk::config::{
    BundleConfig, LayoutSection, ProjectConfig, RawProjectConfig, RawServerConfig,
    ScriptsSection, ServerConfig,
};

/// Builder for `ServerConfig` to simplify test setup.
pub struct ServerConfigBuilder {
    raw: RawServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawServerConfig::default(),
        }
    }

    pub fn server_url(mut self, url: &str) -> Self {
        self.raw.server_url = Some(url.to_string());
        self
    }

    pub fn plugin_token(mut self, token: &str) -> Self {
        self.raw.plugin_token = Some(token.to_string());
        self
    }

    pub fn plugin_point(mut self, name: &str) -> Self {
        self.raw.plugin_points.push(name.to_string());
        self
    }

    pub fn strict_mode(mut self, val: bool) -> Self {
        self.raw.strict_mode = val;
        self
    }

    pub fn sandbox_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.sandbox_plugin_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig::try_from(self.raw).expect("Failed to build valid server config from builder")
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProjectConfig`.
///
/// `with_scripts()` enables the script pipeline with default settings; the
/// other script setters enable it implicitly.
pub struct ProjectConfigBuilder {
    raw: RawProjectConfig,
}

impl ProjectConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawProjectConfig::default(),
        }
    }

    fn scripts(&mut self) -> &mut ScriptsSection {
        self.raw.scripts.get_or_insert_with(ScriptsSection::default)
    }

    pub fn with_scripts(mut self) -> Self {
        self.scripts();
        self
    }

    pub fn source_maps(mut self, val: bool) -> Self {
        self.scripts().source_maps = val;
        self
    }

    pub fn module_dependency(mut self, path: &str) -> Self {
        self.scripts().module_dependencies.push(path.to_string());
        self
    }

    pub fn text_properties(mut self, dir: &str) -> Self {
        self.scripts().text_properties.push(PathBuf::from(dir));
        self
    }

    pub fn external_module(mut self, name: &str) -> Self {
        self.scripts().external_modules.push(name.to_string());
        self
    }

    pub fn bundle(mut self, name: &str, entry: &str, output_dir: &str, output_name: &str) -> Self {
        self.raw.bundle.push(BundleConfig {
            name: name.to_string(),
            entry: PathBuf::from(entry),
            output_dir: PathBuf::from(output_dir),
            output_name: output_name.to_string(),
        });
        self
    }

    pub fn layout(mut self, layout: LayoutSection) -> Self {
        self.raw.layout = layout;
        self
    }

    pub fn build(self) -> ProjectConfig {
        ProjectConfig::try_from(self.raw).expect("Failed to build valid project config from builder")
    }
}

impl Default for ProjectConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
