// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ProjectConfig, RawProjectConfig, RawServerConfig, ServerConfig};
use crate::errors::{Result, SdkError};
use crate::types::PluginPoint;

impl TryFrom<RawServerConfig> for ServerConfig {
    type Error = SdkError;

    fn try_from(raw: RawServerConfig) -> std::result::Result<Self, Self::Error> {
        let points = validate_plugin_points(&raw.plugin_points)?;
        validate_server_url(&raw)?;
        Ok(ServerConfig::new_unchecked(raw, points))
    }
}

impl TryFrom<RawProjectConfig> for ProjectConfig {
    type Error = SdkError;

    fn try_from(raw: RawProjectConfig) -> std::result::Result<Self, Self::Error> {
        validate_bundles(&raw)?;
        Ok(ProjectConfig::new_unchecked(raw.scripts, raw.bundle, raw.layout))
    }
}

fn validate_plugin_points(names: &[String]) -> Result<Vec<PluginPoint>> {
    let mut points = Vec::with_capacity(names.len());
    for name in names {
        let point = name
            .parse::<PluginPoint>()
            .map_err(|_| SdkError::InvalidPluginPoint {
                name: name.clone(),
                valid: PluginPoint::valid_names(),
            })?;
        if !points.contains(&point) {
            points.push(point);
        }
    }
    Ok(points)
}

fn validate_server_url(raw: &RawServerConfig) -> Result<()> {
    if let Some(url) = &raw.server_url {
        if url.trim().is_empty() {
            return Err(SdkError::Config(
                "serverUrl must not be empty when present".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SdkError::Config(format!(
                "serverUrl must start with http:// or https:// (got '{url}')"
            )));
        }
    }
    Ok(())
}

fn validate_bundles(raw: &RawProjectConfig) -> Result<()> {
    let mut names = HashSet::new();
    for bundle in &raw.bundle {
        if bundle.name.trim().is_empty() {
            return Err(SdkError::Config(
                "[[bundle]] entries need a non-empty `name`".to_string(),
            ));
        }
        if !names.insert(bundle.name.as_str()) {
            return Err(SdkError::Config(format!(
                "bundle '{}' is declared more than once",
                bundle.name
            )));
        }
        if bundle.output_name.trim().is_empty() || bundle.output_name.contains('/') {
            return Err(SdkError::Config(format!(
                "bundle '{}' needs a plain file name in `output_name`",
                bundle.name
            )));
        }
    }
    Ok(())
}
