// src/types.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// How the script/template processor picks its working set.
///
/// - `Full`: every file matched by the pattern set.
/// - `Incremental`: only the listed files, and only those that also match the
///   pattern set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMode {
    Full,
    Incremental(Vec<PathBuf>),
}

impl BuildMode {
    pub fn is_incremental(&self) -> bool {
        matches!(self, BuildMode::Incremental(_))
    }
}

/// Extension slot a packaged plugin may register against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginPoint {
    Asset,
    BadgeIcon,
    Component,
    Endpoint,
    Init,
    Layout,
    Macro,
    Quilt,
    RankIcon,
    Skin,
    SurveyIcon,
    Text,
    Avatar,
}

impl PluginPoint {
    pub const ALL: [PluginPoint; 13] = [
        PluginPoint::Asset,
        PluginPoint::BadgeIcon,
        PluginPoint::Component,
        PluginPoint::Endpoint,
        PluginPoint::Init,
        PluginPoint::Layout,
        PluginPoint::Macro,
        PluginPoint::Quilt,
        PluginPoint::RankIcon,
        PluginPoint::Skin,
        PluginPoint::SurveyIcon,
        PluginPoint::Text,
        PluginPoint::Avatar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginPoint::Asset => "asset",
            PluginPoint::BadgeIcon => "badge_icon",
            PluginPoint::Component => "component",
            PluginPoint::Endpoint => "endpoint",
            PluginPoint::Init => "init",
            PluginPoint::Layout => "layout",
            PluginPoint::Macro => "macro",
            PluginPoint::Quilt => "quilt",
            PluginPoint::RankIcon => "rank_icon",
            PluginPoint::Skin => "skin",
            PluginPoint::SurveyIcon => "survey_icon",
            PluginPoint::Text => "text",
            PluginPoint::Avatar => "avatar",
        }
    }

    /// Comma separated list of every valid name, for error messages.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PluginPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| format!("invalid plugin point: {wanted}"))
    }
}

/// Wire format of the server version-check endpoint.
///
/// Newer servers answer with JSON (`?format=json`); older ones only speak the
/// legacy XML variant of the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionProtocol {
    #[default]
    Json,
    LegacyXml,
}
