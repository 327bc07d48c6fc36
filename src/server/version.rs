// src/server/version.rs

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::{Result, SdkError};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d{0,2})").expect("valid version regex"));

/// Server version at which custom theme skins are rendered.
pub const THEME_SUPPORT_VERSION: ServerVersion = ServerVersion { major: 22, minor: 7 };

/// `major.minor` server version. Ordering compares major, then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Locate a `major.minor` pair in `text`.
    ///
    /// The minor part is `None` when the dot has no digits after it (`"23."`).
    fn captures(text: &str) -> Option<(u32, Option<u32>)> {
        let caps = VERSION_RE.captures(text)?;
        let major = caps[1].parse().ok()?;
        let minor = match &caps[2] {
            "" => None,
            digits => Some(digits.parse().ok()?),
        };
        Some((major, minor))
    }

    /// Parse a user-supplied version such as `--min-version 22.7`.
    pub fn parse(text: &str) -> Result<Self> {
        match Self::captures(text) {
            Some((major, Some(minor))) => Ok(Self { major, minor }),
            _ => Err(SdkError::InvalidVersion(text.to_string())),
        }
    }

    /// Parse the version reported by a server.
    pub fn from_server_response(text: &str) -> Result<Self> {
        match Self::captures(text) {
            Some((major, Some(minor))) => Ok(Self { major, minor }),
            _ => Err(SdkError::InvalidServerResponse(format!(
                "Invalid version check response {text}"
            ))),
        }
    }

    /// The minimum server version this release supports.
    pub fn bundled_minimum() -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Bundled {
            supported_version_major: u32,
            supported_version_minor: u32,
        }

        let bundled: Bundled = serde_json::from_str(include_str!("server-version.json"))?;
        Ok(Self::new(
            bundled.supported_version_major,
            bundled.supported_version_minor,
        ))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ServerVersion {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_major_minor() {
        assert_eq!(ServerVersion::parse("22.7").unwrap(), ServerVersion::new(22, 7));
        assert_eq!(ServerVersion::parse("23.10.1").unwrap(), ServerVersion::new(23, 10));
        assert_eq!(
            ServerVersion::from_server_response("v20.1-beta").unwrap(),
            ServerVersion::new(20, 1)
        );
    }

    #[test]
    fn malformed_user_version_is_exit_code_nine() {
        let err = ServerVersion::parse("latest").unwrap_err();
        assert_eq!(err.exit_code(), 9);
        assert_eq!(
            err.to_string(),
            "Invalid version=latest. Should be of format <major>.<minor>"
        );
        assert!(ServerVersion::parse("23.").is_err());
    }

    #[test]
    fn malformed_server_version_is_invalid_response() {
        let err = ServerVersion::from_server_response("23.").unwrap_err();
        assert!(matches!(err, SdkError::InvalidServerResponse(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn orders_by_major_then_minor() {
        assert!(ServerVersion::new(22, 7) < ServerVersion::new(23, 4));
        assert!(ServerVersion::new(22, 10) > ServerVersion::new(22, 7));
        assert!(ServerVersion::new(20, 1) < ServerVersion::new(22, 7));
    }

    #[test]
    fn bundled_minimum_is_readable() {
        assert_eq!(ServerVersion::bundled_minimum().unwrap(), ServerVersion::new(22, 7));
    }
}
