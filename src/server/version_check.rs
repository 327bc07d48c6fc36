// src/server/version_check.rs

//! Server version compatibility check.
//!
//! Two wire formats are supported, selected by [`VersionProtocol`]:
//!
//! - `Json`: `GET {serverUrl}/restapi/ldntool/plugins/version?format=json`
//!   answering `{"status": "OK", "version": "23.4"}`; failures carry
//!   `{"service-response": {"message": "..."}}`.
//! - `LegacyXml`: the same endpoint without `format`, answering
//!   `<response status="success"><version>23.4</version></response>`;
//!   failures carry `<error><message>...</message></error>`.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ServerConfig;
use crate::errors::{Result, SdkError};
use crate::server::transport::{HttpReply, VersionTransport};
use crate::server::version::{ServerVersion, THEME_SUPPORT_VERSION};
use crate::types::VersionProtocol;

const VERSION_PATH: &str = "/restapi/ldntool/plugins/version";
const BAD_RESPONSE: &str = "Invalid response from server. Check your server url and version.";
const MISSING_URL: &str = "A server URL is required in your configuration.";

/// Fields shared by both reply formats.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct VersionReply {
    status: Option<String>,
    version: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "response")]
struct XmlResponse {
    #[serde(rename = "@status", default)]
    status: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    error: Option<XmlError>,
}

#[derive(Debug, Deserialize)]
struct XmlError {
    #[serde(default)]
    message: Option<String>,
}

/// Checks the configured server against a minimum supported version.
pub struct VersionChecker<'a> {
    transport: &'a dyn VersionTransport,
    protocol: VersionProtocol,
    minimum: ServerVersion,
}

impl<'a> VersionChecker<'a> {
    pub fn new(
        transport: &'a dyn VersionTransport,
        protocol: VersionProtocol,
        minimum: ServerVersion,
    ) -> Self {
        Self {
            transport,
            protocol,
            minimum,
        }
    }

    /// Version-check endpoint for `server_url`.
    pub fn endpoint(&self, server_url: &str) -> String {
        let base = server_url.trim_end_matches('/');
        match self.protocol {
            VersionProtocol::Json => format!("{base}{VERSION_PATH}?format=json"),
            VersionProtocol::LegacyXml => format!("{base}{VERSION_PATH}"),
        }
    }

    /// Run the check for `server`, returning the version the server reports.
    pub async fn check(&self, server: &ServerConfig) -> Result<ServerVersion> {
        let Some(server_url) = server.server_url.as_deref() else {
            return Err(SdkError::Config(MISSING_URL.to_string()));
        };
        self.validate(server_url, server.plugin_token.as_deref())
            .await
    }

    /// Query `server_url` and compare its version with the minimum.
    pub async fn validate(&self, server_url: &str, token: Option<&str>) -> Result<ServerVersion> {
        let url = self.endpoint(server_url);
        debug!(url = %url, protocol = ?self.protocol, "making version check call");

        let reply = self
            .transport
            .get(&url, token)
            .await
            .map_err(|e| SdkError::network(format!("version check call to {url} failed"), e))?;
        debug!(status = reply.status, body = %reply.body, "version check response");

        let version = self.read_version(&reply)?;
        self.compare(version)?;
        Ok(version)
    }

    fn read_version(&self, reply: &HttpReply) -> Result<ServerVersion> {
        if reply.status > 201 {
            error!(status = reply.status, "version check call returned an error status");
        }

        let parsed = if reply.body.trim().is_empty() {
            None
        } else {
            match self.protocol {
                VersionProtocol::Json => parse_json(&reply.body),
                VersionProtocol::LegacyXml => parse_xml(&reply.body),
            }
        };
        let Some(parsed) = parsed else {
            return Err(invalid_response(BAD_RESPONSE));
        };

        let Some(version) = parsed.version.as_deref() else {
            return Err(invalid_response(parsed.message.as_deref().unwrap_or(BAD_RESPONSE)));
        };

        if reply.status > 201 || !status_ok(parsed.status.as_deref()) {
            return Err(invalid_response(BAD_RESPONSE));
        }

        ServerVersion::from_server_response(version)
    }

    fn compare(&self, version: ServerVersion) -> Result<()> {
        if version < self.minimum {
            let min = self.minimum;
            let message = format!(
                "Supported minimum version on server is {min}, but the server reports version {version}. \
                 Either contact support to get your stage server upgraded to version {min} \
                 or else downgrade your version of the sdk (currently {}).",
                env!("CARGO_PKG_VERSION")
            );
            error!(server = %version, minimum = %min, "server version not supported");
            return Err(SdkError::UnsupportedServerVersion(message));
        }

        if version < THEME_SUPPORT_VERSION {
            warn!(
                "This version of community doesn't support rendering custom theme skins! \
                 Please upgrade your community to version {THEME_SUPPORT_VERSION} or newer to get this feature."
            );
        }
        Ok(())
    }
}

fn invalid_response(message: &str) -> SdkError {
    error!("{message}");
    SdkError::InvalidServerResponse(message.to_string())
}

fn status_ok(status: Option<&str>) -> bool {
    matches!(status, Some(s) if s.eq_ignore_ascii_case("ok") || s.eq_ignore_ascii_case("success"))
}

fn parse_json(body: &str) -> Option<VersionReply> {
    let value: Value = serde_json::from_str(body).ok()?;
    let text = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    Some(VersionReply {
        status: value.get("status").and_then(text),
        version: value.get("version").and_then(text),
        message: value
            .get("service-response")
            .and_then(|r| r.get("message"))
            .and_then(text),
    })
}

fn parse_xml(body: &str) -> Option<VersionReply> {
    let response: XmlResponse = quick_xml::de::from_str(body).ok()?;
    Some(VersionReply {
        status: response.status,
        version: response.version.filter(|v| !v.trim().is_empty()),
        message: response.error.and_then(|e| e.message),
    })
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use super::*;

    struct Canned(std::result::Result<HttpReply, String>);

    impl VersionTransport for Canned {
        fn get<'a>(
            &'a self,
            _url: &'a str,
            _token: Option<&'a str>,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<HttpReply>> + Send + 'a>> {
            let reply = self.0.clone().map_err(anyhow::Error::msg);
            Box::pin(async move { reply })
        }
    }

    fn reply(status: u16, body: &str) -> Canned {
        Canned(Ok(HttpReply {
            status,
            body: body.to_string(),
        }))
    }

    async fn run(transport: &Canned, protocol: VersionProtocol) -> Result<ServerVersion> {
        VersionChecker::new(transport, protocol, ServerVersion::new(22, 7))
            .validate("https://stage.example.com/", Some("t"))
            .await
    }

    #[test]
    fn endpoints_per_protocol() {
        let t = reply(200, "");
        let json = VersionChecker::new(&t, VersionProtocol::Json, ServerVersion::new(1, 0));
        let xml = VersionChecker::new(&t, VersionProtocol::LegacyXml, ServerVersion::new(1, 0));

        assert_eq!(
            json.endpoint("https://x/"),
            "https://x/restapi/ldntool/plugins/version?format=json"
        );
        assert_eq!(xml.endpoint("https://x"), "https://x/restapi/ldntool/plugins/version");
    }

    #[tokio::test]
    async fn numeric_json_version_is_accepted() {
        let t = reply(200, r#"{"status":"OK","version":23.4}"#);
        assert_eq!(run(&t, VersionProtocol::Json).await.unwrap(), ServerVersion::new(23, 4));
    }

    #[tokio::test]
    async fn service_response_message_is_surfaced() {
        let t = reply(
            401,
            r#"{"service-response":{"status":"error","message":"Bad token"}}"#,
        );
        let err = run(&t, VersionProtocol::Json).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid server response: Bad token");
    }

    #[tokio::test]
    async fn unparsable_and_empty_bodies_are_invalid_responses() {
        for body in ["", "<html>oops</html>"] {
            let err = run(&reply(200, body), VersionProtocol::Json).await.unwrap_err();
            assert!(matches!(err, SdkError::InvalidServerResponse(ref m) if m == BAD_RESPONSE));
        }
    }

    #[tokio::test]
    async fn status_must_be_ok() {
        let t = reply(200, r#"{"status":"PENDING","version":"23.4"}"#);
        assert!(matches!(
            run(&t, VersionProtocol::Json).await.unwrap_err(),
            SdkError::InvalidServerResponse(_)
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let t = Canned(Err("connection refused".into()));
        let err = run(&t, VersionProtocol::Json).await.unwrap_err();
        assert!(matches!(err, SdkError::Network { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn legacy_xml_reply_is_parsed() {
        let t = reply(
            200,
            r#"<response status="success"><version>23.4</version></response>"#,
        );
        assert_eq!(
            run(&t, VersionProtocol::LegacyXml).await.unwrap(),
            ServerVersion::new(23, 4)
        );

        let t = reply(
            200,
            r#"<response status="error"><error code="302"><message>Permission denied</message></error></response>"#,
        );
        let err = run(&t, VersionProtocol::LegacyXml).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid server response: Permission denied");
    }
}
