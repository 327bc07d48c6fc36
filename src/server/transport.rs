// src/server/transport.rs

//! HTTP seam for talking to the community server.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::Client;
use tracing::debug;

/// Status and body of a server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Authenticated GET against the server.
///
/// An `Err` means the request never produced a reply (DNS, TLS, connection
/// refused); any reply, whatever its status, is `Ok`.
pub trait VersionTransport: Send + Sync {
    fn get<'a>(
        &'a self,
        url: &'a str,
        token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<HttpReply>> + Send + 'a>>;
}

/// [`VersionTransport`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl VersionTransport for ReqwestTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<HttpReply>> + Send + 'a>> {
        Box::pin(async move {
            debug!(url = %url, "GET");
            let mut request = self.client.get(url);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            debug!(status, bytes = body.len(), "response received");
            Ok(HttpReply { status, body })
        })
    }
}
