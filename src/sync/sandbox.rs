// src/sync/sandbox.rs

//! Sandbox clients.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use reqwest::Client;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::sync::{SandboxClient, SyncFuture};

/// Sandbox mirrored in a local directory (`sandboxPluginDir`).
#[derive(Debug, Clone)]
pub struct LocalDirSandbox {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl LocalDirSandbox {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }
}

impl SandboxClient for LocalDirSandbox {
    fn upload<'a>(&'a self, rel_path: &'a str, contents: Vec<u8>) -> SyncFuture<'a> {
        Box::pin(async move {
            let target = self.dir.join(rel_path);
            self.fs.write_atomic(&target, &contents)
        })
    }

    fn reload(&self) -> SyncFuture<'_> {
        Box::pin(async move {
            info!(dir = ?self.dir, "sandbox directory refreshed");
            Ok(())
        })
    }
}

/// Sandbox on the community server.
///
/// Files go to `PUT {serverUrl}{pluginReloadUrl}/{path}`, a reload is
/// `POST {serverUrl}{pluginReloadUrl}`; both carry the plugin token.
#[derive(Debug, Clone)]
pub struct HttpSandbox {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSandbox {
    pub fn new(server_url: &str, reload_path: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: format!(
                "{}/{}",
                server_url.trim_end_matches('/'),
                reload_path.trim_matches('/')
            ),
            token,
        }
    }

    pub fn file_url(&self, rel_path: &str) -> String {
        format!("{}/{}", self.base_url, rel_path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl SandboxClient for HttpSandbox {
    fn upload<'a>(&'a self, rel_path: &'a str, contents: Vec<u8>) -> SyncFuture<'a> {
        Box::pin(async move {
            let url = self.file_url(rel_path);
            debug!(url = %url, bytes = contents.len(), "PUT");
            let response = self
                .authorize(self.client.put(&url))
                .body(contents)
                .send()
                .await
                .with_context(|| format!("uploading {rel_path}"))?;
            if !response.status().is_success() {
                bail!("sandbox rejected {rel_path}: {}", response.status());
            }
            Ok(())
        })
    }

    fn reload(&self) -> SyncFuture<'_> {
        Box::pin(async move {
            let response = self
                .authorize(self.client.post(&self.base_url))
                .send()
                .await
                .context("requesting sandbox reload")?;
            if !response.status().is_success() {
                bail!("sandbox reload failed: {}", response.status());
            }
            info!("sandbox reloaded");
            Ok(())
        })
    }
}
