use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use plugin_sdk::server::{HttpReply, VersionTransport};
use plugin_sdk::sync::{SandboxClient, SyncFuture};

/// A fake version-check transport that:
/// - records every requested URL and token
/// - answers with queued replies, the last one repeating.
#[derive(Clone, Default)]
pub struct FakeTransport {
    replies: Arc<Mutex<VecDeque<Result<HttpReply, String>>>>,
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport answering every request with `status` and `body`.
    pub fn replying(status: u16, body: &str) -> Self {
        let fake = Self::new();
        fake.push_reply(status, body);
        fake
    }

    /// Transport whose requests never get a reply.
    pub fn unreachable(message: &str) -> Self {
        let fake = Self::new();
        fake.replies.lock().unwrap().push_back(Err(message.to_string()));
        fake
    }

    pub fn push_reply(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(HttpReply {
            status,
            body: body.to_string(),
        }));
    }

    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Result<HttpReply, String> {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or_else(|| Err("no reply queued".to_string()))
        }
    }
}

impl VersionTransport for FakeTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<HttpReply>> + Send + 'a>> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), token.map(str::to_string)));
        let reply = self.next_reply();
        Box::pin(async move { reply.map_err(anyhow::Error::msg) })
    }
}

/// A fake sandbox that:
/// - records every uploaded path (relative to the plugin root) and reload
/// - fails uploads for paths registered with `fail_on`.
#[derive(Clone, Default)]
pub struct RecordingSandbox {
    uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    reloads: Arc<Mutex<usize>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, rel_path: &str) {
        self.failing.lock().unwrap().insert(rel_path.to_string());
    }

    pub fn uploaded_paths(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn uploaded(&self, rel_path: &str) -> Option<Vec<u8>> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == rel_path)
            .map(|(_, c)| c.clone())
    }

    pub fn reloads(&self) -> usize {
        *self.reloads.lock().unwrap()
    }

    pub fn clear(&self) {
        self.uploads.lock().unwrap().clear();
    }
}

impl SandboxClient for RecordingSandbox {
    fn upload<'a>(&'a self, rel_path: &'a str, contents: Vec<u8>) -> SyncFuture<'a> {
        Box::pin(async move {
            if self.failing.lock().unwrap().contains(rel_path) {
                anyhow::bail!("sandbox refused {rel_path}");
            }
            self.uploads
                .lock()
                .unwrap()
                .push((rel_path.to_string(), contents));
            Ok(())
        })
    }

    fn reload(&self) -> SyncFuture<'_> {
        Box::pin(async move {
            *self.reloads.lock().unwrap() += 1;
            Ok(())
        })
    }
}
