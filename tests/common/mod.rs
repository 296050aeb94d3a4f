//! In-memory remote tree used by the integration tests
//!
//! Trees are described as slash-separated paths; a trailing slash marks an
//! (possibly empty) directory. Directory handles are `fake://dir/<path>` and
//! file handles `fake://blob/<path>`.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use gitscan_mcp::error::ClientError;
use gitscan_mcp::github::{
    AccessLevel, NodeKind, RemoteTreeClient, RepositoryMetadata, RepositorySummary, TraversalNode,
    Webhook, WebhookConfig,
};

pub const ROOT: &str = "";

pub fn dir_handle(path: &str) -> String {
    format!("fake://dir/{}", path)
}

pub fn blob_handle(path: &str) -> String {
    format!("fake://blob/{}", path)
}

fn not_found(url: &str) -> ClientError {
    ClientError::Status {
        url: url.to_string(),
        status: 404,
        body: "Not Found".to_string(),
    }
}

fn server_error(url: &str) -> ClientError {
    ClientError::Status {
        url: url.to_string(),
        status: 500,
        body: "boom".to_string(),
    }
}

pub fn webhook(id: u64, active: bool) -> Webhook {
    Webhook {
        id,
        name: Some("web".to_string()),
        active,
        config: WebhookConfig {
            url: Some(format!("https://example.com/hooks/{}", id)),
            content_type: Some("json".to_string()),
            insecure_ssl: Some("0".to_string()),
        },
        updated_at: None,
        created_at: None,
        url: None,
    }
}

#[derive(Default)]
pub struct FakeRemote {
    /// Directory path -> entries in listing order
    dirs: HashMap<String, Vec<TraversalNode>>,
    blobs: HashMap<String, String>,
    failing_dirs: HashSet<String>,
    delays: HashMap<String, Duration>,
    held_dirs: HashSet<String>,
    hold: Option<Arc<Semaphore>>,

    pub metadata: Option<RepositoryMetadata>,
    pub webhooks: Option<Vec<Webhook>>,
    pub repositories: Option<Vec<RepositorySummary>>,

    pub listing_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Directory paths whose listing returned, in completion order
    completed: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn from_paths(paths: &[&str]) -> Self {
        let mut remote = FakeRemote {
            metadata: Some(RepositoryMetadata {
                name: "repo".to_string(),
                size: 42,
                owner: "octocat".to_string(),
                access_level: AccessLevel::Public,
            }),
            webhooks: Some(Vec::new()),
            repositories: Some(Vec::new()),
            ..FakeRemote::default()
        };
        remote.dirs.insert(ROOT.to_string(), Vec::new());

        for path in paths {
            let (path, is_dir) = match path.strip_suffix('/') {
                Some(dir) => (dir, true),
                None => (*path, false),
            };
            remote.ensure_parents(path);
            if is_dir {
                remote.ensure_dir(path);
            } else {
                remote.add_entry(path, NodeKind::File);
                remote
                    .blobs
                    .insert(path.to_string(), format!("content of {}", path));
            }
        }
        remote
    }

    fn parent_of(path: &str) -> (&str, &str) {
        match path.rsplit_once('/') {
            Some((parent, name)) => (parent, name),
            None => (ROOT, path),
        }
    }

    fn ensure_parents(&mut self, path: &str) {
        let (parent, _) = Self::parent_of(path);
        if parent != ROOT {
            self.ensure_parents(parent);
            self.ensure_dir(parent);
        }
    }

    fn ensure_dir(&mut self, path: &str) {
        if self.dirs.contains_key(path) {
            return;
        }
        self.dirs.insert(path.to_string(), Vec::new());
        self.add_entry(path, NodeKind::Dir);
    }

    fn add_entry(&mut self, path: &str, kind: NodeKind) {
        let (parent, name) = Self::parent_of(path);
        let node = TraversalNode {
            name: name.to_string(),
            path: path.to_string(),
            kind,
            url: dir_handle(path),
            download_url: match kind {
                NodeKind::File => Some(blob_handle(path)),
                _ => None,
            },
        };
        let entries = self.dirs.entry(parent.to_string()).or_default();
        if !entries.iter().any(|existing| existing.path == node.path) {
            entries.push(node);
        }
    }

    /// Adds a submodule-like entry that neither walk should touch
    pub fn with_other(mut self, path: &str) -> Self {
        self.ensure_parents(path);
        self.add_entry(path, NodeKind::Other);
        self
    }

    pub fn failing(mut self, dir: &str) -> Self {
        self.failing_dirs.insert(dir.to_string());
        self
    }

    pub fn delayed(mut self, dir: &str, delay: Duration) -> Self {
        self.delays.insert(dir.to_string(), delay);
        self
    }

    /// Listings of `dir` block until permits are added to the returned semaphore
    pub fn held(mut self, dir: &str) -> (Self, Arc<Semaphore>) {
        let hold = self
            .hold
            .get_or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone();
        self.held_dirs.insert(dir.to_string());
        (self, hold)
    }

    pub fn without_metadata(mut self) -> Self {
        self.metadata = None;
        self
    }

    pub fn with_webhooks(mut self, webhooks: Option<Vec<Webhook>>) -> Self {
        self.webhooks = webhooks;
        self
    }

    pub fn root(&self) -> Vec<TraversalNode> {
        self.dirs.get(ROOT).cloned().unwrap_or_default()
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    async fn list(&self, path: &str) -> Result<Vec<TraversalNode>, ClientError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if let Some(delay) = self.delays.get(path) {
            tokio::time::sleep(*delay).await;
        }
        if self.held_dirs.contains(path) {
            if let Some(hold) = &self.hold {
                hold.acquire().await.unwrap().forget();
            }
        }

        let result = if self.failing_dirs.contains(path) {
            Err(server_error(&dir_handle(path)))
        } else {
            self.dirs
                .get(path)
                .cloned()
                .ok_or_else(|| not_found(&dir_handle(path)))
        };
        self.completed.lock().unwrap().push(path.to_string());
        result
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteTreeClient for FakeRemote {
    async fn list_repositories(&self, _token: &str) -> Result<Vec<RepositorySummary>, ClientError> {
        self.repositories
            .clone()
            .ok_or_else(|| server_error("fake://user/repos"))
    }

    async fn get_metadata(
        &self,
        _token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryMetadata, ClientError> {
        self.metadata
            .clone()
            .ok_or_else(|| not_found(&format!("fake://repos/{}/{}", owner, repo)))
    }

    async fn list_root(
        &self,
        _token: &str,
        _owner: &str,
        _repo: &str,
    ) -> Result<Vec<TraversalNode>, ClientError> {
        self.list(ROOT).await
    }

    async fn list_directory(
        &self,
        _token: &str,
        handle: &str,
    ) -> Result<Vec<TraversalNode>, ClientError> {
        let path = handle
            .strip_prefix("fake://dir/")
            .ok_or_else(|| ClientError::InvalidUrl(handle.to_string()))?;
        self.list(path).await
    }

    async fn fetch_blob(&self, _token: &str, handle: &str) -> Result<String, ClientError> {
        let path = handle
            .strip_prefix("fake://blob/")
            .ok_or_else(|| ClientError::InvalidUrl(handle.to_string()))?;
        self.blobs.get(path).cloned().ok_or_else(|| not_found(handle))
    }

    async fn list_webhooks(
        &self,
        _token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Webhook>, ClientError> {
        self.webhooks
            .clone()
            .ok_or_else(|| server_error(&format!("fake://repos/{}/{}/hooks", owner, repo)))
    }
}
