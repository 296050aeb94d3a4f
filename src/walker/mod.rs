//! Concurrent walks over a remote repository tree
//!
//! Two traversals are provided:
//!
//! - [`TreeWalker::count_files`] counts every file below a set of nodes. Sibling
//!   directories are listed concurrently and summed once all of them finished.
//!   The first failing listing aborts the whole count.
//! - [`TreeWalker::find_first`] races sibling directories for the first file
//!   matching a predicate and cancels the losers (see [`search`]).
//!
//! Fan-out is unbounded unless a fetch limit is configured, in which case at
//! most that many directory listings are in flight per walker.

pub mod search;

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::error::ClientError;
use crate::github::{NodeKind, RemoteTreeClient, TraversalNode};

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Walks the tree of one repository on behalf of one caller token
#[derive(Clone)]
pub struct TreeWalker {
    client: Arc<dyn RemoteTreeClient>,
    token: Arc<str>,
    fetch_limit: Option<Arc<Semaphore>>,
}

impl TreeWalker {
    pub fn new(client: Arc<dyn RemoteTreeClient>, token: impl Into<Arc<str>>) -> Self {
        Self {
            client,
            token: token.into(),
            fetch_limit: None,
        }
    }

    /// Bounds the number of directory listings in flight at once
    pub fn with_fetch_limit(mut self, limit: NonZeroUsize) -> Self {
        self.fetch_limit = Some(Arc::new(Semaphore::new(limit.get())));
        self
    }

    /// Counts every file at or below `nodes`
    pub async fn count_files(&self, nodes: Vec<TraversalNode>) -> Result<u64, ClientError> {
        self.clone().count_level(nodes).await
    }

    fn count_level(self, nodes: Vec<TraversalNode>) -> BoxFuture<'static, Result<u64, ClientError>> {
        Box::pin(async move {
            let (files, dirs) = partition(nodes);
            let mut count = files.len() as u64;

            if dirs.is_empty() {
                return Ok(count);
            }

            let mut branches = JoinSet::new();
            for dir in dirs {
                let walker = self.clone();
                branches.spawn(async move {
                    let contents = walker.list_directory(&dir).await?;
                    walker.count_level(contents).await
                });
            }

            while let Some(joined) = branches.join_next().await {
                match joined {
                    Ok(Ok(branch_count)) => count += branch_count,
                    Ok(Err(e)) => {
                        tracing::debug!("Aborting file count: {}", e);
                        branches.abort_all();
                        return Err(e);
                    }
                    Err(join_error) => resume_panic(join_error),
                }
            }

            Ok(count)
        })
    }

    /// Lists a directory node, honouring the fetch limit
    async fn list_directory(&self, dir: &TraversalNode) -> Result<Vec<TraversalNode>, ClientError> {
        let _permit = match &self.fetch_limit {
            // The semaphore is never closed; an error would only mean "unbounded"
            Some(limit) => limit.acquire().await.ok(),
            None => None,
        };
        tracing::debug!("Listing directory {}", display_path(dir));
        self.client.list_directory(&self.token, &dir.url).await
    }
}

impl std::fmt::Debug for TreeWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalker")
            .field("fetch_limit", &self.fetch_limit.as_ref().map(|s| s.available_permits()))
            .finish_non_exhaustive()
    }
}

/// Splits a listing into files and directories, dropping everything else
fn partition(nodes: Vec<TraversalNode>) -> (Vec<TraversalNode>, Vec<TraversalNode>) {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for node in nodes {
        match node.kind {
            NodeKind::File => files.push(node),
            NodeKind::Dir => dirs.push(node),
            NodeKind::Other => {}
        }
    }
    (files, dirs)
}

fn display_path(node: &TraversalNode) -> &str {
    if node.path.is_empty() {
        &node.name
    } else {
        &node.path
    }
}

/// Re-raises a branch panic in the joining task
///
/// Branches are only aborted after their parent stopped joining, so a
/// cancelled join error is never observed here in practice.
fn resume_panic(join_error: JoinError) {
    if join_error.is_panic() {
        std::panic::resume_unwind(join_error.into_panic());
    }
    tracing::debug!("Walk branch was cancelled: {}", join_error);
}
