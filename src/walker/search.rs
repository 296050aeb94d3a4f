//! First-match search with cancellation
//!
//! Files of a level are checked in listing order before any subdirectory is
//! entered. Subdirectories are then raced; whichever branch reports a match
//! first wins, the shared [`CancellationToken`] is cancelled and the remaining
//! branches are aborted. Branches check the token before every listing and
//! drop listings that arrive after cancellation.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{BoxFuture, TreeWalker, display_path, resume_panic};
use crate::error::ClientError;
use crate::github::{NodeKind, TraversalNode};

type Predicate = Arc<dyn Fn(&TraversalNode) -> bool + Send + Sync>;

impl TreeWalker {
    /// Finds a file matching `predicate` at or below `nodes`
    ///
    /// `Ok(None)` means every node was visited without a match. `Err` is only
    /// returned when nothing matched and at least one listing failed.
    pub async fn find_first<P>(
        &self,
        nodes: Vec<TraversalNode>,
        predicate: P,
    ) -> Result<Option<TraversalNode>, ClientError>
    where
        P: Fn(&TraversalNode) -> bool + Send + Sync + 'static,
    {
        self.find_first_with_cancellation(nodes, predicate, CancellationToken::new())
            .await
    }

    /// Like [`TreeWalker::find_first`] but driven by a caller-owned token
    ///
    /// The token is cancelled when a match is found; cancelling it from the
    /// outside stops the search, which then reports `Ok(None)`.
    pub async fn find_first_with_cancellation<P>(
        &self,
        nodes: Vec<TraversalNode>,
        predicate: P,
        cancel: CancellationToken,
    ) -> Result<Option<TraversalNode>, ClientError>
    where
        P: Fn(&TraversalNode) -> bool + Send + Sync + 'static,
    {
        let search = Search {
            walker: self.clone(),
            predicate: Arc::new(predicate),
            cancel,
        };
        search.search_level(nodes).await
    }

    /// Finds a file whose name ends with `suffix`
    pub async fn find_by_suffix(
        &self,
        nodes: Vec<TraversalNode>,
        suffix: &str,
    ) -> Result<Option<TraversalNode>, ClientError> {
        let suffix = suffix.to_string();
        self.find_first(nodes, move |node| node.name.ends_with(&suffix))
            .await
    }
}

#[derive(Clone)]
struct Search {
    walker: TreeWalker,
    predicate: Predicate,
    cancel: CancellationToken,
}

impl Search {
    fn search_level(
        self,
        nodes: Vec<TraversalNode>,
    ) -> BoxFuture<'static, Result<Option<TraversalNode>, ClientError>> {
        Box::pin(async move {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            let mut dirs = Vec::new();
            for node in nodes {
                match node.kind {
                    NodeKind::File if (self.predicate)(&node) => {
                        tracing::debug!("Search matched {}", display_path(&node));
                        self.cancel.cancel();
                        return Ok(Some(node));
                    }
                    NodeKind::File | NodeKind::Other => {}
                    NodeKind::Dir => dirs.push(node),
                }
            }

            if dirs.is_empty() {
                return Ok(None);
            }

            let mut branches = JoinSet::new();
            for dir in dirs {
                let search = self.clone();
                branches.spawn(search.search_branch(dir));
            }

            let mut failure = None;
            while let Some(joined) = branches.join_next().await {
                match joined {
                    Ok(Ok(Some(found))) => {
                        self.cancel.cancel();
                        branches.abort_all();
                        return Ok(Some(found));
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(e)) => {
                        tracing::debug!("Search branch failed: {}", e);
                        failure.get_or_insert(e);
                    }
                    Err(join_error) => resume_panic(join_error),
                }
            }

            match failure {
                Some(e) if !self.cancel.is_cancelled() => Err(e),
                _ => Ok(None),
            }
        })
    }

    async fn search_branch(self, dir: TraversalNode) -> Result<Option<TraversalNode>, ClientError> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let listing = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!("Search branch {} cancelled mid-fetch", display_path(&dir));
                return Ok(None);
            }
            listing = self.walker.list_directory(&dir) => listing?,
        };

        if self.cancel.is_cancelled() {
            tracing::debug!("Discarding listing of {} after cancellation", display_path(&dir));
            return Ok(None);
        }

        self.search_level(listing).await
    }
}
