//! Remote tree client for GitHub repositories
//!
//! This module provides the leaf dependency of the crate: single-call fetches
//! against the GitHub REST API.
//!
//! - List repositories of the authenticated user
//! - Fetch repository metadata
//! - List directory contents (root and nested)
//! - Fetch raw file content
//! - List repository webhooks
//!
//! ## Authentication
//!
//! Every call takes the caller's credential token explicitly; the token is sent
//! as `Authorization: token <token>`. Listing webhooks requires a token with
//! admin rights on the repository.

mod client;
pub mod models;

use async_trait::async_trait;

use crate::error::ClientError;

pub use client::{DEFAULT_API_URL, GithubClient};
pub use models::{
    AccessLevel, NodeKind, RepositoryMetadata, RepositorySummary, TraversalNode, Webhook,
    WebhookConfig, active_only,
};

/// Single-call operations against the remote repository service
///
/// Implementations carry no concurrency logic; the tree walker and the request
/// orchestrator decide how many calls run at once.
#[async_trait]
pub trait RemoteTreeClient: Send + Sync {
    /// Repositories visible to the token's owner
    async fn list_repositories(&self, token: &str) -> Result<Vec<RepositorySummary>, ClientError>;

    /// Metadata of one repository
    async fn get_metadata(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryMetadata, ClientError>;

    /// Entries at the root of the repository's default branch
    async fn list_root(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<TraversalNode>, ClientError>;

    /// Entries of a directory, addressed by the directory node's `url`
    async fn list_directory(
        &self,
        token: &str,
        handle: &str,
    ) -> Result<Vec<TraversalNode>, ClientError>;

    /// Text content of a file, addressed by the file node's `download_url`
    async fn fetch_blob(&self, token: &str, handle: &str) -> Result<String, ClientError>;

    /// All webhooks of a repository, active or not
    async fn list_webhooks(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Webhook>, ClientError>;
}
