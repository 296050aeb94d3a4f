//! Domain models returned by the remote tree client
//!
//! The structs prefixed with `GitHub` mirror GitHub's REST payloads and are kept
//! private to the client; everything else is the vendor-agnostic shape the rest
//! of the crate works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::Display;

/// A repository as listed for the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// Repository name (without owner)
    pub name: String,

    /// Size of the repository in kilobytes
    pub size: u64,

    /// Login of the owning user or organisation
    pub owner: String,
}

/// Visibility of a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Private,
}

impl AccessLevel {
    pub fn from_private_flag(private: bool) -> Self {
        if private {
            AccessLevel::Private
        } else {
            AccessLevel::Public
        }
    }
}

/// Required metadata of a single repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub name: String,
    pub size: u64,
    pub owner: String,
    pub access_level: AccessLevel,
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
    /// Symlinks and submodules; neither walk descends into or counts them
    #[serde(other)]
    Other,
}

/// One entry of a remote directory listing
///
/// `url` lists the entry's contents when it is a directory; `download_url`
/// retrieves the raw content when it is a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalNode {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub url: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Delivery configuration of a webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub insecure_ssl: Option<String>,
}

/// A repository webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub active: bool,
    pub config: WebhookConfig,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Keeps only the webhooks that are currently active
pub fn active_only(webhooks: Vec<Webhook>) -> Vec<Webhook> {
    webhooks.into_iter().filter(|hook| hook.active).collect()
}

// GitHub sends `insecure_ssl` as "0" for some hooks and 0 for others.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// GitHub-specific repository payload
#[derive(Debug, Deserialize)]
pub(super) struct GitHubRepository {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub private: bool,
    pub owner: GitHubOwner,
}

/// GitHub-specific owner information
#[derive(Debug, Deserialize)]
pub(super) struct GitHubOwner {
    pub login: String,
}

impl From<GitHubRepository> for RepositorySummary {
    fn from(repo: GitHubRepository) -> Self {
        RepositorySummary {
            name: repo.name,
            size: repo.size,
            owner: repo.owner.login,
        }
    }
}

impl From<GitHubRepository> for RepositoryMetadata {
    fn from(repo: GitHubRepository) -> Self {
        RepositoryMetadata {
            name: repo.name,
            size: repo.size,
            owner: repo.owner.login,
            access_level: AccessLevel::from_private_flag(repo.private),
        }
    }
}
