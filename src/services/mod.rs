//! Query orchestration
//!
//! [`RepositoryService`] resolves the two queries the server exposes:
//!
//! 1. `get_repositories`: a single listing call, not admission controlled
//! 2. `get_repository_details`: admission controlled. The flow is
//!    - acquire a slot from the [`AdmissionGate`]
//!    - fetch the required metadata (on failure the slot is released at once)
//!    - register the selected lazy fields with the [`LazyCompletionTracker`],
//!      handing it the slot
//!    - resolve every selected field concurrently; each one reports completion
//!      through a [`CompletionGuard`] whatever its outcome, and the tracker
//!      releases the slot after the last one
//!
//! Failures of lazy fields are isolated: they are logged and rendered as
//! `null` (or an empty list) without affecting sibling fields.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use crate::admission::{
    AdmissionGate, CompletionGuard, LazyCompletionTracker, LazyField, RequestId,
};
use crate::error::ClientError;
use crate::github::{
    AccessLevel, RemoteTreeClient, RepositoryMetadata, RepositorySummary, TraversalNode, Webhook,
    active_only,
};
use crate::walker::TreeWalker;

/// Suffix of the configuration file looked up by the `ymlFile` field
pub const CONFIG_FILE_SUFFIX: &str = ".yml";

/// Parameters of a repository details query
#[derive(Debug, Clone)]
pub struct DetailsRequest {
    pub token: String,
    pub owner: String,
    pub repository: String,
    /// Optional fields the caller selected; duplicates are ignored
    pub fields: Vec<LazyField>,
}

/// Result of a repository details query
///
/// Optional fields are omitted when not selected. A selected field that could
/// not be resolved is `null` (`activeWebhooks` is an empty list instead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDetails {
    pub name: String,
    pub size: u64,
    pub owner: String,
    pub access_level: AccessLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_files: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yml_file: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_webhooks: Option<Vec<Webhook>>,
}

impl RepositoryDetails {
    fn mark_selected(&mut self, field: LazyField) {
        match field {
            LazyField::NumberOfFiles => self.number_of_files = Some(None),
            LazyField::YmlFile => self.yml_file = Some(None),
            LazyField::ActiveWebhooks => self.active_webhooks = Some(Vec::new()),
        }
    }

    fn apply(&mut self, value: LazyValue) {
        match value {
            LazyValue::NumberOfFiles(count) => self.number_of_files = Some(count),
            LazyValue::YmlFile(content) => self.yml_file = Some(content),
            LazyValue::ActiveWebhooks(hooks) => self.active_webhooks = Some(hooks),
        }
    }
}

impl From<RepositoryMetadata> for RepositoryDetails {
    fn from(metadata: RepositoryMetadata) -> Self {
        Self {
            name: metadata.name,
            size: metadata.size,
            owner: metadata.owner,
            access_level: metadata.access_level,
            number_of_files: None,
            yml_file: None,
            active_webhooks: None,
        }
    }
}

/// Resolved value of one lazy field
#[derive(Debug)]
enum LazyValue {
    NumberOfFiles(Option<u64>),
    YmlFile(Option<String>),
    ActiveWebhooks(Vec<Webhook>),
}

/// Repository coordinates shared by the lazy resolvers of one query
#[derive(Debug, Clone)]
struct FieldContext {
    token: Arc<str>,
    owner: Arc<str>,
    repository: Arc<str>,
}

/// Resolves repository queries against a [`RemoteTreeClient`]
///
/// Cloning is cheap; every clone shares the same gate and tracker.
#[derive(Clone)]
pub struct RepositoryService {
    client: Arc<dyn RemoteTreeClient>,
    gate: Arc<AdmissionGate>,
    tracker: Arc<LazyCompletionTracker>,
    fetch_limit: Option<NonZeroUsize>,
}

impl RepositoryService {
    pub fn new(
        client: Arc<dyn RemoteTreeClient>,
        gate: Arc<AdmissionGate>,
        tracker: Arc<LazyCompletionTracker>,
    ) -> Self {
        Self {
            client,
            gate,
            tracker,
            fetch_limit: None,
        }
    }

    /// Bounds directory listings in flight per tree walk
    pub fn with_fetch_limit(mut self, fetch_limit: Option<NonZeroUsize>) -> Self {
        self.fetch_limit = fetch_limit;
        self
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn tracker(&self) -> &LazyCompletionTracker {
        &self.tracker
    }

    /// Closes the admission gate; queries already admitted run to completion
    pub fn shutdown(&self) {
        tracing::info!("Closing admission gate ({} queries in flight)", self.gate.in_flight());
        self.gate.close();
    }

    /// Lists the repositories of the token's owner
    ///
    /// Failures are logged and reported as an empty list.
    pub async fn get_repositories(&self, token: &str) -> Vec<RepositorySummary> {
        match self.client.list_repositories(token).await {
            Ok(repositories) => repositories,
            Err(e) => {
                tracing::warn!("Listing repositories failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Resolves a details query under admission control
    ///
    /// Returns `None` when the required metadata could not be fetched.
    pub async fn get_repository_details(&self, request: DetailsRequest) -> Option<RepositoryDetails> {
        let slot = match self.gate.acquire().await {
            Ok(slot) => slot,
            Err(e) => {
                tracing::warn!("Rejecting details query for {}/{}: {}", request.owner, request.repository, e);
                return None;
            }
        };

        tracing::info!(
            "Resolving details of {}/{} ({} lazy fields requested)",
            request.owner,
            request.repository,
            request.fields.len()
        );

        let metadata = match self
            .client
            .get_metadata(&request.token, &request.owner, &request.repository)
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(
                    "Fetching metadata of {}/{} failed: {}",
                    request.owner,
                    request.repository,
                    e
                );
                slot.release();
                return None;
            }
        };

        let selected: BTreeSet<LazyField> = request.fields.iter().copied().collect();
        let request_id = RequestId::new();
        self.tracker
            .register(request_id, selected.iter().copied(), move || slot.release());

        let mut details = RepositoryDetails::from(metadata);
        let context = FieldContext {
            token: Arc::from(request.token),
            owner: Arc::from(request.owner),
            repository: Arc::from(request.repository),
        };

        let mut resolvers = JoinSet::new();
        for field in selected {
            details.mark_selected(field);

            let service = self.clone();
            let context = context.clone();
            let completion = CompletionGuard::new(Arc::clone(&self.tracker), request_id, field);
            resolvers.spawn(async move {
                let _completion = completion;
                service.resolve_field(field, &context).await
            });
        }

        while let Some(joined) = resolvers.join_next().await {
            match joined {
                Ok(value) => details.apply(value),
                Err(e) => tracing::error!("Lazy field resolver of request {} failed: {}", request_id, e),
            }
        }

        tracing::info!(
            "Resolved details of {}/{}",
            context.owner,
            context.repository
        );
        Some(details)
    }

    async fn resolve_field(&self, field: LazyField, context: &FieldContext) -> LazyValue {
        match field {
            LazyField::NumberOfFiles => LazyValue::NumberOfFiles(self.number_of_files(context).await),
            LazyField::YmlFile => LazyValue::YmlFile(self.yml_file_content(context).await),
            LazyField::ActiveWebhooks => {
                LazyValue::ActiveWebhooks(self.active_webhooks(context).await)
            }
        }
    }

    fn walker(&self, token: &Arc<str>) -> TreeWalker {
        let walker = TreeWalker::new(Arc::clone(&self.client), Arc::clone(token));
        match self.fetch_limit {
            Some(limit) => walker.with_fetch_limit(limit),
            None => walker,
        }
    }

    /// Root listing; an empty repository has no contents
    async fn root_nodes(&self, context: &FieldContext) -> Result<Vec<TraversalNode>, ClientError> {
        match self
            .client
            .list_root(&context.token, &context.owner, &context.repository)
            .await
        {
            Err(e) if e.is_not_found() => {
                tracing::debug!("{}/{} has no contents: {}", context.owner, context.repository, e);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn number_of_files(&self, context: &FieldContext) -> Option<u64> {
        let result = async {
            let root = self.root_nodes(context).await?;
            self.walker(&context.token).count_files(root).await
        }
        .await;

        match result {
            Ok(count) => {
                tracing::debug!("{}/{} holds {} files", context.owner, context.repository, count);
                Some(count)
            }
            Err(e) => {
                tracing::warn!(
                    "Counting files of {}/{} failed: {}",
                    context.owner,
                    context.repository,
                    e
                );
                None
            }
        }
    }

    async fn yml_file_content(&self, context: &FieldContext) -> Option<String> {
        let result = async {
            let root = self.root_nodes(context).await?;
            let Some(file) = self
                .walker(&context.token)
                .find_by_suffix(root, CONFIG_FILE_SUFFIX)
                .await?
            else {
                return Ok(None);
            };
            let Some(download_url) = file.download_url.as_deref() else {
                tracing::debug!("{} has no download URL", file.path);
                return Ok(None);
            };
            self.client
                .fetch_blob(&context.token, download_url)
                .await
                .map(Some)
        }
        .await;

        match result {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "Looking up {} file of {}/{} failed: {}",
                    CONFIG_FILE_SUFFIX,
                    context.owner,
                    context.repository,
                    e
                );
                None
            }
        }
    }

    async fn active_webhooks(&self, context: &FieldContext) -> Vec<Webhook> {
        match self
            .client
            .list_webhooks(&context.token, &context.owner, &context.repository)
            .await
        {
            Ok(webhooks) => active_only(webhooks),
            Err(e) => {
                tracing::warn!(
                    "Listing webhooks of {}/{} failed: {}",
                    context.owner,
                    context.repository,
                    e
                );
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for RepositoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryService")
            .field("gate", &self.gate.snapshot())
            .field("tracker", &self.tracker)
            .field("fetch_limit", &self.fetch_limit)
            .finish_non_exhaustive()
    }
}
