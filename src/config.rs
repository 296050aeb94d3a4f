//! Server configuration
//!
//! Values come from command line arguments first and environment variables
//! second:
//!
//! - `GITSCAN_GITHUB_TOKEN`: default token for calls that do not pass one
//! - `GITSCAN_GITHUB_API_URL`: GitHub REST endpoint (GitHub Enterprise, tests)

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::admission::{AdmissionGate, DEFAULT_GATE_CAPACITY, LazyCompletionTracker};
use crate::error::ConfigError;
use crate::github::{DEFAULT_API_URL, GithubClient};
use crate::services::RepositoryService;

pub const GITHUB_TOKEN_ENV: &str = "GITSCAN_GITHUB_TOKEN";
pub const GITHUB_API_URL_ENV: &str = "GITSCAN_GITHUB_API_URL";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Token used when a query does not carry its own
    pub github_token: Option<String>,

    /// Base URL of the GitHub REST API
    pub api_url: String,

    /// Number of details queries admitted at once
    pub gate_capacity: usize,

    /// Directory listings allowed in flight per tree walk; `None` is unbounded
    pub max_concurrent_fetches: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            gate_capacity: DEFAULT_GATE_CAPACITY,
            max_concurrent_fetches: None,
        }
    }
}

impl ServerConfig {
    /// Fills unset values from the environment
    ///
    /// Explicit values (e.g. from command line flags) take priority.
    pub fn with_env_fallback(mut self) -> Self {
        if self.github_token.is_none() {
            self.github_token = std::env::var(GITHUB_TOKEN_ENV)
                .ok()
                .filter(|token| !token.trim().is_empty());
        }
        if self.api_url == DEFAULT_API_URL {
            if let Ok(url) = std::env::var(GITHUB_API_URL_ENV) {
                if !url.trim().is_empty() {
                    self.api_url = url.trim().to_string();
                }
            }
        }
        self
    }

    fn fetch_limit(&self) -> Result<Option<NonZeroUsize>, ConfigError> {
        match self.max_concurrent_fetches {
            None => Ok(None),
            Some(limit) => NonZeroUsize::new(limit)
                .map(Some)
                .ok_or(ConfigError::ZeroFetchLimit),
        }
    }

    /// Builds the composition root: one gate, one tracker and one client shared
    /// by every query the server handles
    pub fn build_service(&self) -> Result<RepositoryService, ConfigError> {
        let client = GithubClient::new(reqwest::Client::new(), &self.api_url)?;
        let gate = AdmissionGate::new(self.gate_capacity)?;
        let fetch_limit = self.fetch_limit()?;

        tracing::debug!(
            "Service configured: api={}, gate_capacity={}, fetch_limit={:?}",
            client.api_base(),
            self.gate_capacity,
            fetch_limit
        );

        Ok(RepositoryService::new(
            Arc::new(client),
            Arc::new(gate),
            Arc::new(LazyCompletionTracker::new()),
        )
        .with_fetch_limit(fetch_limit))
    }
}
