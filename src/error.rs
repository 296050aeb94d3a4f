//! Error types shared across the crate
//!
//! Library code returns these typed errors; the binaries wrap them in `anyhow`.

use thiserror::Error;

/// Failures raised by a [`RemoteTreeClient`](crate::github::RemoteTreeClient) call
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP request could not be sent or the body could not be read
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with a non-success status
    #[error("GitHub API error {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected shape
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// A handle could not be turned into a request URL
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

impl ClientError {
    /// True for `404 Not Found` responses
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }
}

/// Invalid server configuration detected while building the application context
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("admission gate capacity must be at least 1")]
    ZeroCapacity,

    #[error("fetch concurrency limit must be at least 1 when set")]
    ZeroFetchLimit,

    #[error("invalid GitHub API base URL '{url}': {message}")]
    InvalidApiUrl { url: String, message: String },
}
