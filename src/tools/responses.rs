//! Response types for the repository tools MCP server
//!
//! Tool methods return JSON strings; these wrappers fix the top-level shape so
//! that an empty or failed result is still a well-formed object.

use crate::github::RepositorySummary;
use crate::services::RepositoryDetails;
use serde::Serialize;

/// Response for the `get_repositories` tool
///
/// ```json
/// { "repositories": [ { "name": "hello", "size": 12, "owner": "octocat" } ] }
/// ```
#[derive(Debug, Serialize)]
pub struct RepositoriesResponse {
    pub repositories: Vec<RepositorySummary>,
}

/// Response for the `get_repository_details` tool
///
/// `details` is `null` when the repository metadata could not be fetched.
#[derive(Debug, Serialize)]
pub struct RepositoryDetailsResponse {
    pub details: Option<RepositoryDetails>,
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Failed to serialize response: {}", e))
}
