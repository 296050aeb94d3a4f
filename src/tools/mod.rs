pub mod responses;

use crate::admission::LazyField;
use crate::services::{DetailsRequest, RepositoryService};
use responses::{RepositoriesResponse, RepositoryDetailsResponse, to_json};
use rmcp::{model::*, tool, ServerHandler};

/// Repository query tools exposed through the MCP protocol
///
/// This struct is a thin wrapper around the [`RepositoryService`]; every clone
/// shares the service's admission gate and completion tracker.
#[derive(Clone)]
pub struct RepositoryTools {
    service: RepositoryService,
    default_token: Option<String>,
}

impl RepositoryTools {
    /// Creates the tools over an already configured service
    ///
    /// # Parameters
    ///
    /// * `service` - The service resolving queries (built once by the composition root)
    /// * `default_token` - Token used when a tool call does not pass one
    pub fn new(service: RepositoryService, default_token: Option<String>) -> Self {
        Self {
            service,
            default_token,
        }
    }

    /// Stops admitting new details queries; queued ones resolve to `null`
    pub fn shutdown(&self) {
        self.service.shutdown();
    }

    /// Picks the caller's token, falling back to the server's default
    fn effective_token(&self, token: Option<String>) -> String {
        token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.default_token.clone())
            .unwrap_or_default()
    }
}

#[tool(tool_box)]
impl ServerHandler for RepositoryTools {
    /// Provides information about this MCP server
    ///
    /// Returns server capabilities, protocol version, and usage instructions
    fn get_info(&self) -> ServerInfo {
        let auth_status = match &self.default_token {
            Some(_) => "Default GitHub token configured",
            None => "No default token; pass `token` with every call",
        };
        let gate = self.service.gate().snapshot();

        let instructions = format!(
            "# GitHub Repository Details MCP Server

## Authentication Status
{}

## Available Tools
- `get_repositories`: List repositories of the token's owner (name, size, owner)
- `get_repository_details`: Metadata of one repository plus optional fields:
  - `numberOfFiles`: number of files in the whole tree
  - `ymlFile`: content of the first `.yml` file found
  - `activeWebhooks`: active webhooks (token needs admin rights)

## Admission Control
At most {} details queries are resolved at once; further queries wait their turn.
",
            auth_status, gate.capacity
        );

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(instructions),
        }
    }
}

#[tool(tool_box)]
impl RepositoryTools {
    /// List repositories visible to the caller's token
    ///
    /// Failures are logged and reported as an empty list.
    #[tool(
        description = "List the GitHub repositories of the authenticated user. Returns name, size (KB) and owner of each repository. Example usage: `{\"name\": \"get_repositories\", \"arguments\": {\"token\": \"ghp_xxx\"}}`"
    )]
    async fn get_repositories(
        &self,
        #[tool(param)]
        #[schemars(
            description = "GitHub token (optional when the server was started with a default token)."
        )]
        token: Option<String>,
    ) -> Result<String, String> {
        let token = self.effective_token(token);
        let repositories = self.service.get_repositories(&token).await;
        to_json(&RepositoriesResponse { repositories })
    }

    /// Fetch repository metadata and the selected optional fields
    ///
    /// The query waits for an admission slot; the slot is held until every
    /// selected optional field has resolved.
    #[tool(
        description = "Get details of a GitHub repository: name, size, owner and access level. Optional fields are only computed when listed in `fields`: `numberOfFiles` walks the whole tree and counts files, `ymlFile` returns the content of the first .yml file found, `activeWebhooks` lists active webhooks. Example: `{\"name\": \"get_repository_details\", \"arguments\": {\"token\": \"ghp_xxx\", \"owner\": \"tokio-rs\", \"repository\": \"tokio\", \"fields\": [\"numberOfFiles\", \"ymlFile\"]}}`"
    )]
    async fn get_repository_details(
        &self,
        #[tool(param)]
        #[schemars(
            description = "GitHub token (optional when the server was started with a default token)."
        )]
        token: Option<String>,

        #[tool(param)]
        #[schemars(description = "Repository owner (user or organisation login).")]
        owner: String,

        #[tool(param)]
        #[schemars(description = "Repository name.")]
        repository: String,

        #[tool(param)]
        #[schemars(
            description = "Optional fields to compute (optional, default none). Any of: numberOfFiles, ymlFile, activeWebhooks."
        )]
        fields: Option<Vec<LazyField>>,
    ) -> Result<String, String> {
        let request = DetailsRequest {
            token: self.effective_token(token),
            owner,
            repository,
            fields: fields.unwrap_or_default(),
        };

        let details = self.service.get_repository_details(request).await;
        to_json(&RepositoryDetailsResponse { details })
    }
}
