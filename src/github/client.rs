//! reqwest-based GitHub REST client
//!
//! Every method is a single logical call against the API. Listing endpoints
//! follow `Link: rel="next"` headers so callers always receive the complete
//! listing.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use serde::de::DeserializeOwned;
use url::Url;

use super::models::{GitHubRepository, RepositoryMetadata, RepositorySummary, TraversalNode, Webhook};
use super::RemoteTreeClient;
use crate::error::{ClientError, ConfigError};

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "gitscan-mcp/0.1.0 (https://github.com/tacogips/gitscan-mcp)";

/// Upper bound on followed pages for a single listing call
const MAX_PAGES: usize = 50;

/// GitHub client bound to an API base URL
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    api_base: Url,
}

impl GithubClient {
    /// Creates a client against `api_base` (e.g. `https://api.github.com`)
    pub fn new(client: Client, api_base: &str) -> Result<Self, ConfigError> {
        let mut api_base = Url::parse(api_base).map_err(|e| ConfigError::InvalidApiUrl {
            url: api_base.to_string(),
            message: e.to_string(),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(ConfigError::InvalidApiUrl {
                url: api_base.to_string(),
                message: "URL cannot be used as a base".to_string(),
            });
        }
        // Url::join drops the last segment unless the path ends with '/'
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        Ok(Self { client, api_base })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Builds `{api_base}/repos/{owner}/{repo}{suffix}` with path-escaped segments
    fn repo_url(&self, owner: &str, repo: &str, suffix: &str) -> Result<Url, ClientError> {
        let path = format!(
            "repos/{}/{}{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            suffix
        );
        self.api_base
            .join(&path)
            .map_err(|_| ClientError::InvalidUrl(path))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.api_base
            .join(path)
            .map_err(|_| ClientError::InvalidUrl(path.to_string()))
    }

    /// Sends an authenticated GET and checks the status
    async fn get(&self, url: Url, token: &str) -> Result<Response, ClientError> {
        let url_str = url.to_string();
        let mut req_builder = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT);

        if !token.is_empty() {
            req_builder = req_builder.header(header::AUTHORIZATION, format!("token {}", token));
        }

        let response = req_builder
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Status {
                url: url_str,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, token: &str) -> Result<T, ClientError> {
        let url_str = url.to_string();
        let response = self.get(url, token).await?;
        decode_json(&url_str, response).await
    }

    /// Fetches every page of a JSON array listing
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &str,
    ) -> Result<Vec<T>, ClientError> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            let url_str = url.to_string();
            let response = self.get(url, token).await?;
            next = next_page_link(&response);
            let mut page: Vec<T> = decode_json(&url_str, response).await?;
            items.append(&mut page);

            pages += 1;
            if pages >= MAX_PAGES {
                if next.is_some() {
                    tracing::warn!("Stopped following pagination after {} pages at {}", pages, url_str);
                }
                break;
            }
        }

        Ok(items)
    }
}

async fn decode_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await.map_err(|source| ClientError::Request {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Extracts the `rel="next"` target from a `Link` header
fn next_page_link(response: &Response) -> Option<Url> {
    let link = response.headers().get(header::LINK)?.to_str().ok()?;
    parse_next_link(link)
}

fn parse_next_link(link: &str) -> Option<Url> {
    link.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|param| param.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}

fn with_per_page(mut url: Url) -> Url {
    url.query_pairs_mut().append_pair("per_page", "100");
    url
}

#[async_trait]
impl RemoteTreeClient for GithubClient {
    async fn list_repositories(&self, token: &str) -> Result<Vec<RepositorySummary>, ClientError> {
        let url = with_per_page(self.endpoint("user/repos")?);
        let repos: Vec<GitHubRepository> = self.get_all_pages(url, token).await?;
        Ok(repos.into_iter().map(RepositorySummary::from).collect())
    }

    async fn get_metadata(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryMetadata, ClientError> {
        let url = self.repo_url(owner, repo, "")?;
        let repository: GitHubRepository = self.get_json(url, token).await?;
        Ok(repository.into())
    }

    async fn list_root(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<TraversalNode>, ClientError> {
        let url = self.repo_url(owner, repo, "/contents")?;
        self.get_json(url, token).await
    }

    async fn list_directory(
        &self,
        token: &str,
        handle: &str,
    ) -> Result<Vec<TraversalNode>, ClientError> {
        let url = Url::parse(handle).map_err(|_| ClientError::InvalidUrl(handle.to_string()))?;
        self.get_json(url, token).await
    }

    async fn fetch_blob(&self, token: &str, handle: &str) -> Result<String, ClientError> {
        let url = Url::parse(handle).map_err(|_| ClientError::InvalidUrl(handle.to_string()))?;
        let response = self.get(url, token).await?;
        response.text().await.map_err(|source| ClientError::Request {
            url: handle.to_string(),
            source,
        })
    }

    async fn list_webhooks(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Webhook>, ClientError> {
        let url = with_per_page(self.repo_url(owner, repo, "/hooks")?);
        self.get_all_pages(url, token).await
    }
}
