//! GitScan MCP Library for GitHub repository details
//!
//! This library provides Model Context Protocol (MCP) tools for querying
//! GitHub repositories:
//! - List the repositories of the authenticated user
//! - Fetch repository details, optionally with the number of files in the
//!   tree, the content of the first `.yml` file and the active webhooks
//!
//! ## Admission Control
//!
//! Details queries can fan out into whole-tree walks, which the rate-limited
//! GitHub API does not tolerate in large numbers. At most `gate_capacity`
//! (default 2) details queries run at once. A query keeps its slot until every
//! optional field it selected has resolved, successfully or not; see
//! [`admission`].
//!
//! ## Tree Walks
//!
//! Directory listings of one walk run concurrently. Counting waits for every
//! branch; searching stops all sibling branches once one finds a match; see
//! [`walker`].
//!
//! ## Authentication
//!
//! Every query carries the caller's GitHub token. A default token can be set
//! through the `GITSCAN_GITHUB_TOKEN` environment variable or `--github-token`.
//!
//! ```bash
//! export GITSCAN_GITHUB_TOKEN=your_github_token
//! ```
//!
//! ## Usage
//!
//! This library can be used in several ways:
//! - As an MCP server (HTTP/SSE mode)
//! - As an MCP server (STDIN/STDOUT mode)
//! - Directly as a Rust library
//!
//! ```no_run
//! use gitscan_mcp::admission::LazyField;
//! use gitscan_mcp::config::ServerConfig;
//! use gitscan_mcp::services::DetailsRequest;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let service = ServerConfig::default().with_env_fallback().build_service()?;
//! let details = service
//!     .get_repository_details(DetailsRequest {
//!         token: "your_github_token".to_string(),
//!         owner: "tokio-rs".to_string(),
//!         repository: "tokio".to_string(),
//!         fields: vec![LazyField::NumberOfFiles],
//!     })
//!     .await;
//! println!("{:?}", details);
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod config;
pub mod error;
pub mod github;
pub mod services;
pub mod tools;
pub mod transport;
pub mod walker;
