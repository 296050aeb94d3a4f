use crate::tools::RepositoryTools;
use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

pub async fn run_stdio_server(tools: RepositoryTools) -> Result<()> {
    let shutdown = tools.clone();

    // Use the rust-sdk stdio transport implementation
    let server = tools.serve(stdio()).await?;

    server.waiting().await?;
    shutdown.shutdown();
    Ok(())
}
