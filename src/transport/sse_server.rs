use crate::tools::RepositoryTools;
use anyhow::Result;
use rmcp::transport::sse_server::SseServer;
use std::net::SocketAddr;

pub struct SseServerApp {
    bind_addr: SocketAddr,
    tools: RepositoryTools,
}

impl SseServerApp {
    pub fn new(bind_addr: SocketAddr, tools: RepositoryTools) -> Self {
        Self { bind_addr, tools }
    }

    pub async fn serve(self) -> Result<()> {
        let sse_server = SseServer::serve(self.bind_addr).await?;
        let tools = self.tools.clone();
        let cancellation_token = sse_server.with_service(move || tools.clone());

        // Wait for Ctrl+C signal to gracefully shutdown
        tokio::signal::ctrl_c().await?;

        // Cancel the server and wake queries still waiting for admission
        cancellation_token.cancel();
        self.tools.shutdown();

        Ok(())
    }
}
