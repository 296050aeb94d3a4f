use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gitscan_mcp::admission::DEFAULT_GATE_CAPACITY;
use gitscan_mcp::config::ServerConfig;
use gitscan_mcp::github::DEFAULT_API_URL;
use gitscan_mcp::tools::RepositoryTools;

#[derive(Parser)]
#[command(author, version = "0.1.0", about, long_about = None)]
#[command(propagate_version = true)]
#[command(disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server in stdin/stdout mode
    Stdio {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Run the server with HTTP/SSE interface
    Http {
        /// Address to bind the HTTP server to
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        address: String,

        #[command(flatten)]
        server: ServerArgs,
    },
}

#[derive(Args)]
struct ServerArgs {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Default GitHub token for calls without one (overrides GITSCAN_GITHUB_TOKEN environment variable)
    #[arg(short = 't', long)]
    github_token: Option<String>,

    /// GitHub REST API base URL (overrides GITSCAN_GITHUB_API_URL environment variable)
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Number of repository details queries resolved at once
    #[arg(long, default_value_t = DEFAULT_GATE_CAPACITY)]
    gate_capacity: usize,

    /// Directory listings in flight per tree walk (unbounded when omitted)
    #[arg(long)]
    max_concurrent_fetches: Option<usize>,
}

impl ServerArgs {
    fn to_config(&self) -> ServerConfig {
        ServerConfig {
            github_token: self.github_token.clone(),
            api_url: self.api_url.clone(),
            gate_capacity: self.gate_capacity,
            max_concurrent_fetches: self.max_concurrent_fetches,
        }
        .with_env_fallback()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stdio { server } => run_stdio_server(server).await,
        Commands::Http { address, server } => run_http_server(address, server).await,
    }
}

/// Builds the composition root shared by every MCP session
fn build_tools(args: &ServerArgs) -> Result<RepositoryTools> {
    let config = args.to_config();

    if args.github_token.is_some() {
        tracing::info!("Using GitHub token from command line arguments");
    } else if config.github_token.is_some() {
        tracing::info!("Using GitHub token from environment");
    }
    tracing::info!(
        "Admission gate capacity: {}, fetch limit: {}",
        config.gate_capacity,
        config
            .max_concurrent_fetches
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unbounded".to_string())
    );

    let service = config.build_service()?;
    Ok(RepositoryTools::new(service, config.github_token))
}

async fn run_stdio_server(args: ServerArgs) -> Result<()> {
    // Initialize the tracing subscriber with stderr logging
    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr) // Explicitly use stderr for logging
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false) // Disable ANSI color codes
        .init();

    tracing::info!("Starting repository details MCP server in STDIN/STDOUT mode");
    let tools = build_tools(&args)?;

    gitscan_mcp::transport::stdio::run_stdio_server(tools)
        .await
        .map_err(|e| anyhow::anyhow!("Error running STDIO server: {}", e))
}

async fn run_http_server(address: String, args: ServerArgs) -> Result<()> {
    // Setup tracing
    let level = if args.debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},{}", level, env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false)) // Disable ANSI color codes
        .init();

    // Parse socket address
    let addr: SocketAddr = address.parse()?;

    tracing::debug!("Repository details server listening on {}", addr);
    tracing::info!("Access the repository details server at http://{}/sse", addr);

    let tools = build_tools(&args)?;
    let app = gitscan_mcp::transport::sse_server::SseServerApp::new(addr, tools);
    app.serve().await?;

    Ok(())
}
