use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{self, EnvFilter};

use gitscan_mcp::admission::{LazyField, DEFAULT_GATE_CAPACITY};
use gitscan_mcp::config::ServerConfig;
use gitscan_mcp::github::DEFAULT_API_URL;
use gitscan_mcp::services::{DetailsRequest, RepositoryDetails};

#[derive(Parser)]
#[command(author, version = "0.1.0", about = "GitScan CLI for GitHub repository details", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// GitHub API token for authentication (overrides GITSCAN_GITHUB_TOKEN environment variable)
    #[arg(short = 't', long, global = true)]
    github_token: Option<String>,

    /// GitHub REST API base URL (overrides GITSCAN_GITHUB_API_URL environment variable)
    #[arg(long, global = true, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Directory listings in flight per tree walk (unbounded when omitted)
    #[arg(long, global = true)]
    max_concurrent_fetches: Option<usize>,

    /// Print raw JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List repositories of the authenticated user
    Repositories,
    /// Show details of a repository
    Details {
        /// Repository owner (user or organisation)
        owner: String,

        /// Repository name
        repository: String,

        /// Optional fields to compute: numberOfFiles, ymlFile, activeWebhooks
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<LazyField>,

        /// Compute every optional field
        #[arg(long, conflicts_with = "fields")]
        all: bool,
    },
}

fn print_details(details: &RepositoryDetails) {
    println!("Name:          {}", details.name);
    println!("Owner:         {}", details.owner);
    println!("Size:          {} KB", details.size);
    println!("Access level:  {}", details.access_level);

    if let Some(count) = &details.number_of_files {
        match count {
            Some(count) => println!("Files:         {}", count),
            None => println!("Files:         <unavailable>"),
        }
    }

    if let Some(hooks) = &details.active_webhooks {
        println!("Active hooks:  {}", hooks.len());
        for hook in hooks {
            let target = hook.config.url.as_deref().unwrap_or("<no url>");
            println!("  - #{} {} -> {}", hook.id, hook.name.as_deref().unwrap_or("web"), target);
        }
    }

    if let Some(content) = &details.yml_file {
        match content {
            Some(content) => {
                println!("YML file:");
                println!("{}", content);
            }
            None => println!("YML file:      <none found>"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr) // Use stderr for logging
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = ServerConfig {
        github_token: cli.github_token.clone(),
        api_url: cli.api_url.clone(),
        gate_capacity: DEFAULT_GATE_CAPACITY,
        max_concurrent_fetches: cli.max_concurrent_fetches,
    }
    .with_env_fallback();

    let service = config.build_service()?;
    let token = config.github_token.clone().unwrap_or_default();
    if token.is_empty() {
        tracing::warn!("No GitHub token given; only public data is reachable");
    }

    tracing::info!("GitScan CLI initialized");

    match cli.command {
        Commands::Repositories => {
            let repositories = service.get_repositories(&token).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&repositories)?);
            } else if repositories.is_empty() {
                eprintln!("No repositories found.");
            } else {
                println!("{:<40} {:<24} {:>10}", "Repository", "Owner", "Size (KB)");
                println!("{:-<40} {:-<24} {:->10}", "", "", "");
                for repo in &repositories {
                    println!("{:<40} {:<24} {:>10}", repo.name, repo.owner, repo.size);
                }
            }
            Ok(())
        }
        Commands::Details {
            owner,
            repository,
            fields,
            all,
        } => {
            use strum::IntoEnumIterator;

            let fields = if all { LazyField::iter().collect() } else { fields };
            tracing::info!("Fetching details of {}/{}", owner, repository);

            let request = DetailsRequest {
                token,
                owner: owner.clone(),
                repository: repository.clone(),
                fields,
            };

            match service.get_repository_details(request).await {
                Some(details) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&details)?);
                    } else {
                        print_details(&details);
                    }
                    Ok(())
                }
                None => {
                    tracing::error!("Could not fetch details of {}/{}", owner, repository);
                    anyhow::bail!("Could not fetch details of {}/{}", owner, repository)
                }
            }
        }
    }
}
