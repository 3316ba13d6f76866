use clap::{Parser, Subcommand};
use deep_news_mcp::Result;
use deep_news_mcp::commands::{serve_http, serve_stdio, show_config};
use deep_news_mcp::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deep-news-mcp")]
#[command(about = "MCP server for BigKinds Korean news search and analysis")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to the user config directory)
    #[arg(long, global = true, env = "DEEP_NEWS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
    /// Start the MCP server (HTTP by default)
    Serve {
        /// Use stdio transport instead of HTTP
        #[arg(long, conflicts_with_all = ["host", "port"])]
        stdio: bool,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
    },
}

fn load_config(dir: Option<PathBuf>) -> anyhow::Result<Config> {
    match dir {
        Some(dir) => Config::load(dir),
        None => Config::load_default(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries JSON-RPC in stdio mode
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                println!("Edit {} to change settings.", config.config_file_path().display());
                println!("Run with 'config --show' to print the effective configuration.");
            }
        }
        Commands::Serve { stdio, host, port } => {
            if stdio {
                serve_stdio(&config).await?;
            } else {
                serve_http(&config, host.as_deref(), port).await?;
            }
        }
    }

    Ok(())
}
