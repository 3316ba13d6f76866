use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::bigkinds::{BigKindsClient, ImageResolver};
use crate::config::Config;
use crate::mcp::McpServer;
use crate::mcp::http;
use crate::mcp::resources::register_widgets;
use crate::mcp::tools::{ToolContext, register_all};
use crate::trends::TrendsClient;
use crate::widgets::WidgetStore;

pub const SERVER_NAME: &str = "deep-news-mcp";

const INSTRUCTIONS: &str = "Korean news research tools backed by the BigKinds archive. \
Use get_korean_time to resolve relative dates before searching. \
search_korean_news and get_article_detail find and read articles; \
analyze_timeline, compare_perspectives and generate_report fetch up to 1,000 \
articles and aggregate them. Dates are YYYY-MM-DD in Korean time.";

/// Build the MCP server with every tool and widget resource registered
#[inline]
pub async fn build_server(config: &Config) -> Result<Arc<McpServer>> {
    let bigkinds =
        BigKindsClient::new(&config.bigkinds).context("Failed to create BigKinds client")?;
    let images = ImageResolver::new(config.images.host_marker.clone(), config.image_timeout())
        .context("Failed to create image resolver")?;
    let trends = TrendsClient::new(config.trends_cache_path(), config.trends_max_age());

    let ctx = ToolContext {
        bigkinds: Arc::new(bigkinds),
        images: Arc::new(images),
        trends: Arc::new(trends),
    };

    let server = McpServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION"))
        .context("Failed to create MCP server")?
        .with_instructions(INSTRUCTIONS);

    register_all(&server, &ctx)
        .await
        .context("Failed to register tools")?;

    let widgets = Arc::new(WidgetStore::new(config.widgets.dir.clone()));
    register_widgets(&server, &widgets)
        .await
        .context("Failed to register widget resources")?;

    info!(
        "MCP server initialized with tools: {}",
        server.tool_names().await.join(", ")
    );
    Ok(Arc::new(server))
}

/// Serve newline-delimited JSON-RPC on stdin/stdout
#[inline]
pub async fn serve_stdio(config: &Config) -> Result<()> {
    let server = build_server(config).await?;
    server.serve_stdio().await
}

/// Serve the HTTP transports; `host`/`port` override the configured address
#[inline]
pub async fn serve_http(config: &Config, host: Option<&str>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or(&config.server.host);
    let port = port.unwrap_or(config.server.port);

    let server = build_server(config).await?;
    http::serve(server, host, port).await
}

/// Print the effective configuration as TOML
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("# {}", config.config_file_path().display());
    println!("{}", config.to_toml()?);
    println!("# trends cache: {}", config.trends_cache_path().display());
    Ok(())
}
