//! PDF Tools MCP Server - Entry point
//!
//! Configuration is read from `PDF_TOOLS_*` environment variables.

use pdf_tools_mcp::{render, run_server_with_config, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_tools_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        api_url = config.api_url.as_ref().map(|u| u.as_str()).unwrap_or("<unset>"),
        sessions = config.max_sessions,
        "Starting PDF tools MCP server"
    );

    render::init(config.pdfium_dir.clone());
    run_server_with_config(config).await
}
