use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_tools_mcp::cli::{Cli, Commands};
use video_tools_mcp::config::Config;
use video_tools_mcp::fetcher::{VideoFetcher, YtDlp};
use video_tools_mcp::server::McpServer;
use video_tools_mcp::{tools, utils, ToolDispatcher, TranscriptExtractor, VideoDownloader};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is the protocol channel
    let default_filter = if cli.verbose {
        "video_tools_mcp=debug"
    } else {
        "video_tools_mcp=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.overrides())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Tools => {
            println!("{}", serde_json::to_string_pretty(&tools::catalog())?);
        }
        Commands::Config => {
            config.display();
        }
        Commands::Transcript { url } => {
            let transcript = TranscriptExtractor::new(fetcher(&config).await)
                .extract(&url)
                .await?;
            println!("{}", transcript.trim_end());
        }
        Commands::Download { url, filename } => {
            let summary = VideoDownloader::new(fetcher(&config).await, &config.downloads_dir)
                .download(&url, filename.as_deref())
                .await?;
            println!("{}", summary);
        }
        Commands::Serve => {
            tracing::info!("Downloads directory: {}", config.downloads_dir.display());
            let dispatcher = ToolDispatcher::new(fetcher(&config).await, &config.downloads_dir);
            McpServer::new(dispatcher).serve_stdio().await?;
        }
    }

    Ok(())
}

/// yt-dlp backed fetcher; missing tools are reported but not fatal
async fn fetcher(config: &Config) -> Arc<dyn VideoFetcher> {
    for dep in utils::check_dependencies(&config.yt_dlp_path).await {
        tracing::warn!("Missing dependency: {}", dep);
    }

    Arc::new(YtDlp::from_config(config))
}
