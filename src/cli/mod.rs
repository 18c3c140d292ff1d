use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ConfigOverrides, DOWNLOADS_DIR_ENV};

#[derive(Parser)]
#[command(
    name = "video-tools-mcp",
    about = "Video Tools MCP - Video transcripts and downloads for AI agents, powered by yt-dlp",
    version,
    long_about = "An MCP server exposing two tools over stdio: fetching a video's subtitle transcript as plain text, and downloading a video file. Runs the server when no subcommand is given; the transcript and download subcommands run a single tool from the shell."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory downloaded videos are saved to (default: ./downloads)
    #[arg(long, global = true, env = DOWNLOADS_DIR_ENV, value_name = "DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// yt-dlp program name or path
    #[arg(long, global = true, env = "YT_DLP_PATH", value_name = "PATH")]
    pub yt_dlp: Option<String>,

    /// Maximum video height for downloads (default: 720)
    #[arg(long, global = true, env = "MAX_VIDEO_HEIGHT", value_name = "PIXELS")]
    pub max_height: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the tools over stdio (default)
    Serve,

    /// Print the cleaned subtitle transcript of a video
    Transcript {
        /// URL of the video
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Download a video into the downloads directory
    Download {
        /// URL of the video
        #[arg(value_name = "URL")]
        url: String,

        /// File name without extension (defaults to the video title)
        #[arg(short, long, value_name = "NAME")]
        filename: Option<String>,
    },

    /// Print the tool catalog as JSON
    Tools,

    /// Show the effective configuration
    Config,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            downloads_dir: self.downloads_dir.clone(),
            yt_dlp_path: self.yt_dlp.clone(),
            max_height: self.max_height,
        }
    }
}
