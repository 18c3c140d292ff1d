//! Video Tools MCP - An MCP tool server for fetching video transcripts and downloading videos
//!
//! This library exposes two tools to an AI-agent host: transcript extraction from a
//! video's subtitle tracks, and video download. All platform-specific retrieval is
//! delegated to the external `yt-dlp` utility.

pub mod cli;
pub mod config;
pub mod download;
pub mod fetcher;
pub mod server;
pub mod subtitles;
pub mod tools;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use download::{DownloadSummary, VideoDownloader};
pub use fetcher::{VideoFetcher, VideoMetadata, YtDlp};
pub use tools::{ToolDispatcher, ToolRequest, ToolResult};
pub use transcript::TranscriptExtractor;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the video tools
#[derive(thiserror::Error, Debug)]
pub enum VideoToolError {
    #[error("Failed to launch {program}: {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ProcessExit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("File operation failed: {0}")]
    Filesystem(String),

    #[error("Malformed metadata response: expected {expected} fields, got {actual}")]
    MalformedResponse { expected: usize, actual: usize },

    #[error("Invalid tool request: {0}")]
    InvalidRequest(String),
}
