use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::fetcher::VideoFetcher;
use crate::subtitles;
use crate::{Result, VideoToolError};

/// Prefix of the per-call scratch directories under the OS temp root
const WORKSPACE_PREFIX: &str = "video-transcript-";

/// Fetches a video's subtitle tracks and turns them into plain text
pub struct TranscriptExtractor {
    fetcher: Arc<dyn VideoFetcher>,
}

impl TranscriptExtractor {
    pub fn new(fetcher: Arc<dyn VideoFetcher>) -> Self {
        Self { fetcher }
    }

    /// Extract the cleaned transcript for `url`.
    ///
    /// Subtitles are fetched into a fresh temporary directory that is removed when
    /// this call returns, on success and on every error path alike. A video without
    /// captions yields an empty transcript, not an error.
    pub async fn extract(&self, url: &str) -> Result<String> {
        let workspace = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|e| {
                VideoToolError::Filesystem(format!("Failed to create temporary directory: {e}"))
            })?;

        tracing::info!("Extracting transcript for {}", url);
        tracing::debug!("Transcript workspace: {}", workspace.path().display());

        let transcript = self.extract_into(url, &workspace).await;

        // Dropping the guard removes the workspace; close() surfaces removal errors.
        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to remove transcript workspace: {}", e);
        }

        transcript
    }

    async fn extract_into(&self, url: &str, workspace: &TempDir) -> Result<String> {
        self.fetcher
            .fetch_subtitles(url, workspace.path())
            .await
            .context("Failed to fetch subtitles")?;

        let files = subtitle_files(workspace.path()).await?;
        if files.is_empty() {
            tracing::info!("No subtitle tracks available for {}", url);
        }

        let mut transcript = String::new();
        for path in files {
            let raw = fs_err::tokio::read_to_string(&path)
                .await
                .map_err(|e| VideoToolError::Filesystem(e.to_string()))?;

            tracing::debug!("Cleaning subtitle file {}", path.display());
            transcript.push_str(&subtitles::clean(&raw));
            transcript.push_str("\n\n");
        }

        Ok(transcript)
    }
}

/// Every regular file the fetcher left in `dir`, in file-name order
async fn subtitle_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs_err::tokio::read_dir(dir)
        .await
        .map_err(|e| VideoToolError::Filesystem(e.to_string()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| VideoToolError::Filesystem(e.to_string()))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| VideoToolError::Filesystem(e.to_string()))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}
