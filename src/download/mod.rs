use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fetcher::ytdlp::{escape_template, VIDEO_EXTENSION};
use crate::fetcher::VideoFetcher;
use crate::utils::bytes_to_mib;
use crate::{Result, VideoToolError};

/// yt-dlp output template that names the file after the video's title
const TITLE_TEMPLATE: &str = "%(title)s.%(ext)s";

/// What a finished download reports back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadSummary {
    pub title: String,
    pub duration: String,
    pub resolution: String,
    /// File size in MiB, rounded to two decimals
    pub size_mb: f64,
    pub path: PathBuf,
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Video downloaded successfully!")?;
        writeln!(f, "Title: {}", self.title)?;
        writeln!(f, "Duration: {} seconds", self.duration)?;
        writeln!(f, "Resolution: {}", self.resolution)?;
        writeln!(f, "Size: {:.2} MB", self.size_mb)?;
        write!(f, "Saved to: {}", self.path.display())
    }
}

/// Downloads videos into a persistent output directory
pub struct VideoDownloader {
    fetcher: Arc<dyn VideoFetcher>,
    output_dir: PathBuf,
}

impl VideoDownloader {
    pub fn new(fetcher: Arc<dyn VideoFetcher>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download `url`, naming the file `filename` or, when absent, after the video title
    pub async fn download(&self, url: &str, filename: Option<&str>) -> Result<DownloadSummary> {
        ensure_output_dir(&self.output_dir).await?;

        tracing::info!("Querying video metadata for {}", url);
        let metadata = self
            .fetcher
            .query_metadata(url)
            .await
            .context("Failed to query video metadata")?;

        let output_template = self.output_template(filename);

        tracing::info!("Downloading \"{}\" to {}", metadata.title, output_template);
        self.fetcher
            .fetch_video(url, &output_template)
            .await
            .context("Failed to download video")?;

        let path = self.target_path(filename.unwrap_or(&metadata.title));
        let file = fs_err::tokio::metadata(&path)
            .await
            .map_err(|e| VideoToolError::Filesystem(e.to_string()))?;

        let summary = DownloadSummary {
            title: metadata.title,
            duration: metadata.duration,
            resolution: metadata.resolution,
            size_mb: bytes_to_mib(file.len()),
            path,
        };

        tracing::info!("Saved {} ({:.2} MB)", summary.path.display(), summary.size_mb);
        Ok(summary)
    }

    /// yt-dlp output template; the directory and caller's filename are escaped so
    /// only the title placeholder is expanded
    fn output_template(&self, filename: Option<&str>) -> String {
        match filename {
            Some(name) => escape_template(&self.target_path(name).to_string_lossy()),
            None => {
                let dir = escape_template(&self.output_dir.to_string_lossy());
                Path::new(&dir).join(TITLE_TEMPLATE).to_string_lossy().into_owned()
            }
        }
    }

    /// `<output_dir>/<stem>.mp4`; `stem` is used verbatim as a path segment
    pub fn target_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.{VIDEO_EXTENSION}"))
    }
}

/// Create the downloads directory and any missing parents; succeeds if it already exists
pub async fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs_err::tokio::create_dir_all(dir)
        .await
        .map_err(|e| VideoToolError::Filesystem(e.to_string()))?;
    Ok(())
}
