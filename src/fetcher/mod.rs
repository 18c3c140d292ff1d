use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod ytdlp;

pub use ytdlp::YtDlp;

use crate::{Result, VideoToolError};

/// Descriptive fields reported by the fetch utility's metadata query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video title as reported by the platform
    pub title: String,

    /// Duration in seconds, as printed by the utility
    pub duration: String,

    /// Display resolution such as `1280x720`
    pub resolution: String,
}

impl VideoMetadata {
    /// Number of newline-separated fields a metadata query prints
    pub const FIELD_COUNT: usize = 3;

    /// Parse the positional `title\nduration\nresolution` response.
    ///
    /// Fails with [`VideoToolError::MalformedResponse`] when fewer than three lines
    /// come back instead of handing out empty fields.
    pub fn parse(response: &str) -> std::result::Result<Self, VideoToolError> {
        let fields: Vec<&str> = response
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .collect();

        match fields.as_slice() {
            [title, duration, resolution, ..] => Ok(Self {
                title: (*title).to_string(),
                duration: (*duration).to_string(),
                resolution: (*resolution).to_string(),
            }),
            _ => Err(VideoToolError::MalformedResponse {
                expected: Self::FIELD_COUNT,
                actual: fields.len(),
            }),
        }
    }
}

/// Capability boundary around the external video-fetching utility.
///
/// Orchestration code only talks to this trait, so tests can substitute a mock
/// instead of spawning real subprocesses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Write manual and auto-generated subtitle tracks for `url` into `workdir`
    /// without downloading the video payload
    async fn fetch_subtitles(&self, url: &str, workdir: &Path) -> Result<()>;

    /// Query title, duration and resolution without downloading anything
    async fn query_metadata(&self, url: &str) -> Result<VideoMetadata>;

    /// Download the video to `output_template`, which may contain utility
    /// placeholders such as `%(title)s`
    async fn fetch_video(&self, url: &str, output_template: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        let metadata = VideoMetadata::parse("Rust in 100 Seconds\n149\n1920x1080\n").unwrap();
        assert_eq!(metadata.title, "Rust in 100 Seconds");
        assert_eq!(metadata.duration, "149");
        assert_eq!(metadata.resolution, "1920x1080");
    }

    #[test]
    fn test_parse_metadata_crlf() {
        let metadata = VideoMetadata::parse("Title\r\n12\r\n640x360\r\n").unwrap();
        assert_eq!(metadata.title, "Title");
        assert_eq!(metadata.resolution, "640x360");
    }

    #[test]
    fn test_parse_metadata_keeps_empty_positional_fields() {
        let metadata = VideoMetadata::parse("Live stream\n\naudio only").unwrap();
        assert_eq!(metadata.duration, "");
        assert_eq!(metadata.resolution, "audio only");
    }

    #[test]
    fn test_parse_metadata_too_few_fields() {
        let err = VideoMetadata::parse("Only a title\n").unwrap_err();
        assert!(matches!(
            err,
            VideoToolError::MalformedResponse { expected: 3, actual: 1 }
        ));

        let err = VideoMetadata::parse("").unwrap_err();
        assert!(matches!(
            err,
            VideoToolError::MalformedResponse { actual: 0, .. }
        ));
    }
}
