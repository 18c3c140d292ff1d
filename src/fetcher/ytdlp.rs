use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::{VideoFetcher, VideoMetadata};
use crate::config::Config;
use crate::{Result, VideoToolError};

/// Subtitle format requested from yt-dlp
const SUBTITLE_FORMAT: &str = "vtt";

/// Container every download is merged into
pub const VIDEO_EXTENSION: &str = "mp4";

const PROGRESS_TEMPLATE: &str = "download:%(progress._percent_str)s of %(progress._total_bytes_str)s at %(progress._speed_str)s ETA %(progress._eta_str)s";

/// Escape `%` so a literal path segment survives yt-dlp's output template expansion
pub fn escape_template(literal: &str) -> String {
    literal.replace('%', "%%")
}

/// [`VideoFetcher`] backed by the yt-dlp command line program
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
    subtitle_language: String,
    max_height: u32,
}

impl YtDlp {
    pub fn new(program: impl Into<String>, subtitle_language: impl Into<String>, max_height: u32) -> Self {
        Self {
            program: program.into(),
            subtitle_language: subtitle_language.into(),
            max_height,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.yt_dlp_path.clone(),
            config.subtitle_language.clone(),
            config.max_height,
        )
    }

    /// Program name or path this fetcher invokes
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Base command. stdin is detached so the child never reads the protocol channel.
    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.stdin(Stdio::null());
        command
    }

    fn launch_error(&self, source: std::io::Error) -> VideoToolError {
        VideoToolError::ProcessLaunch {
            program: self.program.clone(),
            source,
        }
    }

    /// Run to completion and return stdout, failing on a non-zero exit
    async fn run(&self, mut command: Command) -> Result<String> {
        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            return Err(VideoToolError::ProcessExit {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn format_selector(&self) -> String {
        format!(
            "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
            h = self.max_height
        )
    }
}

#[async_trait]
impl VideoFetcher for YtDlp {
    async fn fetch_subtitles(&self, url: &str, workdir: &Path) -> Result<()> {
        tracing::debug!("Fetching subtitles for {} into {}", url, workdir.display());

        let mut command = self.command();
        command
            .current_dir(workdir)
            .args([
                "--write-subs",
                "--write-auto-subs",
                "--sub-langs",
                &self.subtitle_language,
                "--skip-download",
                "--sub-format",
                SUBTITLE_FORMAT,
                "--no-playlist",
                "--output",
                "%(id)s.%(ext)s",
                url,
            ]);

        self.run(command).await?;
        Ok(())
    }

    async fn query_metadata(&self, url: &str) -> Result<VideoMetadata> {
        tracing::debug!("Querying metadata for {}", url);

        let mut command = self.command();
        command.args([
            "--skip-download",
            "--no-playlist",
            "--print",
            "title",
            "--print",
            "duration",
            "--print",
            "resolution",
            url,
        ]);

        let stdout = self.run(command).await?;
        Ok(VideoMetadata::parse(&stdout)?)
    }

    async fn fetch_video(&self, url: &str, output_template: &str) -> Result<()> {
        tracing::debug!("Downloading {} to {}", url, output_template);

        let mut command = self.command();
        command
            .args([
                "--format",
                &self.format_selector(),
                "--merge-output-format",
                VIDEO_EXTENSION,
                "--no-playlist",
                "--newline",
                "--progress",
                "--progress-template",
                PROGRESS_TEMPLATE,
                "--output",
                output_template,
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| self.launch_error(e))?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            String::from_utf8_lossy(&buf).trim().to_string()
        });

        // Progress is for the operator only; it goes to the log, never to the caller.
        // A bad progress line must not stop us from reaping the child.
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).split(b'\n');
            loop {
                match lines.next_segment().await {
                    Ok(Some(line)) => {
                        let line = String::from_utf8_lossy(&line);
                        tracing::info!(target: "video_tools_mcp::progress", "{}", line.trim_end());
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Failed to read {} progress: {}", self.program, e);
                        break;
                    }
                }
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(VideoToolError::ProcessExit {
                program: self.program.clone(),
                status,
                stderr,
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selector_uses_height_ceiling() {
        let fetcher = YtDlp::new("yt-dlp", "en", 720);
        assert_eq!(
            fetcher.format_selector(),
            "bestvideo[height<=720]+bestaudio/best[height<=720]"
        );
    }

    #[test]
    fn test_escape_template() {
        assert_eq!(escape_template("/videos/clip"), "/videos/clip");
        assert_eq!(escape_template("/videos/100%(title)s"), "/videos/100%%(title)s");
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_failure() {
        let fetcher = YtDlp::new("definitely-not-a-real-yt-dlp-binary", "en", 720);
        let err = fetcher.query_metadata("https://example.com/v").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VideoToolError>(),
            Some(VideoToolError::ProcessLaunch { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_exit_failure() {
        // `false` ignores its arguments and exits with status 1
        let fetcher = YtDlp::new("false", "en", 720);
        let err = fetcher.query_metadata("https://example.com/v").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VideoToolError>(),
            Some(VideoToolError::ProcessExit { .. })
        ));

        let err = fetcher
            .fetch_video("https://example.com/v", "/tmp/never-written.mp4")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VideoToolError>(),
            Some(VideoToolError::ProcessExit { .. })
        ));
    }

    /// Executable stand-in for yt-dlp that ignores its arguments
    #[cfg(unix)]
    fn fake_yt_dlp(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_undecodable_progress_still_waits_for_exit() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_yt_dlp(
            dir.path(),
            "printf 'download:\\377\\376 12%%\\n'\nprintf 'download: 100%%\\n'\nexit 0",
        );

        let fetcher = YtDlp::new(program, "en", 720);
        fetcher
            .fetch_video("https://example.com/v", "/tmp/never-written.mp4")
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_exit_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_yt_dlp(
            dir.path(),
            "echo 'download: 5%'\necho 'ERROR: Video unavailable' >&2\nexit 3",
        );

        let fetcher = YtDlp::new(program, "en", 720);
        let err = fetcher
            .fetch_video("https://example.com/v", "/tmp/never-written.mp4")
            .await
            .unwrap_err();
        match err.downcast_ref::<VideoToolError>() {
            Some(VideoToolError::ProcessExit { status, stderr, .. }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "ERROR: Video unavailable");
            }
            other => panic!("expected exit failure, got {other:?}"),
        }
    }
}
