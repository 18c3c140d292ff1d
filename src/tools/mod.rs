use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::download::VideoDownloader;
use crate::fetcher::VideoFetcher;
use crate::transcript::TranscriptExtractor;
use crate::VideoToolError;

pub const TRANSCRIPT_TOOL: &str = "get_video_transcript";

/// Older name of the transcript tool, still accepted on calls
pub const TRANSCRIPT_TOOL_ALIAS: &str = "transcript_youtube_url";

pub const DOWNLOAD_TOOL: &str = "download_video";

/// A validated tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    Transcript { url: String },
    Download { url: String, filename: Option<String> },
}

#[derive(Debug, Deserialize)]
struct TranscriptArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct DownloadArgs {
    url: String,
    #[serde(default)]
    filename: Option<String>,
}

impl ToolRequest {
    /// Build a request from a tool name and its argument bag
    pub fn from_call(name: &str, arguments: Option<Map<String, Value>>) -> Result<Self, VideoToolError> {
        let arguments = Value::Object(arguments.unwrap_or_default());

        match name {
            TRANSCRIPT_TOOL | TRANSCRIPT_TOOL_ALIAS => {
                let args: TranscriptArgs = parse_args(name, arguments)?;
                Ok(Self::Transcript { url: args.url })
            }
            DOWNLOAD_TOOL => {
                let args: DownloadArgs = parse_args(name, arguments)?;
                Ok(Self::Download {
                    url: args.url,
                    filename: args.filename.filter(|f| !f.is_empty()),
                })
            }
            other => Err(VideoToolError::InvalidRequest(format!("Unknown tool: {other}"))),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Transcript { url } | Self::Download { url, .. } => url,
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, VideoToolError> {
    serde_json::from_value(arguments)
        .map_err(|e| VideoToolError::InvalidRequest(format!("Invalid arguments for {tool}: {e}")))
}

/// One block of tool output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Outcome of a tool call: a single text blob, flagged when the call failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(message)],
            is_error: Some(true),
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// Concatenated text of every content block
    pub fn text(&self) -> String {
        self.content.iter().map(|c| c.text.as_str()).collect()
    }
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Tool catalog entry advertised to the host
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Every tool this server advertises
pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: TRANSCRIPT_TOOL,
            description: "Fetch the English subtitles of a video and return them as deduplicated plain text",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "URL of the video"
                    }
                },
                "required": ["url"]
            }),
        },
        ToolDefinition {
            name: DOWNLOAD_TOOL,
            description: "Download a video to the server's downloads directory and report its title, duration, resolution and size",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "URL of the video"
                    },
                    "filename": {
                        "type": "string",
                        "description": "File name without extension; defaults to the video title"
                    }
                },
                "required": ["url"]
            }),
        },
    ]
}

/// Routes tool requests to their handlers and turns every error into a failure result
pub struct ToolDispatcher {
    transcripts: TranscriptExtractor,
    downloads: VideoDownloader,
}

impl ToolDispatcher {
    pub fn new(fetcher: Arc<dyn VideoFetcher>, downloads_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            transcripts: TranscriptExtractor::new(fetcher.clone()),
            downloads: VideoDownloader::new(fetcher, downloads_dir),
        }
    }

    /// Run a request to completion. Never fails; errors come back as `isError` results.
    pub async fn call(&self, request: ToolRequest) -> ToolResult {
        let outcome = match &request {
            ToolRequest::Transcript { url } => self.transcripts.extract(url).await,
            ToolRequest::Download { url, filename } => self
                .downloads
                .download(url, filename.as_deref())
                .await
                .map(|summary| summary.to_string()),
        };

        match outcome {
            Ok(text) => ToolResult::success(text),
            Err(e) => {
                tracing::warn!("Tool call for {} failed: {:#}", request.url(), e);
                ToolResult::failure(format!("Error: {e:#}"))
            }
        }
    }
}
