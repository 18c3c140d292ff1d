const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Convert a byte count to mebibytes rounded to two decimals
pub fn bytes_to_mib(bytes: u64) -> f64 {
    let mib = bytes as f64 / BYTES_PER_MIB;
    (mib * 100.0).round() / 100.0
}

/// Check if the current environment has the required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path, "--version").await {
        missing.push(format!("{yt_dlp_path} - required for transcripts and downloads"));
    }

    // yt-dlp needs ffmpeg to merge separate video and audio streams
    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - recommended for merging video and audio streams".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use std::process::Stdio;
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .stdin(Stdio::null())
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
