use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the persistent downloads directory
pub const DOWNLOADS_DIR_ENV: &str = "DOWNLOADS_DIR";

/// Configuration file name, looked up in the working directory first
const LOCAL_CONFIG: &str = "config.yaml";

/// Default vertical resolution ceiling for downloads
pub const DEFAULT_MAX_HEIGHT: u32 = 720;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Persistent directory downloaded videos are written to
    pub downloads_dir: PathBuf,

    /// yt-dlp program name or path
    pub yt_dlp_path: String,

    /// Subtitle language requested for transcripts
    pub subtitle_language: String,

    /// Resolution ceiling for downloads
    pub max_height: u32,
}

/// Values given on the command line or through the environment; these win over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub downloads_dir: Option<PathBuf>,
    pub yt_dlp_path: Option<String>,
    pub max_height: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            yt_dlp_path: "yt-dlp".to_string(),
            subtitle_language: "en".to_string(),
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

/// `downloads` under the current working directory
fn default_downloads_dir() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("downloads")
}

impl Config {
    /// Load configuration from file if present, then apply overrides
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let mut config = Self::from_files(Path::new(LOCAL_CONFIG), Self::user_config_path())?;

        config.apply(overrides);
        config.validate()?;

        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Parse a YAML configuration file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.downloads_dir {
            self.downloads_dir = dir;
        }
        if let Some(path) = overrides.yt_dlp_path {
            self.yt_dlp_path = path;
        }
        if let Some(height) = overrides.max_height {
            self.max_height = height;
        }
    }

    /// Read the working-directory file, falling back to the user file, then defaults.
    ///
    /// The host decides our working directory, so a `config.yaml` there may belong to
    /// something else; one that does not parse is logged and skipped. A broken user
    /// config file is still an error.
    fn from_files(local: &Path, user: Option<PathBuf>) -> Result<Self> {
        if local.exists() {
            match Self::from_file(local) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!("Ignoring {}: {:#}", local.display(), e),
            }
        }

        match user {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Per-user configuration file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("video-tools-mcp").join(LOCAL_CONFIG))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("yt-dlp path must not be empty");
        }

        if self.subtitle_language.trim().is_empty() {
            anyhow::bail!("Subtitle language must not be empty");
        }

        if self.max_height == 0 {
            anyhow::bail!("Maximum video height must be greater than zero");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Downloads Dir: {}", self.downloads_dir.display());
        println!("  yt-dlp: {}", self.yt_dlp_path);
        println!("  Subtitle Language: {}", self.subtitle_language);
        println!("  Max Height: {}p", self.max_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_downloads_dir_is_under_cwd() {
        let config = Config::default();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(config.downloads_dir, cwd.join("downloads"));
        assert_eq!(config.max_height, DEFAULT_MAX_HEIGHT);
        assert_eq!(config.subtitle_language, "en");
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.apply(ConfigOverrides {
            downloads_dir: Some(PathBuf::from("/srv/videos")),
            yt_dlp_path: Some("/opt/bin/yt-dlp".to_string()),
            max_height: Some(1080),
        });
        assert_eq!(config.downloads_dir, PathBuf::from("/srv/videos"));
        assert_eq!(config.yt_dlp_path, "/opt/bin/yt-dlp");
        assert_eq!(config.max_height, 1080);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "downloads_dir: /data/videos\nmax_height: 480\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.downloads_dir, PathBuf::from("/data/videos"));
        assert_eq!(config.max_height, 480);
        assert_eq!(config.yt_dlp_path, "yt-dlp");
    }

    #[test]
    fn test_unparseable_local_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("config.yaml");
        let user = dir.path().join("user.yaml");
        fs_err::write(&user, "max_height: 1080\n").unwrap();

        fs_err::write(&local, "- just\n- a list\n").unwrap();
        let config = Config::from_files(&local, Some(user.clone())).unwrap();
        assert_eq!(config.max_height, 1080);

        fs_err::write(&local, "max_height: \"abc\"\n").unwrap();
        let config = Config::from_files(&local, None).unwrap();
        assert_eq!(config.max_height, DEFAULT_MAX_HEIGHT);
    }

    #[test]
    fn test_local_file_wins_over_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("config.yaml");
        let user = dir.path().join("user.yaml");
        fs_err::write(&local, "max_height: 480\n").unwrap();
        fs_err::write(&user, "max_height: 1080\n").unwrap();

        let config = Config::from_files(&local, Some(user)).unwrap();
        assert_eq!(config.max_height, 480);
    }

    #[test]
    fn test_broken_user_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.yaml");
        fs_err::write(&user, "max_height: [1, 2]\n").unwrap();

        assert!(Config::from_files(&dir.path().join("missing.yaml"), Some(user)).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_height() {
        let config = Config {
            max_height: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
