use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, OptionExt, Result, eyre};
use serde::{Deserialize, Serialize};

use crate::spotify_rs::client::DEFAULT_API_BASE_URL;

const DEFAULT_LOOKBACK: &str = "1h";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the table store
    output_directory: String,
    /// SQLite file the joined history is archived into
    database: String,
    /// How far back each run queries the listening history, e.g. `1h`
    #[serde(default = "default_lookback")]
    lookback: String,
    #[serde(default)]
    otlp_endpoint: Option<String>,
    #[serde(default)]
    spotify: Option<SpotifyConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_lookback() -> String {
    DEFAULT_LOOKBACK.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_directory: "~/soundprint".to_string(),
            database: "~/soundprint/history.db".to_string(),
            lookback: default_lookback(),
            otlp_endpoint: None,
            spotify: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        // Surface a bad window at load time rather than mid-run.
        config.lookback()?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("soundprint").join("config.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or_eyre("No config directory found")?;

        Self::from_file(&config_path)
    }

    /// Write a default config file, leaving an existing one untouched
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::config_path().ok_or_eyre("No config directory found")?;
        if config_path.exists() {
            return Err(eyre!(
                "Config file already exists: {}",
                config_path.display()
            ));
        }
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }
        let contents = toml::to_string_pretty(&Config::default())
            .context("Failed to serialize default config")?;
        std::fs::write(&config_path, contents).context(format!(
            "Failed to write config file: {}",
            config_path.display()
        ))?;
        Ok(config_path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get expanded table store root
    pub fn output_directory_path(&self) -> PathBuf {
        self.expand_path(&self.output_directory)
    }

    /// Get expanded archive database path
    pub fn database_path(&self) -> PathBuf {
        self.expand_path(&self.database)
    }

    pub fn lookback(&self) -> Result<Duration> {
        humantime::parse_duration(&self.lookback)
            .context(format!("Invalid lookback window: {}", self.lookback))
    }

    pub fn otlp_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint.as_deref()
    }

    /// Get Spotify config or return defaults
    pub fn spotify_config(&self) -> SpotifyConfig {
        self.spotify.clone().unwrap_or_default()
    }

    /// Access token from the config, falling back to `SPOTIFY_ACCESS_TOKEN`
    pub fn spotify_access_token(&self) -> Result<String> {
        self.spotify
            .as_ref()
            .and_then(|spotify| spotify.access_token.clone())
            .filter(|token| !token.is_empty())
            .or_else(|| std::env::var("SPOTIFY_ACCESS_TOKEN").ok())
            .filter(|token| !token.is_empty())
            .ok_or_eyre(
                "No Spotify access token configured. Set spotify.access_token or SPOTIFY_ACCESS_TOKEN",
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            output_directory = "/data/soundprint"
            database = "/data/history.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_directory_path(), PathBuf::from("/data/soundprint"));
        assert_eq!(config.database_path(), PathBuf::from("/data/history.db"));
        assert_eq!(config.lookback().unwrap(), Duration::from_secs(3600));
        assert_eq!(config.otlp_endpoint(), None);
        assert_eq!(config.spotify_config(), SpotifyConfig::default());
        assert_eq!(config.spotify_config().request_timeout_secs, 10);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            output_directory = "out"
            database = "history.db"
            lookback = "90m"
            otlp_endpoint = "http://localhost:4317"

            [spotify]
            access_token = "token"
            api_base_url = "http://localhost:9000/v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.lookback().unwrap(), Duration::from_secs(5400));
        assert_eq!(config.otlp_endpoint(), Some("http://localhost:4317"));
        assert_eq!(config.spotify_access_token().unwrap(), "token");
        let spotify = config.spotify_config();
        assert_eq!(spotify.api_base_url, "http://localhost:9000/v1");
        assert_eq!(spotify.request_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_lookback_is_rejected() {
        let result = Config::from_toml(
            r#"
            output_directory = "out"
            database = "history.db"
            lookback = "an hour"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_home() {
        let config = Config::default();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.output_directory_path(), home.join("soundprint"));
        }
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let contents = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(Config::from_toml(&contents).unwrap(), Config::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "output_directory = \"o\"\ndatabase = \"d\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.database_path(), PathBuf::from("d"));
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
