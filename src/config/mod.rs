// Configuration management for mopibot
// Optional TOML file first, environment on top, then a validation pass that
// refuses to start without Slack credentials

use crate::chat::slack::DEFAULT_API_BASE;
use crate::player::mopidy::DEFAULT_MOPIDY_URL;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_ANNOUNCE_CHANNEL: &str = "CGNU86GG7";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub slack: SlackConfig,
    pub mopidy: MopidyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub bot_token: Option<String>,
    pub app_token: Option<String>,
    pub api_base: String,
    pub announce_channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MopidyConfig {
    pub url: String,
}

/// Tokens that passed validation - both are required for Socket Mode
#[derive(Debug, Clone, PartialEq)]
pub struct SlackCredentials {
    pub bot_token: String,
    pub app_token: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing Slack credentials: set {0} in the environment or config file")]
    MissingCredentials(&'static str),
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            app_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            announce_channel: DEFAULT_ANNOUNCE_CHANNEL.to_string(),
        }
    }
}

impl Default for MopidyConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MOPIDY_URL.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slack: SlackConfig::default(),
            mopidy: MopidyConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path` (or the default location), then apply the process environment.
    ///
    /// A missing file is fine - everything can come from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay environment values. `TOKEN` wins over `SLACK_TOKEN`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("TOKEN").or_else(|| non_empty("SLACK_TOKEN")) {
            self.slack.bot_token = Some(token);
        }
        if let Some(token) = non_empty("SLACK_APP_TOKEN") {
            self.slack.app_token = Some(token);
        }
        if let Some(base) = non_empty("SLACK_API_BASE") {
            self.slack.api_base = base;
        }
        if let Some(channel) = non_empty("ANNOUNCE_CHANNEL") {
            self.slack.announce_channel = channel;
        }
        if let Some(url) = non_empty("MOPIDY_URL") {
            self.mopidy.url = url;
        }
    }

    pub fn credentials(&self) -> Result<SlackCredentials, ConfigError> {
        let bot_token = self
            .slack
            .bot_token
            .clone()
            .ok_or(ConfigError::MissingCredentials("TOKEN (or SLACK_TOKEN)"))?;
        let app_token = self
            .slack
            .app_token
            .clone()
            .ok_or(ConfigError::MissingCredentials("SLACK_APP_TOKEN"))?;
        Ok(SlackCredentials {
            bot_token,
            app_token,
        })
    }

    fn default_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("mopibot").join("config.toml"))
    }
}
