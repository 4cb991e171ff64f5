use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE: &str = ".daily-summary.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .daily-summary.toml.
/// Every field is optional; missing credentials only fail when the
/// source that needs them is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub linear: LinearConfig,

    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinearConfig {
    /// Linear API key. Falls back to LINEAR_API_TOKEN.
    pub api_token: Option<String>,
    /// GraphQL endpoint. Falls back to LINEAR_BASE_URL.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. Falls back to GITHUB_TOKEN.
    pub api_token: Option<String>,
}

impl Config {
    /// Load configuration from .daily-summary.toml in the current directory,
    /// or from `path` when given. A missing default file yields the default
    /// config; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset values from the environment. File values take precedence.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.linear.api_token.is_none() {
            self.linear.api_token = lookup("LINEAR_API_TOKEN");
        }
        if self.linear.base_url.is_none() {
            self.linear.base_url = lookup("LINEAR_BASE_URL");
        }
        if self.github.api_token.is_none() {
            self.github.api_token = lookup("GITHUB_TOKEN");
        }
    }
}
