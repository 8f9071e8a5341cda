//! Client configuration, loaded from the environment at startup.
//!
//! A `.env` file in the working directory is honoured outside of tests.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// A configuration value could not be understood.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Could not find home directory")]
    NoHomeDir,
}

/// What the client does when the service cannot satisfy a read or create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FallbackPolicy {
    /// Surface the error and show nothing.
    #[default]
    Strict,
    /// Fall back to the locally cached copy.
    Local,
}

impl FallbackPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Local => "local",
        }
    }

    pub const fn uses_cache(self) -> bool {
        matches!(self, Self::Local)
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "local" | "cache" => Ok(Self::Local),
            other => Err(format!("'{other}' is not one of strict, local")),
        }
    }
}

impl std::fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the client needs to know before it starts.
#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub fallback: FallbackPolicy,
    pub offline_reports: bool,
    pub request_timeout: Duration,
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("UNINOTER_BASE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "UNINOTER_BASE_URL".to_string(),
                format!("'{base_url}' is not an http(s) URL"),
            ));
        }

        let data_dir = match lookup("UNINOTER_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let fallback = lookup("UNINOTER_FALLBACK")
            .map(|raw| raw.parse::<FallbackPolicy>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue("UNINOTER_FALLBACK".to_string(), e))?
            .unwrap_or_default();

        let offline_reports = lookup("UNINOTER_OFFLINE_REPORTS")
            .map(|raw| parse_bool(&raw))
            .transpose()
            .map_err(|e| ConfigError::InvalidValue("UNINOTER_OFFLINE_REPORTS".to_string(), e))?
            .unwrap_or(true);

        let timeout_secs = lookup("UNINOTER_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "UNINOTER_TIMEOUT_SECS".to_string(),
                        format!("'{raw}' is not a number of seconds"),
                    )
                })
            })
            .transpose()?
            .unwrap_or(30);

        let log_filter = lookup("RUST_LOG").unwrap_or_else(|| "warn".to_string());

        Ok(Self {
            base_url,
            data_dir,
            fallback,
            offline_reports,
            request_timeout: Duration::from_secs(timeout_secs),
            log_filter,
        })
    }
}

/// `~/.uninoter`.
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    Ok(dirs::home_dir()
        .ok_or(ConfigError::NoHomeDir)?
        .join(".uninoter"))
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("'{other}' is not a boolean")),
    }
}
