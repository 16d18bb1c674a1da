//! Session configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_STORAGE_PATH: &str = ".jobboard/credentials.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to a value that could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_base_url: String,
    pub storage_path: PathBuf,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `JOBBOARD_API_BASE_URL`: backend base URL, trailing `/` trimmed
    /// - `JOBBOARD_STORAGE_PATH`: credential file, default `.jobboard/credentials.json`
    /// - `JOBBOARD_REQUEST_TIMEOUT_SECS`: default 30
    /// - `JOBBOARD_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is not a non-negative integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SessionConfig::from_env`] with a caller-supplied lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is not a non-negative integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = non_empty(lookup("JOBBOARD_API_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let storage_path = non_empty(lookup("JOBBOARD_STORAGE_PATH"))
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);
        let request_timeout_secs = parse_u64(
            "JOBBOARD_REQUEST_TIMEOUT_SECS",
            lookup("JOBBOARD_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let connect_timeout_secs = parse_u64(
            "JOBBOARD_CONNECT_TIMEOUT_SECS",
            lookup("JOBBOARD_CONNECT_TIMEOUT_SECS"),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;

        Ok(Self { api_base_url, storage_path, request_timeout_secs, connect_timeout_secs })
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_u64(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match non_empty(raw) {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
