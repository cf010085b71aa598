//! Store configuration
//!
//! One explicit struct replaces per-instance globals. Credentials are not part
//! of it: only the name of the environment variable that holds the token.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use tallybook_csv::QuoteMode;
use tallybook_remote::credentials::DEFAULT_TOKEN_ENV;
use tallybook_remote::github::{DEFAULT_API_BASE, DEFAULT_RAW_BASE};
use tallybook_remote::{DocumentLocation, EnvSecretProvider, GithubEndpoints};

use crate::error::{Result, StoreError};

/// How a cycle obtains content and revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    /// Raw content read, then a separate revision read.
    #[default]
    Split,
    /// One read returning both, so the revision always matches the content.
    Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// owner / repo / path / branch
    #[serde(flatten)]
    pub location: DocumentLocation,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_raw_base")]
    pub raw_base: String,

    /// Commit message prefix; a UTC timestamp is appended per write
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Total read-modify-write cycles per append; conflicts re-run the cycle
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub read_mode: ReadMode,

    #[serde(default)]
    pub quote_mode: QuoteMode,

    /// The two people an expense is split between
    #[serde(default = "default_parties")]
    pub parties: [String; 2],

    /// Environment variable holding the access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_raw_base() -> String {
    DEFAULT_RAW_BASE.to_string()
}

fn default_commit_message() -> String {
    "Update travel budget".to_string()
}

fn default_max_attempts() -> u32 {
    1
}

fn default_parties() -> [String; 2] {
    ["Dan".to_string(), "Tien".to_string()]
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

impl StoreConfig {
    pub fn new(location: DocumentLocation) -> Self {
        Self {
            location,
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            commit_message: default_commit_message(),
            max_attempts: default_max_attempts(),
            read_mode: ReadMode::default(),
            quote_mode: QuoteMode::default(),
            parties: default_parties(),
            token_env: default_token_env(),
            request_timeout_secs: None,
        }
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(content).map_err(|e| StoreError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.location
            .validate()
            .map_err(|e| StoreError::config(e.to_string()))?;
        if self.max_attempts == 0 {
            return Err(StoreError::config("max_attempts must be at least 1"));
        }
        if self.parties.iter().any(|p| p.trim().is_empty()) {
            return Err(StoreError::config("party names must not be empty"));
        }
        if self.parties[0] == self.parties[1] {
            return Err(StoreError::config("party names must differ"));
        }
        if self.token_env.trim().is_empty() {
            return Err(StoreError::config("token_env must not be empty"));
        }
        Ok(())
    }

    pub fn endpoints(&self) -> GithubEndpoints {
        GithubEndpoints {
            api_base: self.api_base.clone(),
            raw_base: self.raw_base.clone(),
        }
    }

    pub fn secret_provider(&self) -> EnvSecretProvider {
        EnvSecretProvider::new(&self.token_env)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
