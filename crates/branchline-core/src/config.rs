//! Configuration models.
//!
//! Loaded from `config.toml` (non-secret settings) and `secret.json`
//! (credentials) by the infrastructure layer. Every field has a default, so
//! a missing or partial file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://claude.ai";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BranchlineConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub fork: ForkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where and how to reach the remote conversation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Model used for forks when the caller names none
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            organization_id: None,
            default_model: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Timing of the fork pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkConfig {
    /// Wait after the seeding turn finished, before the caller navigates
    #[serde(default = "default_settle_grace_ms")]
    pub settle_grace_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting for the seeding turn after this long
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Store the forked history as phantoms of the new conversation
    #[serde(default = "default_true")]
    pub seed_phantom_history: bool,
}

fn default_settle_grace_ms() -> u64 {
    2_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_poll_timeout_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self {
            settle_grace_ms: default_settle_grace_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            seed_phantom_history: true,
        }
    }
}

impl ForkConfig {
    pub fn settle_grace(&self) -> Duration {
        Duration::from_millis(self.settle_grace_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the local overlay store (platform data dir if unset)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Credentials, read from `secret.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SecretConfig {
    /// Session cookie value used to authenticate against the remote service
    #[serde(default)]
    pub session_key: Option<String>,
}
