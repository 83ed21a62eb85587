//! Configuration service.
//!
//! Loads `config.toml` and `secret.json`, fills gaps from the environment,
//! and caches the result.

use crate::paths::BranchlinePaths;
use crate::storage::SecretStorage;
use branchline_core::config::{BranchlineConfig, DEFAULT_BASE_URL, SecretConfig};
use branchline_core::{BranchlineError, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

pub const ENV_SESSION_KEY: &str = "BRANCHLINE_SESSION_KEY";
pub const ENV_ORGANIZATION_ID: &str = "BRANCHLINE_ORG_ID";
pub const ENV_BASE_URL: &str = "BRANCHLINE_BASE_URL";

/// Settings and credentials after all sources have been merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedConfig {
    pub config: BranchlineConfig,
    pub secrets: SecretConfig,
}

impl ResolvedConfig {
    /// Fills settings the files left unset from `lookup` (normally the
    /// process environment). File values always take priority.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.secrets.session_key.is_none() {
            self.secrets.session_key = lookup(ENV_SESSION_KEY);
        }
        if self.config.remote.organization_id.is_none() {
            self.config.remote.organization_id = lookup(ENV_ORGANIZATION_ID);
        }
        if self.config.remote.base_url == DEFAULT_BASE_URL
            && let Some(base_url) = lookup(ENV_BASE_URL)
        {
            self.config.remote.base_url = base_url;
        }
        self
    }

    pub fn organization_id(&self) -> Result<&str> {
        self.config.remote.organization_id.as_deref().ok_or_else(|| {
            BranchlineError::config(format!(
                "organization_id is not set (config.toml [remote] or {ENV_ORGANIZATION_ID})"
            ))
        })
    }

    pub fn session_key(&self) -> Result<&str> {
        self.secrets.session_key.as_deref().ok_or_else(|| {
            BranchlineError::config(format!(
                "session_key is not set (secret.json or {ENV_SESSION_KEY})"
            ))
        })
    }

    pub fn overlay_store_file(&self) -> Result<PathBuf> {
        Ok(BranchlinePaths::overlay_store_file(
            self.config.storage.data_dir.as_deref(),
        )?)
    }
}

/// Loads and caches the resolved configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    config_path: PathBuf,
    secret_path: PathBuf,
    cached: Arc<RwLock<Option<ResolvedConfig>>>,
}

impl ConfigService {
    /// Service reading from the platform config directory.
    pub fn new() -> Result<Self> {
        Ok(Self::with_paths(
            BranchlinePaths::config_file()?,
            BranchlinePaths::secret_file()?,
        ))
    }

    pub fn with_paths(config_path: PathBuf, secret_path: PathBuf) -> Self {
        Self {
            config_path,
            secret_path,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the resolved configuration, loading it on first access.
    pub fn get_config(&self) -> Result<ResolvedConfig> {
        if let Some(cached) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let loaded = self.load()?.apply_env(|key| std::env::var(key).ok());
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Reads both files without consulting the environment.
    pub fn load(&self) -> Result<ResolvedConfig> {
        let config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            BranchlineConfig::default()
        };

        let secrets = SecretStorage::with_path(self.secret_path.clone()).load_or_default()?;

        Ok(ResolvedConfig { config, secrets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ConfigService {
        ConfigService::with_paths(dir.path().join("config.toml"), dir.path().join("secret.json"))
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let resolved = service(&temp_dir).load().unwrap();

        assert_eq!(resolved, ResolvedConfig::default());
        assert!(resolved.organization_id().unwrap_err().to_string().contains("organization_id"));
        assert!(resolved.session_key().is_err());
    }

    #[test]
    fn test_loads_both_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            "[remote]\norganization_id = \"org-1\"\n\n[storage]\ndata_dir = \"/var/bl\"\n",
        )
        .unwrap();
        fs::write(temp_dir.path().join("secret.json"), r#"{"session_key":"sk"}"#).unwrap();

        let resolved = service(&temp_dir).get_config().unwrap();
        assert_eq!(resolved.organization_id().unwrap(), "org-1");
        assert_eq!(resolved.session_key().unwrap(), "sk");
        assert_eq!(
            resolved.overlay_store_file().unwrap(),
            PathBuf::from("/var/bl/overlay.json")
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("config.toml"), "[remote\n").unwrap();

        let err = service(&temp_dir).load().unwrap_err();
        assert!(matches!(err, BranchlineError::Serialization { .. }));
    }

    #[test]
    fn test_env_fills_only_gaps() {
        let env: HashMap<&str, &str> = [
            (ENV_SESSION_KEY, "env-key"),
            (ENV_ORGANIZATION_ID, "env-org"),
            (ENV_BASE_URL, "http://localhost:8080"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let resolved = ResolvedConfig::default().apply_env(lookup);
        assert_eq!(resolved.session_key().unwrap(), "env-key");
        assert_eq!(resolved.organization_id().unwrap(), "env-org");
        assert_eq!(resolved.config.remote.base_url, "http://localhost:8080");

        let mut from_files = ResolvedConfig::default();
        from_files.secrets.session_key = Some("file-key".into());
        from_files.config.remote.organization_id = Some("file-org".into());
        from_files.config.remote.base_url = "https://example.test".into();

        let resolved = from_files.apply_env(lookup);
        assert_eq!(resolved.session_key().unwrap(), "file-key");
        assert_eq!(resolved.organization_id().unwrap(), "file-org");
        assert_eq!(resolved.config.remote.base_url, "https://example.test");
    }

    #[test]
    fn test_cache_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "[fork]\nsettle_grace_ms = 1\n").unwrap();
        assert_eq!(service.get_config().unwrap().config.fork.settle_grace_ms, 1);

        fs::write(&config_path, "[fork]\nsettle_grace_ms = 2\n").unwrap();
        assert_eq!(service.get_config().unwrap().config.fork.settle_grace_ms, 1);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().config.fork.settle_grace_ms, 2);
    }
}
