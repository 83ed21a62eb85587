//! Secret configuration file storage.
//!
//! Loads the session credentials from `~/.config/branchline/secret.json`.

use crate::paths::BranchlinePaths;
use branchline_core::BranchlineError;
use branchline_core::config::SecretConfig;
use std::fs;
use std::path::PathBuf;

/// Errors that can occur during secret storage operations.
#[derive(Debug)]
pub enum SecretStorageError {
    /// Secret file not found.
    NotFound(PathBuf),
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON parsing error.
    ParseError(serde_json::Error),
    /// Config directory not found.
    ConfigDirNotFound,
}

impl std::fmt::Display for SecretStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStorageError::NotFound(path) => {
                write!(f, "Secret file not found at: {}", path.display())
            }
            SecretStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            SecretStorageError::ParseError(e) => write!(f, "JSON parse error: {}", e),
            SecretStorageError::ConfigDirNotFound => {
                write!(f, "Could not determine home directory")
            }
        }
    }
}

impl std::error::Error for SecretStorageError {}

impl From<std::io::Error> for SecretStorageError {
    fn from(e: std::io::Error) -> Self {
        SecretStorageError::IoError(e)
    }
}

impl From<serde_json::Error> for SecretStorageError {
    fn from(e: serde_json::Error) -> Self {
        SecretStorageError::ParseError(e)
    }
}

impl From<SecretStorageError> for BranchlineError {
    fn from(e: SecretStorageError) -> Self {
        BranchlineError::config(e.to_string())
    }
}

/// Read-only access to `secret.json`.
///
/// # Security Note
///
/// The file is plaintext JSON; it should be readable by its owner only.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Storage at the default path (`~/.config/branchline/secret.json`).
    pub fn new() -> Result<Self, SecretStorageError> {
        let path = BranchlinePaths::secret_file().map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the secret configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(SecretConfig)`: Successfully loaded and parsed
    /// - `Err(SecretStorageError::NotFound)`: File doesn't exist
    /// - `Err(SecretStorageError::ParseError)`: Invalid JSON format
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Like [`load`](Self::load), but a missing file yields empty secrets.
    pub fn load_or_default(&self) -> Result<SecretConfig, SecretStorageError> {
        match self.load() {
            Err(SecretStorageError::NotFound(_)) => Ok(SecretConfig::default()),
            other => other,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
