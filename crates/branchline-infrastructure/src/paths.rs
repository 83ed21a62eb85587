//! Unified path management for branchline files.
//!
//! ```text
//! ~/.config/branchline/        # Config directory
//! ├── config.toml              # Application configuration
//! └── secret.json              # Session credentials
//!
//! ~/.local/share/branchline/   # Data directory
//! └── overlay.json             # Phantom overlay and bookmark store
//! ```

use std::path::{Path, PathBuf};

const APP_NAME: &str = "branchline";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for branchline_core::BranchlineError {
    fn from(e: PathError) -> Self {
        branchline_core::BranchlineError::config(e.to_string())
    }
}

pub struct BranchlinePaths;

impl BranchlinePaths {
    /// Returns the branchline configuration directory (e.g. `~/.config/branchline/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the branchline data directory (e.g. `~/.local/share/branchline/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// The file holds a session cookie; keep its permissions at 600.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the overlay store file, under `data_dir` if given.
    pub fn overlay_store_file(data_dir: Option<&Path>) -> Result<PathBuf, PathError> {
        let dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::data_dir()?,
        };
        Ok(dir.join("overlay.json"))
    }
}
