//! Library configuration
//!
//! The downloads root is always passed in explicitly. When the caller has no
//! opinion, the platform data directory is used:
//! - Linux: ~/.local/share/offlineshelf/Downloads/
//! - macOS: ~/Library/Application Support/de.westhoffswelt.offlineshelf/Downloads/
//! - Windows: %APPDATA%\westhoffswelt\offlineshelf\data\Downloads\

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the downloads folder inside the application data directory
const DOWNLOADS_FOLDER: &str = "Downloads";

/// Errors that can occur while resolving the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine the platform data directory
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,

    /// Failed to create the downloads directory
    #[error("Failed to create downloads directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where downloaded media lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    downloads_root: PathBuf,
}

impl LibraryConfig {
    /// Uses the given directory as downloads root
    pub fn new(downloads_root: impl Into<PathBuf>) -> Self {
        Self {
            downloads_root: downloads_root.into(),
        }
    }

    /// Uses the platform's data directory for this application
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let proj_dirs = directories::ProjectDirs::from("de", "westhoffswelt", "offlineshelf")
            .ok_or(ConfigError::DataDirectoryNotFound)?;

        Ok(Self::new(proj_dirs.data_dir().join(DOWNLOADS_FOLDER)))
    }

    /// Picks the explicit root if one was given, the platform default otherwise
    pub fn resolve(downloads_root: Option<PathBuf>) -> Result<Self, ConfigError> {
        match downloads_root {
            Some(root) => Ok(Self::new(root)),
            None => Self::from_default_location(),
        }
    }

    pub fn downloads_root(&self) -> &Path {
        &self.downloads_root
    }

    /// Creates the downloads root if it does not exist yet
    pub fn ensure_root(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.downloads_root).map_err(|e| ConfigError::DirectoryCreationFailed {
            path: self.downloads_root.clone(),
            source: e,
        })
    }
}
