//! Platform directory resolution.
//!
//! Config and log locations follow OS conventions (XDG on Linux, Known Folders
//! on Windows, Library on macOS). A `--config` override replaces the config
//! directory only.

use std::path::{Path, PathBuf};
use std::{fmt, io};

/// Errors that can occur during platform operations.
#[derive(Debug)]
pub enum PlatformError {
    /// The OS did not provide a configuration directory.
    NoConfigDir,
    /// An I/O error occurred (e.g., directory creation failed).
    Io(io::Error),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConfigDir => write!(f, "could not determine OS configuration directory"),
            Self::Io(e) => write!(f, "platform I/O error: {e}"),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PlatformError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Directories used by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Holds the JSON log file in debug builds.
    pub log_dir: PathBuf,
}

const APP_NAME: &str = "riftlink";

impl PlatformDirs {
    /// Resolve OS directories, honouring an explicit config directory.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoConfigDir`] if no override is given and the
    /// OS does not expose a configuration directory.
    pub fn resolve(config_override: Option<&Path>) -> Result<Self, PlatformError> {
        let app_dir = match dirs::config_dir() {
            Some(base) => base.join(APP_NAME),
            None => match config_override {
                Some(dir) => dir.to_path_buf(),
                None => return Err(PlatformError::NoConfigDir),
            },
        };

        let log_dir = dirs::data_local_dir()
            .map(|base| base.join(APP_NAME))
            .unwrap_or_else(|| app_dir.clone())
            .join("logs");

        Ok(Self {
            config_dir: config_override.map_or(app_dir, Path::to_path_buf),
            log_dir,
        })
    }

    /// Resolve directories rooted under a custom base path.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Create all directories on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Io`] if any directory cannot be created.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
