use std::path::PathBuf;

use avscout_core::IdentityError;
use thiserror::Error;

/// Errors that stop a directory scan before it produces a report.
///
/// Problems with individual files never surface here; they end up in the
/// report's unidentified or ambiguous lists instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root is missing or not a directory
    #[error("Scan root is not a directory: {}", .0.display())]
    MissingRoot(PathBuf),

    /// The scan root itself could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// An ignored-folder pattern is not a valid regular expression
    #[error("Invalid ignored folder pattern '{pattern}': {source}")]
    InvalidFolderPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Errors reading or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file already exists and would be overwritten
    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),
}

impl SettingsError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
