//! Scanned movies: a resolved identity and the files that make it up.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::identity::{Classification, Identity};

/// A video file found on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
}

impl DiscoveredFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// File name as text (lossy), or an empty string for a bare root.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One accepted title.
///
/// `files` is in part order (part 1 first) and cannot be reordered after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    identity: Identity,
    files: Vec<DiscoveredFile>,
}

impl Movie {
    pub fn new(identity: Identity, files: Vec<DiscoveredFile>) -> Self {
        Self { identity, files }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn key(&self) -> &str {
        self.identity.key()
    }

    pub fn classification(&self) -> Classification {
        self.identity.classification()
    }

    pub fn files(&self) -> &[DiscoveredFile] {
        &self.files
    }

    pub fn is_multi_part(&self) -> bool {
        self.files.len() > 1
    }

    /// Folder holding the movie's files.
    pub fn directory(&self) -> Option<&Path> {
        self.files.first()?.path.parent()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}
