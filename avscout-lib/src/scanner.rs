//! Directory scanner for video collections.
//!
//! Walks a folder tree, resolves an identity for every video file, and groups
//! the files into [`Movie`]s. Groups that cannot be reconciled into one title
//! are kept in the report for the user to sort out by hand.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use avscout_core::{DiscoveredFile, Identity, IdentityParser, Movie, SliceError, order_slices};
use regex::Regex;
use serde::{Serialize, Serializer};
use walkdir::{DirEntry, WalkDir};

use crate::error::ScanError;
use crate::settings::ScannerSettings;

/// Walk filters derived from [`ScannerSettings`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    extensions: HashSet<String>,
    ignored_folders: Vec<Regex>,
    minimum_size: u64,
    skip_nfo_dir: bool,
}

impl ScanOptions {
    pub fn from_settings(settings: &ScannerSettings) -> Result<Self, ScanError> {
        let ignored_folders = settings
            .ignored_folders
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{})$", p)).map_err(|source| {
                    ScanError::InvalidFolderPattern {
                        pattern: p.clone(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            extensions: settings
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            ignored_folders,
            minimum_size: settings.minimum_size,
            skip_nfo_dir: settings.skip_nfo_dir,
        })
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    /// Whether the walk should skip this directory and everything below it.
    fn prunes(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || self.ignored_folders.iter().any(|re| re.is_match(&name)) {
            log::debug!("Skipping folder {}", entry.path().display());
            return true;
        }
        if self.skip_nfo_dir && contains_nfo(entry.path()) {
            log::debug!("Skipping organized folder {}", entry.path().display());
            return true;
        }
        false
    }
}

fn contains_nfo(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("nfo"))
            })
        })
        .unwrap_or(false)
}

/// Why a group of files sharing an identity was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmbiguityReason {
    /// Same identity in several folders
    SpansDirectories(Vec<PathBuf>),
    /// One folder, but the names are not a valid part sequence
    Slices(SliceError),
}

impl fmt::Display for AmbiguityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmbiguityReason::SpansDirectories(dirs) => {
                write!(f, "files are spread over {} folders", dirs.len())
            }
            AmbiguityReason::Slices(e) => write!(f, "{}", e),
        }
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// A rejected group, reported for manual resolution.
#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousGroup {
    pub key: String,
    pub files: Vec<DiscoveredFile>,
    #[serde(serialize_with = "serialize_display")]
    pub reason: AmbiguityReason,
}

/// Result of scanning one root.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    /// Accepted movies, ordered by key
    pub movies: Vec<Movie>,
    pub ambiguous: Vec<AmbiguousGroup>,
    /// Video files no identity could be derived for
    pub unidentified: Vec<PathBuf>,
    /// Small files that did not join any title
    pub skipped_small: Vec<PathBuf>,
}

impl ScanReport {
    /// `path` relative to the scan root, for display.
    pub fn relative(&self, path: &Path) -> PathBuf {
        pathdiff::diff_paths(path, &self.root).unwrap_or_else(|| path.to_path_buf())
    }

    pub fn is_clean(&self) -> bool {
        self.ambiguous.is_empty() && self.unidentified.is_empty()
    }

    /// Plain-text listing of every group and file that needs manual attention.
    pub fn ambiguity_report(&self) -> String {
        let mut out = String::new();
        for group in &self.ambiguous {
            out.push_str(&format!("{}: {}\n", group.key, group.reason));
            for file in &group.files {
                out.push_str(&format!("    {}\n", self.relative(&file.path).display()));
            }
        }
        if !self.unidentified.is_empty() {
            out.push_str("Could not identify:\n");
            for path in &self.unidentified {
                out.push_str(&format!("    {}\n", self.relative(path).display()));
            }
        }
        out
    }
}

/// Files collected for one key during the walk.
#[derive(Default)]
struct Bucket {
    regular: Vec<DiscoveredFile>,
    small: Vec<DiscoveredFile>,
}

pub struct Scanner {
    parser: IdentityParser,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(settings: &ScannerSettings) -> Result<Self, ScanError> {
        Ok(Self {
            parser: IdentityParser::new(&settings.ignored_id_patterns)?,
            options: ScanOptions::from_settings(settings)?,
        })
    }

    pub fn with_parts(parser: IdentityParser, options: ScanOptions) -> Self {
        Self { parser, options }
    }

    pub fn parser(&self) -> &IdentityParser {
        &self.parser
    }

    /// Scan `root` recursively.
    ///
    /// Unreadable entries below the root are logged and skipped. The result is
    /// fully determined by the tree contents.
    pub fn scan(&self, root: &Path) -> Result<ScanReport, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::MissingRoot(root.to_path_buf()));
        }

        let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
        let mut unidentified = Vec::new();
        let mut skipped_small = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.options.prunes(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(ScanError::Walk {
                        path: root.to_path_buf(),
                        source: e,
                    });
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file()
                || entry.file_name().to_string_lossy().starts_with('.')
                || !self.options.has_allowed_extension(path)
            {
                continue;
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    log::warn!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };
            let file = DiscoveredFile::new(path, size);
            let is_small = size < self.options.minimum_size;

            match self.parser.identity_key(path) {
                Some(key) => {
                    let bucket = buckets.entry(key).or_default();
                    if is_small {
                        bucket.small.push(file);
                    } else {
                        bucket.regular.push(file);
                    }
                }
                None if is_small => skipped_small.push(file.path),
                None => {
                    log::debug!("No identity for {}", path.display());
                    unidentified.push(file.path);
                }
            }
        }

        let mut movies = Vec::new();
        let mut ambiguous = Vec::new();

        for (key, bucket) in buckets {
            if bucket.regular.is_empty() {
                skipped_small.extend(bucket.small.into_iter().map(|f| f.path));
                continue;
            }

            let outcome = if bucket.small.is_empty() {
                reconcile(bucket.regular)
            } else {
                let mut combined = bucket.regular.clone();
                combined.extend(bucket.small.iter().cloned());
                match reconcile(combined) {
                    Ok(files) => Ok(files),
                    Err(_) => {
                        for small in &bucket.small {
                            log::debug!(
                                "{} does not fit with the other parts of {}",
                                small.path.display(),
                                key
                            );
                        }
                        skipped_small.extend(bucket.small.into_iter().map(|f| f.path));
                        reconcile(bucket.regular)
                    }
                }
            };

            match outcome {
                Ok(files) => {
                    let backup = files
                        .first()
                        .and_then(|f| self.parser.resolve_identity(&f.path));
                    if let Some(identity) = Identity::from_key(key, backup) {
                        movies.push(Movie::new(identity, files));
                    }
                }
                Err((files, reason)) => {
                    log::debug!("Ambiguous group {}: {}", key, reason);
                    ambiguous.push(AmbiguousGroup { key, files, reason });
                }
            }
        }

        skipped_small.sort();

        Ok(ScanReport {
            root: root.to_path_buf(),
            movies,
            ambiguous,
            unidentified,
            skipped_small,
        })
    }
}

/// Accept a same-identity group as one movie (files in part order) or reject it.
fn reconcile(
    files: Vec<DiscoveredFile>,
) -> Result<Vec<DiscoveredFile>, (Vec<DiscoveredFile>, AmbiguityReason)> {
    if files.len() < 2 {
        return Ok(files);
    }

    let dirs: BTreeSet<PathBuf> = files
        .iter()
        .filter_map(|f| f.path.parent().map(Path::to_path_buf))
        .collect();
    if dirs.len() > 1 {
        let reason = AmbiguityReason::SpansDirectories(dirs.into_iter().collect());
        return Err((files, reason));
    }

    let names: Vec<String> = files.iter().map(DiscoveredFile::file_name).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    match order_slices(&name_refs) {
        Ok(order) => {
            let mut slots: Vec<Option<DiscoveredFile>> = files.into_iter().map(Some).collect();
            Ok(order
                .order
                .iter()
                .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
                .collect())
        }
        Err(e) => Err((files, AmbiguityReason::Slices(e))),
    }
}

#[cfg(test)]
#[path = "tests/scanner_tests.rs"]
mod tests;
