//! User settings (`~/.config/avscout/config.toml`).
//!
//! Every field has a default, so a missing or empty file yields a working
//! configuration. The file only needs the values a user wants to change.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use avscout_core::identity::DEFAULT_IGNORED_PATTERNS;
use avscout_core::util::parse_size;
use avscout_core::{Classification, Field};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::SettingsError;

/// Canonical path to the settings file: `~/.config/avscout/config.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("avscout").join("config.toml")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scanner: ScannerSettings,
    pub sources: SourceSettings,
    pub network: NetworkSettings,
    /// Declarative JSON sources, keyed by connector id
    pub connectors: BTreeMap<String, ConnectorSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Regexes removed from file names before id matching
    pub ignored_id_patterns: Vec<String>,
    /// Allowed video extensions, without the dot
    pub extensions: Vec<String>,
    /// Folder names (regexes, full match) never descended into
    pub ignored_folders: Vec<String>,
    /// Files below this size only count as parts of a larger title.
    /// Accepts a byte count or a string such as `"232MiB"`.
    #[serde(deserialize_with = "deserialize_size")]
    pub minimum_size: u64,
    /// Skip folders that already contain an `.nfo` file
    pub skip_nfo_dir: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            ignored_id_patterns: DEFAULT_IGNORED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            extensions: [
                "3gp", "avi", "f4v", "flv", "iso", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg",
                "mpg", "rm", "rmvb", "strm", "ts", "vob", "webm", "wmv",
            ]
            .iter()
            .map(|e| e.to_string())
            .collect(),
            ignored_folders: [r"\$RECYCLE\.BIN", "#recycle", "@eaDir", "lost\\+found"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            minimum_size: 232 * 1024 * 1024,
            skip_nfo_dir: false,
        }
    }
}

/// Which connectors run for each classification, and when to stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub normal: Vec<String>,
    pub fc2: Vec<String>,
    pub getchu: Vec<String>,
    pub gyutto: Vec<String>,
    pub cid: Vec<String>,
    /// Aggregation stops early once all of these are filled. Derived fields are
    /// rejected since no connector supplies them.
    #[serde(deserialize_with = "deserialize_required_fields")]
    pub required_fields: BTreeSet<Field>,
    /// Let connectors spend extra requests on richer fields
    pub hardworking: bool,
    /// Pause between two connector attempts for the same movie
    pub attempt_delay_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            normal: Vec::new(),
            fc2: Vec::new(),
            getchu: Vec::new(),
            gyutto: Vec::new(),
            cid: Vec::new(),
            required_fields: [Field::Cover, Field::Title].into_iter().collect(),
            hardworking: false,
            attempt_delay_ms: 0,
        }
    }
}

impl SourceSettings {
    /// Ordered connector ids for one classification.
    pub fn for_classification(&self, classification: Classification) -> &[String] {
        match classification {
            Classification::Normal => &self.normal,
            Classification::Fc2 => &self.fc2,
            Classification::Getchu => &self.getchu,
            Classification::Gyutto => &self.gyutto,
            Classification::Cid => &self.cid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Per-request timeout for connector fetches
    pub timeout_secs: u64,
    /// Extra attempts after a timeout or connection failure
    pub retry: u32,
    /// Timeout of a single mirror reachability probe
    pub probe_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub user_agent: String,
    /// Mirror candidates keyed by site id
    pub mirrors: BTreeMap<String, MirrorSettings>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            retry: 3,
            probe_timeout_secs: 5,
            proxy: None,
            user_agent: concat!("avscout/", env!("CARGO_PKG_VERSION")).to_string(),
            mirrors: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    /// Tried alone first; the candidates are only probed when it is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
    /// Probed together; the first reachable one in this order wins
    pub candidates: Vec<String>,
}

/// A data source backed by a JSON HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSettings {
    /// Default base URL, used when no mirror is reachable
    pub url: String,
    /// Lookup path; `{id}` is replaced by the movie's id
    pub path: String,
    /// Extra document fetched in hardworking mode; `{id}` is replaced as well
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_path: Option<String>,
    /// Environment variable holding an API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
}

fn default_api_key_header() -> String {
    "X-Api-Key".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Bytes(u64),
    Text(String),
}

fn deserialize_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Bytes(n) => Ok(n),
        SizeRepr::Text(s) => {
            parse_size(&s).ok_or_else(|| de::Error::custom(format!("invalid size '{}'", s)))
        }
    }
}

fn deserialize_required_fields<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeSet<Field>, D::Error> {
    let fields = BTreeSet::<Field>::deserialize(deserializer)?;
    match fields.iter().find(|f| f.is_derived()) {
        Some(field) => Err(de::Error::custom(format!(
            "'{}' is derived after aggregation and cannot be required",
            field
        ))),
        None => Ok(fields),
    }
}

/// Commented template written by `avscout config init`. Parses to the defaults.
pub const DEFAULT_CONFIG: &str = r##"# avscout configuration

[scanner]
# ignored_id_patterns = ['(144|240|360|480|720|1080)[Pp]', '[24][Kk]']
# extensions = ["mp4", "mkv", "avi", "wmv"]
# ignored_folders = ['\$RECYCLE\.BIN', "#recycle"]
# minimum_size = "232MiB"
# skip_nfo_dir = false

[sources]
# Connector ids tried in order for each classification
# normal = ["example"]
# fc2 = []
# getchu = []
# gyutto = []
# cid = []
# required_fields = ["cover", "title"]
# hardworking = false
# attempt_delay_ms = 0

[network]
# timeout_secs = 10
# retry = 3
# probe_timeout_secs = 5
# proxy = "socks5://127.0.0.1:1080"

# [network.mirrors.example]
# preferred = "https://example.org"
# candidates = ["https://mirror1.example.org", "https://mirror2.example.org"]

# [connectors.example]
# url = "https://example.org"
# path = "/api/movies/{id}"
# detail_path = "/api/movies/{id}/detail"
# api_key_env = "EXAMPLE_API_KEY"
# api_key_header = "X-Api-Key"
"##;

impl Settings {
    /// Load settings from `path`, or from [`settings_path`] when `None`.
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(SettingsError::read(path, e)),
        };
        Self::parse(&contents).map_err(|source| SettingsError::Parse { path, source })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write [`DEFAULT_CONFIG`] to `path`, refusing to overwrite an existing file.
    pub fn write_default(path: &Path) -> Result<(), SettingsError> {
        if path.exists() {
            return Err(SettingsError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::write(parent, e))?;
        }
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, DEFAULT_CONFIG).map_err(|e| SettingsError::write(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| SettingsError::write(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
