//! Catalog identifier extraction from file and folder names.
//!
//! A primary id (e.g. `ABC-123`, `FC2-1234567`) is found by an ordered cascade of
//! pattern rules. Rules are evaluated top to bottom against the upper-cased file stem
//! and the first one that matches wins; there is no backtracking into later rules
//! once a rule has produced an id.
//!
//! Cascade (version [`CASCADE_VERSION`]):
//!
//! 1. Series rules, keyed by a marker substring (`FC2`, `HEYDOUGA`, `GETCHU`, `GYUTTO`,
//!    `259LUXU`). A rule is only tried when its marker is present; when it finds no
//!    id, evaluation continues with the next step.
//! 2. The whole cascade once more on the stem with embedded site domains removed.
//! 3. [`GENERIC_RULES`], in order: abbreviated heydouga, MUGEN layouts, IBW, delimited
//!    codes, legacy unseparated tokyo-hot series, unseparated codes, TMA, n/k series,
//!    pure numeric codes.
//!
//! When the cascade finds nothing the name is retried with `)(` replaced by `-`, and
//! finally with the name of the parent folder (one level only).
//!
//! Content ids (lowercase vendor ids such as `abc00123`) use a separate, narrower
//! heuristic: see [`resolve_content_id`].

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Version of the rule order documented above. Bump it whenever a rule is added,
/// removed or moved, since that changes which id existing files resolve to.
pub const CASCADE_VERSION: u32 = 2;

/// Patterns removed from a file stem before any rule runs (resolution tags,
/// tracker domains and similar noise).
pub const DEFAULT_IGNORED_PATTERNS: &[&str] = &[
    r"(144|240|360|480|720|1080)[Pp]",
    r"[24][Kk]",
    r"\w+2048\.com",
    r"Carib(beancom)?",
    r"[^a-z\d](f?hd|lt)[^a-z\d]",
];

/// Coarse category of a title. Selects which ordered connector list applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Normal,
    Fc2,
    Getchu,
    Gyutto,
    Cid,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::Normal,
        Classification::Fc2,
        Classification::Getchu,
        Classification::Gyutto,
        Classification::Cid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Normal => "normal",
            Classification::Fc2 => "fc2",
            Classification::Getchu => "getchu",
            Classification::Gyutto => "gyutto",
            Classification::Cid => "cid",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Classification::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown classification '{}'", s))
    }
}

/// The resolved identity of one movie.
///
/// Exactly one of the two ids is authoritative: the content id for [`Classification::Cid`]
/// movies, the primary id otherwise. [`Identity::key`] returns the authoritative one and
/// is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    primary_id: Option<String>,
    content_id: Option<String>,
    classification: Classification,
}

impl Identity {
    /// Build an identity from a grouping key.
    ///
    /// `backup_primary` is only kept for content-id movies, where it serves as an
    /// alternative id when a source does not know the content id. Returns `None` for an
    /// empty key.
    pub fn from_key(key: impl Into<String>, backup_primary: Option<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() {
            return None;
        }
        let identity = match classify(&key) {
            Classification::Cid => Self {
                primary_id: backup_primary.filter(|p| !p.is_empty()),
                content_id: Some(key),
                classification: Classification::Cid,
            },
            classification => Self {
                primary_id: Some(key),
                content_id: None,
                classification,
            },
        };
        Some(identity)
    }

    /// The authoritative id.
    pub fn key(&self) -> &str {
        let id = match self.classification {
            Classification::Cid => self.content_id.as_deref(),
            _ => self.primary_id.as_deref(),
        };
        id.unwrap_or_default()
    }

    pub fn primary_id(&self) -> Option<&str> {
        self.primary_id.as_deref()
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.classification, self.primary_id.as_deref()) {
            (Classification::Cid, Some(primary)) => write!(f, "{} ({})", self.key(), primary),
            _ => f.write_str(self.key()),
        }
    }
}

// ── Rule tables ─────────────────────────────────────────────────────────────

/// How a matching rule turns its captures into an id.
#[derive(Debug, Clone, Copy)]
enum Template {
    /// One capture group, verbatim.
    Group(usize),
    /// Optional fixed prefix followed by capture groups, joined with `-`.
    Joined(&'static str, &'static [usize]),
}

/// One step of the cascade.
struct Rule {
    name: &'static str,
    pattern: &'static LazyLock<Regex>,
    template: Template,
}

impl Rule {
    fn apply(&self, norm: &str) -> Option<String> {
        let caps = self.pattern.captures(norm)?;
        match self.template {
            Template::Group(i) => Some(caps.get(i)?.as_str().to_string()),
            Template::Joined(prefix, groups) => {
                let mut parts: Vec<&str> = Vec::with_capacity(groups.len() + 1);
                if !prefix.is_empty() {
                    parts.push(prefix);
                }
                for &g in groups {
                    parts.push(caps.get(g)?.as_str());
                }
                Some(parts.join("-"))
            }
        }
    }
}

/// A series rule only runs (and runs exclusively) when its marker is in the name.
struct SeriesRule {
    marker: &'static str,
    rule: Rule,
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("static identity pattern"));
    };
}

pattern!(FC2, r"(?i)FC2[^A-Z\d]{0,5}(PPV[^A-Z\d]{0,5})?(\d{5,7})");
pattern!(HEYDOUGA, r"(?i)(HEYDOUGA)[-_]*(\d{4})[-_]0?(\d{3,5})");
pattern!(GETCHU, r"(?i)GETCHU[-_]*(\d+)");
pattern!(GYUTTO, r"(?i)GYUTTO-(\d+)");
pattern!(LUXU, r"(?i)259LUXU-(\d+)");

pattern!(DOMAIN, r"(?i)\w{3,10}\.(COM|NET|APP|XYZ)");

pattern!(HEY, r"(?i)HEY[-_]*(\d{4})[-_]0?(\d{3,5})");
pattern!(MUGEN_SERIAL, r"(?i)(MKB?D)[-_]*(S\d{2,3})");
pattern!(MUGEN_NUMBERED, r"(?i)(MK3D2DBD|S2M|S2MBD)[-_]*(\d{2,3})");
pattern!(IBW, r"(?i)(IBW)[-_](\d{2,5}z)");
pattern!(DELIMITED, r"(?i)([A-Z]{2,10})[-_](\d{2,5})");
pattern!(LEGACY_UNSEPARATED, r"(?i)(RED[01]\d\d|SKY[0-3]\d\d|EX00[01]\d)");
pattern!(UNSEPARATED, r"(?i)([A-Z]{2,})(\d{2,5})");
pattern!(TMA, r"(T[23]8[-_]\d{3})");
pattern!(N_K_SERIES, r"(N\d{4}|K\d{4})");
pattern!(NUMERIC, r"(\d{6}[-_]\d{2,3})");

static SERIES_RULES: [SeriesRule; 5] = [
    SeriesRule {
        marker: "FC2",
        rule: Rule {
            name: "fc2",
            pattern: &FC2,
            template: Template::Joined("FC2", &[2]),
        },
    },
    SeriesRule {
        marker: "HEYDOUGA",
        rule: Rule {
            name: "heydouga",
            pattern: &HEYDOUGA,
            template: Template::Joined("", &[1, 2, 3]),
        },
    },
    SeriesRule {
        marker: "GETCHU",
        rule: Rule {
            name: "getchu",
            pattern: &GETCHU,
            template: Template::Joined("GETCHU", &[1]),
        },
    },
    SeriesRule {
        marker: "GYUTTO",
        rule: Rule {
            name: "gyutto",
            pattern: &GYUTTO,
            template: Template::Joined("GYUTTO", &[1]),
        },
    },
    SeriesRule {
        marker: "259LUXU",
        rule: Rule {
            name: "259luxu",
            pattern: &LUXU,
            template: Template::Joined("259LUXU", &[1]),
        },
    },
];

/// Rules for names without a series marker, highest priority first.
///
/// Legacy unseparated series come before the generic unseparated rule and keep
/// narrow digit ranges so that ordinary words followed by digits are not taken
/// for them.
static GENERIC_RULES: [Rule; 10] = [
    Rule {
        name: "heydouga-abbreviated",
        pattern: &HEY,
        template: Template::Joined("HEYDOUGA", &[1, 2]),
    },
    Rule {
        name: "mugen-serial",
        pattern: &MUGEN_SERIAL,
        template: Template::Joined("", &[1, 2]),
    },
    Rule {
        name: "mugen-numbered",
        pattern: &MUGEN_NUMBERED,
        template: Template::Joined("", &[1, 2]),
    },
    Rule {
        name: "ibw",
        pattern: &IBW,
        template: Template::Joined("", &[1, 2]),
    },
    Rule {
        name: "delimited",
        pattern: &DELIMITED,
        template: Template::Joined("", &[1, 2]),
    },
    Rule {
        name: "legacy-unseparated",
        pattern: &LEGACY_UNSEPARATED,
        template: Template::Group(1),
    },
    Rule {
        name: "unseparated",
        pattern: &UNSEPARATED,
        template: Template::Joined("", &[1, 2]),
    },
    Rule {
        name: "tma",
        pattern: &TMA,
        template: Template::Group(1),
    },
    Rule {
        name: "n-k-series",
        pattern: &N_K_SERIES,
        template: Template::Group(1),
    },
    Rule {
        name: "numeric",
        pattern: &NUMERIC,
        template: Template::Group(1),
    },
];

/// Names of every cascade rule in evaluation order. The domain-stripped retry sits
/// between the series rules and the generic ones.
pub fn cascade_rules() -> Vec<&'static str> {
    SERIES_RULES
        .iter()
        .map(|s| s.rule.name)
        .chain(std::iter::once("domain-stripped-retry"))
        .chain(GENERIC_RULES.iter().map(|r| r.name))
        .collect()
}

/// Run the cascade against an already normalized (upper-cased) name.
fn run_cascade(norm: &str, strip_domains: bool) -> Option<String> {
    // A marker only selects a rule; a miss falls through to the rest of the cascade.
    let series = SERIES_RULES
        .iter()
        .filter(|s| norm.contains(s.marker))
        .find_map(|s| s.rule.apply(norm));
    if series.is_some() {
        return series;
    }

    if strip_domains {
        let stripped = DOMAIN.replace_all(norm, "");
        if stripped != norm {
            if let Some(id) = run_cascade(&stripped, false) {
                return Some(id);
            }
        }
    }

    GENERIC_RULES.iter().find_map(|rule| rule.apply(norm))
}

/// Lossy file stem of a path or bare name (`"ABC-123.mp4"` → `"ABC-123"`).
fn stem_of(path: &Path) -> Cow<'_, str> {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or(Cow::Borrowed(""))
}

// ── Parser ──────────────────────────────────────────────────────────────────

/// Primary-id resolver carrying the user's ignore patterns.
#[derive(Debug, Clone)]
pub struct IdentityParser {
    ignored: Option<Regex>,
}

impl Default for IdentityParser {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED_PATTERNS).expect("default ignore patterns are valid")
    }
}

impl IdentityParser {
    /// Build a parser. Each pattern is removed from the file stem before matching.
    pub fn new<S: AsRef<str>>(ignored_patterns: &[S]) -> Result<Self, IdentityError> {
        for pattern in ignored_patterns {
            Regex::new(pattern.as_ref()).map_err(|source| IdentityError::InvalidPattern {
                pattern: pattern.as_ref().to_string(),
                source,
            })?;
        }

        let ignored = if ignored_patterns.is_empty() {
            None
        } else {
            let joined = ignored_patterns
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join("|");
            Some(
                Regex::new(&joined).map_err(|source| IdentityError::InvalidPattern {
                    pattern: joined.clone(),
                    source,
                })?,
            )
        };

        Ok(Self { ignored })
    }

    /// Resolve the primary id of a file (or a bare name).
    ///
    /// Falls back to the parent folder's name, one level up, when the file name itself
    /// yields nothing. Returns `None` when no rule matches anywhere.
    pub fn resolve_identity(&self, path: &Path) -> Option<String> {
        if let Some(id) = self.resolve_name(&stem_of(path)) {
            return Some(id);
        }

        let parent = path.parent()?.file_name()?;
        self.resolve_name(&stem_of(Path::new(parent)))
    }

    /// The grouping key of a file: its content id when one resolves, otherwise its
    /// primary id.
    pub fn identity_key(&self, path: &Path) -> Option<String> {
        resolve_content_id(path).or_else(|| self.resolve_identity(path))
    }

    /// Full identity of a single file.
    pub fn identify(&self, path: &Path) -> Option<Identity> {
        let key = self.identity_key(path)?;
        Identity::from_key(key, self.resolve_identity(path))
    }

    fn resolve_name(&self, stem: &str) -> Option<String> {
        let cleaned = match &self.ignored {
            Some(re) => re.replace_all(stem, ""),
            None => Cow::Borrowed(stem),
        };
        let norm = cleaned.to_uppercase();

        if let Some(id) = run_cascade(&norm, true) {
            return Some(id);
        }

        if norm.contains(")(") {
            return run_cascade(&norm.replace(")(", "-"), true);
        }
        None
    }
}

// ── Content ids ─────────────────────────────────────────────────────────────

pattern!(SLICE_POSTFIX, r"([-_]\w|cd\d)$");
pattern!(CONTENT_ID_CHARS, r"^[a-z0-9_]+$");
pattern!(CONTENT_ID_PLAIN, r"^[a-z0-9]{7,19}$");

/// Known underscore layouts, most frequent first.
static CONTENT_ID_UNDERSCORED: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        r"^h_[0-9]{3,4}[a-z]{1,10}[0-9]{2,5}[a-z0-9]{0,8}$",
        r"^[0-9]{3}_[0-9]{4,5}$",
        r"^402[a-z]{3,6}[0-9]*_[a-z]{3,8}[0-9]{5,6}$",
        r"^h_[0-9]{3,4}wvr[0-9]\w[0-9]{4,5}[a-z0-9]{0,8}$",
    ]
    .map(|re| Regex::new(re).expect("static content id pattern"))
});

/// Resolve a vendor content id from a file name, e.g. `abc00123.mp4` → `abc00123`.
///
/// A trailing slice suffix (`-1`, `_a`, `cd2`) is dropped first. The rest must be
/// lowercase letters, digits and underscores only: either 7–19 alphanumerics, or one of
/// the known underscore layouts. Anything else yields `None`.
pub fn resolve_content_id(path: &Path) -> Option<String> {
    let stem = stem_of(path);
    let candidate = SLICE_POSTFIX.replace(&stem, "");

    if !CONTENT_ID_CHARS.is_match(&candidate) {
        return None;
    }

    let matched = if candidate.contains('_') {
        CONTENT_ID_UNDERSCORED.iter().any(|re| re.is_match(&candidate))
    } else {
        CONTENT_ID_PLAIN.is_match(&candidate)
    };

    matched.then(|| candidate.into_owned())
}

// ── Classification ──────────────────────────────────────────────────────────

pattern!(FC2_ID, r"(?i)^FC2-\d{5,7}$");
pattern!(GETCHU_ID, r"(?i)^GETCHU-\d+");
pattern!(GYUTTO_ID, r"(?i)^GYUTTO-\d+");
pattern!(
    UNCENSORED_ID,
    r"(?i)^(\d{6}[-_]\d{2,3}|N\d{4}|K\d{4}|RED[01]\d\d|SKY[0-3]\d\d|EX00[01]\d|HEYDOUGA-\d{4}-\d{3,5}|HEYZO[-_]?\d{4}|T[23]8[-_]\d{3})$"
);

/// Classify an id by its shape.
///
/// Fixed prefixes map to their series; an id that is its own content id is `Cid`;
/// everything else is `Normal`.
pub fn classify(id: &str) -> Classification {
    if FC2_ID.is_match(id) {
        Classification::Fc2
    } else if GETCHU_ID.is_match(id) {
        Classification::Getchu
    } else if GYUTTO_ID.is_match(id) {
        Classification::Gyutto
    } else if resolve_content_id(Path::new(id)).as_deref() == Some(id) {
        Classification::Cid
    } else {
        Classification::Normal
    }
}

/// Whether a title is known to be uncensored from its identity alone.
pub fn is_uncensored(identity: &Identity) -> bool {
    identity.classification() == Classification::Fc2 || UNCENSORED_ID.is_match(identity.key())
}

#[cfg(test)]
#[path = "tests/identity_tests.rs"]
mod tests;
