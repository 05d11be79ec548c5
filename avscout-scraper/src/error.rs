use std::fmt;

use serde::Serialize;

/// Remediation shown when a site refuses access.
pub const BLOCKED_HINT: &str = "try a different network region or configure a proxy";

/// Failures raised by a connector while creating itself or filling a record.
///
/// All of them are local to one source: the orchestrator records the failure
/// and moves on to the next connector.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("{site}: no record for {id}")]
    NotFound { site: String, id: String },

    #[error("{site}: {count} equally good matches for {id}")]
    Duplicate {
        site: String,
        id: String,
        count: usize,
    },

    #[error("{site}: access blocked, {hint}")]
    Blocked { site: String, hint: String },

    #[error("{site}: missing or rejected credentials ({detail})")]
    Credential { site: String, detail: String },

    #[error("{site}: {message}")]
    Site { site: String, message: String },

    #[error("{site}: network failure after {attempts} attempt(s): {message}")]
    Transport {
        site: String,
        attempts: u32,
        message: String,
    },
}

impl ConnectorError {
    pub fn not_found(site: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            site: site.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(site: impl Into<String>, id: impl Into<String>, count: usize) -> Self {
        Self::Duplicate {
            site: site.into(),
            id: id.into(),
            count,
        }
    }

    pub fn blocked(site: impl Into<String>) -> Self {
        Self::Blocked {
            site: site.into(),
            hint: BLOCKED_HINT.to_string(),
        }
    }

    pub fn credential(site: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Credential {
            site: site.into(),
            detail: detail.into(),
        }
    }

    pub fn site(site: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Site {
            site: site.into(),
            message: message.into(),
        }
    }

    /// Site id the failure came from.
    pub fn site_id(&self) -> &str {
        match self {
            Self::NotFound { site, .. }
            | Self::Duplicate { site, .. }
            | Self::Blocked { site, .. }
            | Self::Credential { site, .. }
            | Self::Site { site, .. }
            | Self::Transport { site, .. } => site,
        }
    }

    /// How the orchestrator treats this failure. Exhausted transport retries
    /// count as a site error.
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            Self::NotFound { .. } => SkipReason::NotFound,
            Self::Duplicate { .. } => SkipReason::Duplicate,
            Self::Blocked { .. } => SkipReason::Blocked,
            Self::Credential { .. } => SkipReason::Credential,
            Self::Site { .. } | Self::Transport { .. } => SkipReason::SiteError,
        }
    }
}

/// Classification of a failed connector attempt. Every variant means
/// "skip to the next connector"; none aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    Duplicate,
    Blocked,
    Credential,
    SiteError,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NotFound => "not found",
            SkipReason::Duplicate => "duplicate match",
            SkipReason::Blocked => "blocked",
            SkipReason::Credential => "credentials",
            SkipReason::SiteError => "site error",
        })
    }
}

/// Errors that prevent a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
