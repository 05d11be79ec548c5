//! Host fallback: pick a reachable base URL for a site from its mirror list.
//!
//! A preferred URL that answers is used as-is. Otherwise every candidate is
//! probed at once and, once all probes are back, the first reachable candidate
//! in list order wins, so the choice does not depend on which mirror answers
//! fastest. With nothing reachable the caller's default is used.
//!
//! The answer is computed once per site and reused for the rest of the run.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use avscout_lib::MirrorSettings;
use futures::future::join_all;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Duration;

use crate::client::HttpPool;

/// Mirror configuration for one logical site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorCandidateSet {
    pub site_id: String,
    pub preferred: Option<String>,
    pub candidates: Vec<String>,
}

impl MirrorCandidateSet {
    pub fn from_settings(site_id: &str, settings: &MirrorSettings) -> Self {
        Self {
            site_id: site_id.to_string(),
            preferred: settings.preferred.clone().filter(|p| !p.is_empty()),
            candidates: settings.candidates.clone(),
        }
    }
}

/// Reachability check for one URL.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Probe issuing a bounded GET through the run's HTTP pool.
pub struct HttpProbe {
    http: Arc<HttpPool>,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(http: Arc<HttpPool>, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        self.http.probe(url, self.timeout).await
    }
}

pub struct HostResolver {
    probe: Arc<dyn Probe>,
    mirrors: HashMap<String, MirrorCandidateSet>,
    resolved: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl HostResolver {
    pub fn new(
        probe: Arc<dyn Probe>,
        mirrors: impl IntoIterator<Item = MirrorCandidateSet>,
    ) -> Self {
        Self {
            probe,
            mirrors: mirrors
                .into_iter()
                .map(|set| (set.site_id.clone(), set))
                .collect(),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Base URL to use for `site_id`.
    ///
    /// The first call per site decides; concurrent first calls wait for the same
    /// probe round instead of starting their own. Later calls return the cached
    /// answer, even if they pass a different default.
    pub async fn resolve(&self, site_id: &str, default_url: &str) -> String {
        let cell = {
            let mut resolved = self.resolved.lock().await;
            resolved.entry(site_id.to_string()).or_default().clone()
        };

        cell.get_or_init(|| self.probe_site(site_id, default_url))
            .await
            .clone()
    }

    /// The cached answer for `site_id`, if it has been resolved.
    pub async fn cached(&self, site_id: &str) -> Option<String> {
        let resolved = self.resolved.lock().await;
        resolved.get(site_id)?.get().cloned()
    }

    async fn probe_site(&self, site_id: &str, default_url: &str) -> String {
        let Some(set) = self.mirrors.get(site_id) else {
            log::debug!("{}: no mirrors configured, using {}", site_id, default_url);
            return default_url.to_string();
        };

        if let Some(preferred) = &set.preferred {
            if self.probe.is_reachable(preferred).await {
                log::debug!("{}: preferred URL {} is reachable", site_id, preferred);
                return preferred.clone();
            }
            log::debug!("{}: preferred URL {} is unreachable", site_id, preferred);
        }

        if set.candidates.is_empty() {
            return default_url.to_string();
        }

        let probes = set.candidates.iter().map(|url| self.probe.is_reachable(url));
        let reachable = join_all(probes).await;
        match set
            .candidates
            .iter()
            .zip(reachable)
            .find_map(|(url, ok)| ok.then_some(url))
        {
            Some(url) => {
                log::info!("{}: using mirror {}", site_id, url);
                url.clone()
            }
            None => {
                log::warn!(
                    "{}: none of {} mirrors reachable, falling back to {}",
                    site_id,
                    set.candidates.len(),
                    default_url
                );
                default_url.to_string()
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/fallback_tests.rs"]
mod tests;
