//! Per-run state shared by every connector.

use std::sync::Arc;

use avscout_lib::NetworkSettings;
use tokio::time::Duration;

use crate::client::HttpPool;
use crate::error::ScrapeError;
use crate::fallback::{HostResolver, HttpProbe, MirrorCandidateSet};

/// Owns the HTTP client pool and the mirror resolution cache for one run.
///
/// Nothing here outlives the run: a new context probes mirrors from scratch.
pub struct RunContext {
    http: Arc<HttpPool>,
    resolver: HostResolver,
}

impl RunContext {
    pub fn new(network: &NetworkSettings) -> Result<Self, ScrapeError> {
        let http = Arc::new(HttpPool::new(network)?);
        let probe = HttpProbe::new(
            Arc::clone(&http),
            Duration::from_secs(network.probe_timeout_secs),
        );
        let mirrors = network
            .mirrors
            .iter()
            .map(|(site, settings)| MirrorCandidateSet::from_settings(site, settings));
        let resolver = HostResolver::new(Arc::new(probe), mirrors);
        Ok(Self { http, resolver })
    }

    /// Assemble a context from existing parts.
    pub fn with_parts(http: Arc<HttpPool>, resolver: HostResolver) -> Self {
        Self { http, resolver }
    }

    /// Shared client pool; clone the handle to keep it inside a connector.
    pub fn http(&self) -> &Arc<HttpPool> {
        &self.http
    }

    pub fn resolver(&self) -> &HostResolver {
        &self.resolver
    }
}
