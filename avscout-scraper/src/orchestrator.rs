//! Source orchestration: run a movie's connectors in order and merge what they find.
//!
//! For each connector the orchestrator creates (or reuses) an instance, lets it
//! fill a scratch record, and copies the scratch into the movie's record with
//! first-wins, fill-blanks semantics. A failing connector contributes nothing
//! and the walk continues. The walk stops early once every required field is
//! set; an empty required set never stops it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use avscout_core::{Field, MetadataRecord, Movie};
use avscout_lib::{Settings, SourceSettings};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Duration;

use crate::connector::{Connector, ConnectorFactory, ConnectorRegistry, CrawlTarget, SourcePlan};
use crate::context::RunContext;
use crate::error::{ConnectorError, ScrapeError, SkipReason};
use crate::postprocess;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Fields whose presence ends the walk early
    pub required: BTreeSet<Field>,
    pub hardworking: bool,
    /// Pause between two connector invocations for the same movie
    pub attempt_delay: Duration,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self::from_settings(&SourceSettings::default())
    }
}

impl AggregateOptions {
    pub fn from_settings(sources: &SourceSettings) -> Self {
        Self {
            required: sources.required_fields.clone(),
            hardworking: sources.hardworking,
            attempt_delay: Duration::from_millis(sources.attempt_delay_ms),
        }
    }
}

/// Final state of one movie's aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// Every required field is set
    RequirementsMet,
    /// All connectors ran and some required fields are still unset
    Exhausted { missing: Vec<Field> },
}

impl Outcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Outcome::RequirementsMet)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptResult {
    /// The connector succeeded; `fields` are the ones it was first to fill
    Filled { fields: Vec<Field>, complete: bool },
    Skipped { reason: SkipReason, message: String },
}

/// One connector invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub site_id: String,
    pub result: AttemptResult,
}

/// Merged record for one movie, plus how it was obtained.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    pub record: MetadataRecord,
    pub outcome: Outcome,
    pub attempts: Vec<Attempt>,
}

/// Progress events emitted by [`Orchestrator::aggregate`].
#[derive(Debug, Clone)]
pub enum AggregateEvent {
    Started { key: String, connectors: usize },
    Trying { key: String, site_id: String },
    Filled { key: String, site_id: String, fields: usize },
    Skipped { key: String, site_id: String, reason: SkipReason },
    Finished { key: String, satisfied: bool },
}

pub struct Orchestrator {
    ctx: RunContext,
    plan: SourcePlan,
    options: AggregateOptions,
    /// Connector instances by site id; only successful creations are kept
    instances: Mutex<HashMap<String, Arc<OnceCell<Arc<dyn Connector>>>>>,
    credential_warned: Mutex<HashSet<String>>,
}

impl Orchestrator {
    pub fn new(ctx: RunContext, plan: SourcePlan, options: AggregateOptions) -> Self {
        Self {
            ctx,
            plan,
            options,
            instances: Mutex::new(HashMap::new()),
            credential_warned: Mutex::new(HashSet::new()),
        }
    }

    /// Build the run context and connector plan from settings.
    ///
    /// Fails on unknown connector ids or an unusable network configuration.
    pub fn from_settings(
        settings: &Settings,
        registry: &ConnectorRegistry,
    ) -> Result<Self, ScrapeError> {
        let plan = registry.plan(&settings.sources)?;
        let ctx = RunContext::new(&settings.network)?;
        Ok(Self::new(
            ctx,
            plan,
            AggregateOptions::from_settings(&settings.sources),
        ))
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Run the connectors configured for the movie's classification and merge
    /// their results. Never fails: connector errors only skip that connector.
    pub async fn aggregate(
        &self,
        movie: &Movie,
        events: Option<&UnboundedSender<AggregateEvent>>,
    ) -> Aggregation {
        let emit = |event: AggregateEvent| {
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };

        let key = movie.key().to_string();
        let factories = self.plan.for_classification(movie.classification());
        let required = &self.options.required;
        let target = CrawlTarget {
            identity: movie.identity().clone(),
            hardworking: self.options.hardworking,
        };

        log::debug!(
            "{}: {} connector(s) for classification {}",
            key,
            factories.len(),
            movie.classification()
        );
        emit(AggregateEvent::Started {
            key: key.clone(),
            connectors: factories.len(),
        });

        let mut record = MetadataRecord::new();
        let mut attempts = Vec::with_capacity(factories.len());

        for (index, factory) in factories.iter().enumerate() {
            if index > 0 && !self.options.attempt_delay.is_zero() {
                tokio::time::sleep(self.options.attempt_delay).await;
            }

            let site_id = factory.site_id().to_string();
            emit(AggregateEvent::Trying {
                key: key.clone(),
                site_id: site_id.clone(),
            });

            let result = match self.attempt(factory, &target).await {
                Ok(scratch) => {
                    let fields = record.merge_blanks(scratch, &site_id);
                    let complete = !required.is_empty() && record.missing(required).is_empty();
                    log::debug!("{}: {} filled {} field(s)", key, site_id, fields.len());
                    emit(AggregateEvent::Filled {
                        key: key.clone(),
                        site_id: site_id.clone(),
                        fields: fields.len(),
                    });
                    AttemptResult::Filled { fields, complete }
                }
                Err(e) => {
                    let reason = e.skip_reason();
                    self.report(&key, &e).await;
                    emit(AggregateEvent::Skipped {
                        key: key.clone(),
                        site_id: site_id.clone(),
                        reason,
                    });
                    AttemptResult::Skipped {
                        reason,
                        message: e.to_string(),
                    }
                }
            };

            let stop = matches!(result, AttemptResult::Filled { complete: true, .. });
            attempts.push(Attempt { site_id, result });
            if stop {
                log::debug!("{}: required fields complete", key);
                break;
            }
        }

        if let Err(e) = postprocess::apply(movie.identity(), &mut record) {
            log::debug!("{}: post-processing skipped: {}", key, e);
        }

        let missing = record.missing(required);
        let outcome = if missing.is_empty() {
            Outcome::RequirementsMet
        } else {
            Outcome::Exhausted { missing }
        };

        emit(AggregateEvent::Finished {
            key,
            satisfied: outcome.is_satisfied(),
        });

        Aggregation {
            record,
            outcome,
            attempts,
        }
    }

    /// Create (or reuse) the connector and let it fill a fresh record.
    async fn attempt(
        &self,
        factory: &Arc<dyn ConnectorFactory>,
        target: &CrawlTarget,
    ) -> Result<MetadataRecord, ConnectorError> {
        let connector = self.instance(factory).await?;
        let mut scratch = MetadataRecord::new();
        connector.crawl_and_fill(target, &mut scratch).await?;
        Ok(scratch)
    }

    async fn instance(
        &self,
        factory: &Arc<dyn ConnectorFactory>,
    ) -> Result<Arc<dyn Connector>, ConnectorError> {
        let cell = {
            let mut instances = self.instances.lock().await;
            instances
                .entry(factory.site_id().to_string())
                .or_default()
                .clone()
        };
        cell.get_or_try_init(|| factory.create(&self.ctx))
            .await
            .cloned()
    }

    async fn report(&self, key: &str, e: &ConnectorError) {
        match e.skip_reason() {
            SkipReason::NotFound => log::debug!("{}: {}", key, e),
            SkipReason::Duplicate => {
                log::warn!("{}: {} (check this title by hand)", key, e)
            }
            SkipReason::Blocked => log::warn!("{}: {}", key, e),
            SkipReason::Credential => {
                let first = self
                    .credential_warned
                    .lock()
                    .await
                    .insert(e.site_id().to_string());
                if first {
                    log::warn!("{}", e);
                } else {
                    log::debug!("{}: {}", key, e);
                }
            }
            SkipReason::SiteError => log::debug!("{}: {}", key, e),
        }
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
