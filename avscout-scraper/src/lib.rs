//! Network side of avscout: mirror resolution, data-source connectors, and
//! the orchestrator that merges their results into one record per movie.

pub mod client;
pub mod connector;
pub mod context;
pub mod error;
pub mod fallback;
pub mod json_source;
pub mod log;
pub mod orchestrator;
pub mod postprocess;

pub use connector::{Connector, ConnectorFactory, ConnectorRegistry, CrawlTarget, SourcePlan};
pub use context::RunContext;
pub use error::{ConnectorError, ScrapeError, SkipReason};
pub use fallback::{HostResolver, HttpProbe, MirrorCandidateSet, Probe};
pub use json_source::{JsonSource, JsonSourceFactory};
pub use self::log::{LogEntry, LogSummary, RunLog};
pub use orchestrator::{
    AggregateEvent, AggregateOptions, Aggregation, Attempt, AttemptResult, Orchestrator, Outcome,
};
