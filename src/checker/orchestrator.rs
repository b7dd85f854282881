//! Run-level consolidation
//!
//! The [`Consolidator`] resolves every group concurrently. All groups share
//! one [`ProbeSlots`] pool, so the worker count bounds in-flight network
//! calls for the whole run no matter how many groups exist. Each group task
//! hands its [`GroupResolution`] back to a single collector, which restores
//! first-seen order before anything is returned.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::attribution::apply_source_prefix;
use super::link::{HttpLinkChecker, LinkCheck};
use super::prober::{LivenessProber, ProbeSlots};
use super::resolver::{GroupResolution, GroupResolver};
use crate::config::{Config, SourcePrefixes};
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{Group, GroupingSummary, ResolvedChannel, RunStats};

/// Output of one consolidation run
#[derive(Debug, Clone)]
pub struct Consolidation {
    /// Resolved channels in first-seen order
    pub channels: Vec<ResolvedChannel>,
    pub stats: RunStats,
}

/// Resolves groups under a shared concurrency ceiling
pub struct Consolidator {
    resolver: GroupResolver,
    prefixes: SourcePrefixes,
    timeout: Duration,
    max_retries: u32,
    progress_interval: usize,
}

impl Consolidator {
    /// Build a consolidator probing over the network
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid configuration and
    /// `Error::Probe` if the HTTP client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let checker = HttpLinkChecker::new(config.probe.clone())?;
        Self::with_checker(config, Arc::new(checker))
    }

    /// Build a consolidator around any [`LinkCheck`] implementation
    pub fn with_checker(config: &Config, checker: Arc<dyn LinkCheck>) -> Result<Self> {
        config.validate()?;

        let slots = ProbeSlots::new(config.checker.workers);
        let prober = LivenessProber::new(checker, slots, config.retry.clone())
            .with_retry_client_errors(config.probe.retry_client_errors)
            .with_rate_limit(config.checker.rate_limit);

        Ok(Self {
            resolver: GroupResolver::new(Arc::new(prober), config.checker.lookahead),
            prefixes: config.sources.clone(),
            timeout: config.request_timeout()?,
            max_retries: config.retry.max_retries,
            progress_interval: config.checker.progress_interval,
        })
    }

    /// Slots shared by every probe of this consolidator
    pub fn slots(&self) -> &ProbeSlots {
        self.resolver.prober().slots()
    }

    /// Resolve all groups and return the working channels in first-seen order
    ///
    /// Per-candidate and per-group failures only show up in the returned
    /// statistics. A panicked group task fails the whole run and no channels
    /// are returned.
    pub async fn consolidate(&self, groups: Vec<Group>) -> Result<Consolidation> {
        let started = Instant::now();
        let total = groups.len();
        let mut stats = RunStats::new(total);
        stats.grouping = GroupingSummary::from_groups(&groups);

        tracing::info!(
            groups = total,
            workers = self.slots().limit(),
            timeout_secs = self.timeout.as_secs_f64(),
            max_retries = self.max_retries,
            "Checking channel groups"
        );

        let mut tasks = JoinSet::new();
        for group in groups {
            let resolver = self.resolver.clone();
            let timeout = self.timeout;
            let max_retries = self.max_retries;
            tasks.spawn(async move { resolver.resolve(&group, timeout, max_retries).await });
        }

        let mut channels = Vec::new();
        let mut finished = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let resolution: GroupResolution = match joined {
                Ok(resolution) => resolution,
                Err(e) => {
                    tasks.abort_all();
                    tracing::error!(error = %e, "Group task failed, aborting run");
                    return Err(Error::Task(e));
                }
            };

            finished += 1;
            stats.probes += resolution.attempts;
            match resolution.channel {
                Some(mut channel) => {
                    apply_source_prefix(&mut channel, &self.prefixes);
                    stats.resolved += 1;
                    channels.push(channel);
                }
                None => stats.dropped += 1,
            }

            if finished % self.progress_interval == 0 || finished == total {
                tracing::info!(
                    done = finished,
                    total = total,
                    working = stats.resolved,
                    failed = stats.dropped,
                    "Progress"
                );
            }
        }

        channels.sort_by_key(|c| c.first_seen_index);

        stats.elapsed_secs = started.elapsed().as_secs_f64();
        metrics::record_groups(stats.resolved, stats.dropped, 0);

        tracing::info!(
            resolved = stats.resolved,
            dropped = stats.dropped,
            probes = stats.probes,
            elapsed_secs = stats.elapsed_secs,
            "Consolidation finished"
        );

        Ok(Consolidation { channels, stats })
    }
}
