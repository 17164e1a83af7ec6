//! Fan-out over every enabled source, fan-in into one sorted list.
//!
//! Each source runs as its own tokio task under a timeout. A source that
//! fails, times out or panics ends up as a [`SourceReport`] and contributes
//! nothing; the others are unaffected.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Utc};
use futures::future::join_all;
use rand::Rng;
use tracing::{info, warn};

use contestboard_common::{canonical_zone, Contest, ContestView, Platform};

use crate::sources::{ContestSource, SourceError};

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Upper bound on one source's whole run, retries included.
    pub source_timeout: Duration,
    /// Tries per source. 1 means no retry.
    pub attempts: u32,
    /// First retry delay; later ones grow by 3x.
    pub retry_base: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(90),
            attempts: 1,
            retry_base: Duration::from_secs(2),
        }
    }
}

/// How one source's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Harvested {
        contests: usize,
        dropped: usize,
        ended: usize,
    },
    Unavailable(String),
    Unsupported,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub platform: Platform,
    pub outcome: SourceOutcome,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Result of one aggregation run.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub fetched_at: DateTime<FixedOffset>,
    /// Every kept contest, ascending by start time.
    pub contests: Vec<Contest>,
    /// One entry per source that ran, in source order.
    pub reports: Vec<SourceReport>,
}

impl Aggregation {
    pub fn ongoing(&self) -> Vec<&Contest> {
        ongoing_at(&self.contests, &self.fetched_at)
    }

    pub fn upcoming(&self) -> Vec<&Contest> {
        self.contests
            .iter()
            .filter(|c| c.start_time() > self.fetched_at)
            .collect()
    }

    pub fn views(&self) -> Vec<ContestView> {
        self.contests
            .iter()
            .map(|c| ContestView::new(c, &self.fetched_at))
            .collect()
    }
}

/// Contests running at `now`: started, not yet ended.
pub fn ongoing_at<'a>(contests: &'a [Contest], now: &DateTime<FixedOffset>) -> Vec<&'a Contest> {
    contests.iter().filter(|c| c.is_ongoing_at(now)).collect()
}

/// Stable sort by start time; ties keep their incoming order.
pub fn sort_by_start(contests: &mut [Contest]) {
    contests.sort_by_key(|c| c.start_time());
}

pub struct Aggregator {
    sources: Vec<Arc<dyn ContestSource>>,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn ContestSource>>, settings: AggregatorSettings) -> Self {
        Self { sources, settings }
    }

    pub async fn aggregate(&self, enabled: &BTreeSet<Platform>) -> Aggregation {
        let now = Utc::now().with_timezone(&canonical_zone());
        self.aggregate_at(enabled, now).await
    }

    /// Run every enabled source against a fixed `now`.
    pub async fn aggregate_at(
        &self,
        enabled: &BTreeSet<Platform>,
        now: DateTime<FixedOffset>,
    ) -> Aggregation {
        let selected: Vec<Arc<dyn ContestSource>> = self
            .sources
            .iter()
            .filter(|s| enabled.contains(&s.platform()))
            .cloned()
            .collect();
        info!(sources = selected.len(), fetched_at = %now, "Aggregating contests");

        let handles = selected.iter().map(|source| {
            let source = source.clone();
            let settings = self.settings.clone();
            tokio::spawn(async move { run_source(source.as_ref(), &settings, now).await })
        });
        let finished = join_all(handles).await;

        let mut contests = Vec::new();
        let mut reports = Vec::with_capacity(finished.len());
        for (source, joined) in selected.iter().zip(finished) {
            let platform = source.platform();
            let (mut found, report) = match joined {
                Ok(run) => run,
                Err(e) => {
                    warn!(platform = %platform, error = %e, "Source task crashed");
                    (
                        Vec::new(),
                        SourceReport {
                            platform,
                            outcome: SourceOutcome::Unavailable(format!("task failed: {e}")),
                            attempts: 1,
                            elapsed: Duration::ZERO,
                        },
                    )
                }
            };
            contests.append(&mut found);
            reports.push(report);
        }

        sort_by_start(&mut contests);
        info!(
            contests = contests.len(),
            ongoing = ongoing_at(&contests, &now).len(),
            "Aggregation complete"
        );

        Aggregation {
            fetched_at: now,
            contests,
            reports,
        }
    }
}

async fn run_source(
    source: &dyn ContestSource,
    settings: &AggregatorSettings,
    now: DateTime<FixedOffset>,
) -> (Vec<Contest>, SourceReport) {
    let platform = source.platform();
    let started = Instant::now();
    let mut attempts = 0;

    let result = tokio::time::timeout(settings.source_timeout, async {
        loop {
            attempts += 1;
            match source.fetch(now).await {
                Err(e) if e.is_transient() && attempts < settings.attempts.max(1) => {
                    let backoff = settings.retry_base * 3u32.pow(attempts - 1);
                    let jitter_cap = settings.retry_base.as_millis() as u64;
                    let jitter = Duration::from_millis(rand::rng().random_range(0..=jitter_cap));
                    warn!(
                        platform = %platform,
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Source failed, retrying after backoff"
                    );
                    tokio::time::sleep(backoff + jitter).await;
                }
                other => break other,
            }
        }
    })
    .await;

    let (contests, outcome) = match result {
        Ok(Ok(harvest)) => {
            info!(
                platform = %platform,
                contests = harvest.contests.len(),
                dropped = harvest.dropped.len(),
                ended = harvest.ended,
                "Source harvested"
            );
            let outcome = SourceOutcome::Harvested {
                contests: harvest.contests.len(),
                dropped: harvest.dropped.len(),
                ended: harvest.ended,
            };
            (harvest.contests, outcome)
        }
        Ok(Err(SourceError::Unsupported(_))) => {
            info!(platform = %platform, "Source not supported, skipping");
            (Vec::new(), SourceOutcome::Unsupported)
        }
        Ok(Err(e)) => {
            warn!(platform = %platform, error = %e, "Source unavailable");
            (Vec::new(), SourceOutcome::Unavailable(e.to_string()))
        }
        Err(_) => {
            warn!(
                platform = %platform,
                timeout_secs = settings.source_timeout.as_secs(),
                "Source timed out"
            );
            (Vec::new(), SourceOutcome::TimedOut)
        }
    };

    let report = SourceReport {
        platform,
        outcome,
        attempts,
        elapsed: started.elapsed(),
    };
    (contests, report)
}
