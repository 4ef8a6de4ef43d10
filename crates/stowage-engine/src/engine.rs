//! Per-category orchestration and summary assembly.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::time::Instant;
use tracing::{error, info};

use stowage_core::ObjectStore;

use crate::archiver::{Archiver, DEFAULT_MAX_IN_FLIGHT};
use crate::lister::{Lister, DEFAULT_MAX_ATTEMPTS};
use crate::policy::RetentionPolicy;
use crate::ranker;
use crate::report::{ActionStatus, CategorySummary, RunReport, RunStatus};

/// Default overall run timeout.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(300);

/// Tuning knobs for a retention run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Concurrent moves per category.
    pub max_in_flight: usize,
    /// Listing attempts per page before a category aborts.
    pub list_attempts: u32,
    /// Overall deadline for the invocation. At the deadline, in-flight
    /// moves complete but no new moves start.
    pub run_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            list_attempts: DEFAULT_MAX_ATTEMPTS,
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }
}

/// The retention engine: lister, ranker, and archiver composed per category.
///
/// The engine holds no state between runs; every run starts from a fresh
/// listing. Categories touch disjoint prefixes and are processed
/// concurrently, with failures isolated per category.
pub struct RetentionEngine {
    store: Arc<dyn ObjectStore>,
    config: EngineConfig,
}

impl RetentionEngine {
    /// Creates an engine with default tuning.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Creates an engine with explicit tuning.
    #[must_use]
    pub fn with_config(store: Arc<dyn ObjectStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Runs retention for every category and assembles the invocation
    /// report.
    ///
    /// Never fails as a whole: the worst outcome is a `partial` or `error`
    /// status. Callers decide whether to retry or alert.
    #[tracing::instrument(skip_all, fields(categories = policies.len()))]
    pub async fn run(&self, policies: &[RetentionPolicy]) -> RunReport {
        let deadline = Instant::now() + self.config.run_timeout;

        let outcomes =
            future::join_all(policies.iter().map(|p| self.run_category(p, deadline))).await;

        let mut status = RunStatus::Ok;
        let mut per_category = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                CategoryOutcome::Completed(summary) => {
                    if !summary.is_clean() && status == RunStatus::Ok {
                        status = RunStatus::Partial;
                    }
                    per_category.push(summary);
                }
                CategoryOutcome::Aborted(summary) => {
                    status = RunStatus::Error;
                    per_category.push(summary);
                }
            }
        }

        RunReport {
            status,
            per_category,
        }
    }

    async fn run_category(
        &self,
        policy: &RetentionPolicy,
        deadline: Instant,
    ) -> CategoryOutcome {
        let mut summary = CategorySummary::new(policy.name.as_str());

        if let Err(err) = policy.validate() {
            error!(category = %policy.name, error = %err, "policy rejected");
            summary.errors.push(err.to_string());
            return CategoryOutcome::Aborted(summary);
        }

        let lister = Lister::new(Arc::clone(&self.store))
            .with_max_attempts(self.config.list_attempts);
        let listed = match lister.list_all(&policy.source_prefix).await {
            Ok(listed) => listed,
            Err(err) => {
                error!(category = %policy.name, error = %err, "listing aborted");
                summary.errors.push(err.to_string());
                return CategoryOutcome::Aborted(summary);
            }
        };

        let ranking = ranker::rank(&policy.name, listed);
        summary.unparseable = ranking.unparseable.len();
        let ranked_count = ranking.ranked.len();

        let archiver = Archiver::new(Arc::clone(&self.store))
            .with_max_in_flight(self.config.max_in_flight);
        let actions = archiver.archive(policy, ranking.ranked, deadline).await;

        summary.kept = ranked_count - actions.len();
        for action in actions {
            match action.status {
                ActionStatus::Deleted => summary.moved += 1,
                ActionStatus::Skipped => summary.skipped += 1,
                _ => {
                    summary.failed += 1;
                    if let Some(err) = action.error {
                        summary.errors.push(err);
                    }
                }
            }
        }

        info!(
            category = %policy.name,
            kept = summary.kept,
            moved = summary.moved,
            failed = summary.failed,
            skipped = summary.skipped,
            unparseable = summary.unparseable,
            "retention pass complete"
        );
        CategoryOutcome::Completed(summary)
    }
}

enum CategoryOutcome {
    /// Listing succeeded; counters cover the full listing.
    Completed(CategorySummary),
    /// Policy rejected or listing failed; nothing was touched.
    Aborted(CategorySummary),
}
