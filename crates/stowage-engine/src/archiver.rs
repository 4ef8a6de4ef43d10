//! Copy-verify-delete moves for the demote set.
//!
//! The archiver leaves the newest `keep_count` ranked objects untouched and
//! moves the remainder to the archive prefix. Each move is copy, then a
//! metadata probe confirming the copy, then delete of the source. A failure
//! between copy and delete leaves the object readable at its original key
//! (over-retention), never lost.
//!
//! Moves within a category target distinct keys and have no ordering
//! dependency, so they dispatch through a bounded worker pool. One failing
//! move never cancels its siblings. Each worker checks the run deadline
//! before starting; moves not attempted in time finish as `Skipped` while
//! in-flight moves run to completion.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, warn};

use stowage_core::{Error, ObjectStore};

use crate::policy::RetentionPolicy;
use crate::report::{ActionStatus, ArchiveAction, ReportObject};

/// Default number of concurrent moves per category.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Executes archive moves for one category.
pub struct Archiver {
    store: Arc<dyn ObjectStore>,
    max_in_flight: usize,
}

impl Archiver {
    /// Creates an archiver with the default worker-pool width.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Overrides the worker-pool width (minimum 1).
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Moves everything past the keep set to the archive prefix.
    ///
    /// `ranked` must be newest-first; the first `keep_count` entries are
    /// left untouched. Returns one action per demoted object with its final
    /// status. The returned order is not significant.
    #[tracing::instrument(skip(self, ranked), fields(category = %policy.name))]
    pub async fn archive(
        &self,
        policy: &RetentionPolicy,
        mut ranked: Vec<ReportObject>,
        deadline: Instant,
    ) -> Vec<ArchiveAction> {
        let demoted = if ranked.len() > policy.keep_count {
            ranked.split_off(policy.keep_count)
        } else {
            Vec::new()
        };
        drop(ranked);

        let actions = demoted.into_iter().map(|object| {
            let destination = policy.destination_key(&object.key);
            ArchiveAction::planned(object, destination)
        });

        stream::iter(actions)
            .map(|action| {
                let store = Arc::clone(&self.store);
                async move { execute_move(store, action, deadline).await }
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await
    }
}

/// Drives one action through its state machine.
async fn execute_move(
    store: Arc<dyn ObjectStore>,
    mut action: ArchiveAction,
    deadline: Instant,
) -> ArchiveAction {
    if Instant::now() >= deadline {
        action.status = ActionStatus::Skipped;
        debug!(key = %action.object.key, "deadline reached, move skipped");
        return action;
    }

    let src = action.object.key.as_str();
    let dst = action.destination_key.as_str();

    if let Err(err) = store.copy(src, dst).await {
        warn!(key = %src, destination = %dst, error = %err, "copy failed");
        action.error = Some(format!("copy {src}: {err}"));
        action.status = ActionStatus::Failed;
        return action;
    }

    // Confirm the copy before touching the source.
    match store.head(dst).await {
        Ok(Some(_)) => action.status = ActionStatus::Copied,
        Ok(None) => {
            let err = Error::CopyVerificationFailed {
                key: src.to_string(),
                destination: dst.to_string(),
            };
            warn!(key = %src, destination = %dst, "{err}");
            action.error = Some(err.to_string());
            action.status = ActionStatus::Failed;
            return action;
        }
        Err(err) => {
            warn!(key = %src, destination = %dst, error = %err, "copy verification failed");
            action.error = Some(
                Error::CopyVerificationFailed {
                    key: src.to_string(),
                    destination: dst.to_string(),
                }
                .to_string(),
            );
            action.status = ActionStatus::Failed;
            return action;
        }
    }

    match store.delete(src).await {
        Ok(()) => {
            action.status = ActionStatus::Deleted;
            debug!(key = %src, destination = %dst, "object archived");
        }
        Err(err) => {
            // Source and destination both exist now; the duplicate is
            // reconciled by the next invocation.
            let err = Error::DeleteFailed {
                key: src.to_string(),
                message: err.to_string(),
            };
            warn!(key = %src, "{err}");
            action.error = Some(err.to_string());
            action.status = ActionStatus::Failed;
        }
    }

    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;
    use stowage_core::MemoryStore;

    fn policy(keep_count: usize) -> RetentionPolicy {
        RetentionPolicy {
            name: "sonar".to_string(),
            source_prefix: "reports/sonar".to_string(),
            archive_prefix: "archive/sonar".to_string(),
            keep_count,
        }
    }

    fn ranked(ids: &[u64]) -> Vec<ReportObject> {
        ids.iter()
            .map(|id| ReportObject {
                key: format!("reports/sonar/sonar-report-{id}.json"),
                build_id: *id,
            })
            .collect()
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn moves_everything_past_the_keep_set() {
        let store = Arc::new(MemoryStore::new());
        for id in 1..=5 {
            store
                .put(
                    &format!("reports/sonar/sonar-report-{id}.json"),
                    Bytes::from_static(b"{}"),
                )
                .expect("put");
        }

        let actions = Archiver::new(Arc::clone(&store) as Arc<dyn ObjectStore>)
            .archive(&policy(3), ranked(&[5, 4, 3, 2, 1]), far_deadline())
            .await;

        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| a.status == ActionStatus::Deleted));

        let keys = store.keys().expect("keys");
        assert!(keys.contains(&"archive/sonar/sonar-report-1.json".to_string()));
        assert!(keys.contains(&"archive/sonar/sonar-report-2.json".to_string()));
        assert!(keys.contains(&"reports/sonar/sonar-report-5.json".to_string()));
        assert!(!keys.contains(&"reports/sonar/sonar-report-1.json".to_string()));
    }

    #[tokio::test]
    async fn keep_count_larger_than_listing_moves_nothing() {
        let store = Arc::new(MemoryStore::new());
        let actions = Archiver::new(store)
            .archive(&policy(10), ranked(&[2, 1]), far_deadline())
            .await;
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn expired_deadline_skips_every_move() {
        let store = Arc::new(MemoryStore::new());
        for id in 1..=3 {
            store
                .put(
                    &format!("reports/sonar/sonar-report-{id}.json"),
                    Bytes::from_static(b"{}"),
                )
                .expect("put");
        }

        let actions = Archiver::new(Arc::clone(&store) as Arc<dyn ObjectStore>)
            .archive(&policy(1), ranked(&[3, 2, 1]), Instant::now())
            .await;

        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| a.status == ActionStatus::Skipped));
        // Nothing was touched.
        assert_eq!(store.keys().expect("keys").len(), 3);
    }

    #[tokio::test]
    async fn missing_source_fails_that_move_only() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("reports/sonar/sonar-report-1.json", Bytes::from_static(b"{}"))
            .expect("put");
        // sonar-report-2.json is ranked but absent from storage.

        let actions = Archiver::new(Arc::clone(&store) as Arc<dyn ObjectStore>)
            .archive(&policy(1), ranked(&[3, 2, 1]), far_deadline())
            .await;

        let failed: Vec<_> = actions
            .iter()
            .filter(|a| a.status == ActionStatus::Failed)
            .collect();
        let deleted: Vec<_> = actions
            .iter()
            .filter(|a| a.status == ActionStatus::Deleted)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(deleted.len(), 1);
        assert!(failed[0].error.as_deref().is_some_and(|e| e.contains("copy")));
    }
}
