//! Full-prefix listing with a bounded retry budget.
//!
//! The keep/demote split cannot be computed from a partial listing, so the
//! lister either assembles every page under the prefix or surfaces
//! `StorageUnavailable`. Transient page failures are retried with
//! exponential backoff and jitter; the budget applies per page attempt.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use stowage_core::{Error, ListPage, ObjectMeta, ObjectStore, Result};

/// Default attempts per page before the listing is abandoned.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base backoff duration between attempts.
const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Maximum backoff duration.
const BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Enumerates all objects under a prefix, transparently following pages.
pub struct Lister {
    store: Arc<dyn ObjectStore>,
    max_attempts: u32,
}

impl Lister {
    /// Creates a lister with the default retry budget.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the per-page retry budget (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the complete set of objects under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if any page cannot be fetched
    /// within the retry budget. A partial set is never returned.
    pub async fn list_all(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.fetch_page(prefix, token.as_deref()).await?;
            objects.extend(page.objects);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(objects)
    }

    async fn fetch_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage> {
        let mut attempts = 0;
        let mut backoff = BACKOFF_BASE;

        loop {
            match self.store.list_page(prefix, token).await {
                Ok(page) => return Ok(page),
                Err(err) => {
                    attempts += 1;
                    if attempts >= self.max_attempts {
                        return Err(Error::storage_unavailable_with_source(
                            "list",
                            format!("listing {prefix} failed after {attempts} attempts"),
                            err,
                        ));
                    }

                    warn!(
                        prefix = %prefix,
                        attempt = attempts,
                        error = %err,
                        "listing page failed, retrying"
                    );

                    // Exponential backoff with jitter
                    let delay = backoff.min(BACKOFF_MAX) + Duration::from_millis(rand_jitter());
                    tokio::time::sleep(delay).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }
}

fn rand_jitter() -> u64 {
    // Clock-derived jitter; no rand dependency needed for this
    use std::time::SystemTime;
    let seed = u64::from(
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos(),
    );
    seed % 50
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};
    use stowage_core::MemoryStore;

    /// Delegating store whose listing fails a fixed number of times first.
    struct FailingFirstStore {
        inner: MemoryStore,
        list_failures: AtomicU32,
    }

    #[async_trait]
    impl ObjectStore for FailingFirstStore {
        async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage> {
            if self.list_failures.load(Ordering::Acquire) > 0 {
                self.list_failures.fetch_sub(1, Ordering::AcqRel);
                return Err(Error::internal("injected listing failure"));
            }
            self.inner.list_page(prefix, token).await
        }

        async fn copy(&self, src_key: &str, dst_key: &str) -> Result<()> {
            self.inner.copy(src_key, dst_key).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }

        async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
            self.inner.head(key).await
        }
    }

    fn seeded(keys: &[&str]) -> MemoryStore {
        let store = MemoryStore::with_page_size(2);
        for key in keys {
            store.put(key, Bytes::from_static(b"{}")).expect("put");
        }
        store
    }

    #[tokio::test]
    async fn assembles_all_pages() {
        let store = Arc::new(seeded(&[
            "r/a-report-1.json",
            "r/a-report-2.json",
            "r/a-report-3.json",
            "r/a-report-4.json",
            "r/a-report-5.json",
        ]));
        let listed = Lister::new(store).list_all("r/").await.expect("list");
        assert_eq!(listed.len(), 5);
    }

    #[tokio::test]
    async fn retries_transient_failures_within_budget() {
        let store = Arc::new(FailingFirstStore {
            inner: seeded(&["r/a-report-1.json"]),
            list_failures: AtomicU32::new(2),
        });
        let listed = Lister::new(store)
            .with_max_attempts(3)
            .list_all("r/")
            .await
            .expect("list succeeds on third attempt");
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_storage_unavailable() {
        let store = Arc::new(FailingFirstStore {
            inner: seeded(&["r/a-report-1.json"]),
            list_failures: AtomicU32::new(10),
        });
        let err = Lister::new(store)
            .with_max_attempts(2)
            .list_all("r/")
            .await
            .expect_err("budget exhausted");
        assert!(matches!(err, Error::StorageUnavailable { .. }));
    }
}
