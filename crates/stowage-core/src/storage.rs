//! Object storage abstraction consumed by the retention engine.
//!
//! The engine only ever needs four operations: paginated listing, server-side
//! copy, delete, and a metadata probe. This module defines that contract and
//! two backends:
//!
//! - [`MemoryStore`]: in-memory backend for tests, with a configurable page
//!   size so pagination handling is actually exercised
//! - [`BucketStore`]: cloud backend over the `object_store` crate (S3, GCS)
//!
//! ## Pagination
//!
//! Listing is exposed page-by-page with an opaque continuation token. Callers
//! that need the complete set (the retention engine does - the keep-set cannot
//! be computed from a partial listing) must follow tokens until exhausted.
//!
//! ## Ordering
//!
//! Objects within a page are returned in arbitrary order that may vary
//! between backends. Callers requiring deterministic order sort the
//! assembled results themselves.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use object_store::path::Path as StorePath;
use object_store::ObjectStore as _;

use crate::error::{Error, Result};

/// Default number of objects per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object key, unique within the bucket.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification timestamp, if the backend reports one.
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects in this page.
    pub objects: Vec<ObjectMeta>,
    /// Continuation token for the next page, or `None` on the last page.
    pub next_token: Option<String>,
}

/// Storage backend trait for the four operations the engine consumes.
///
/// Implementations must be safe to share across tasks; the archiver drives
/// copy/delete through a bounded worker pool.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Lists one page of objects under `prefix`.
    ///
    /// Pass the previous page's `next_token` to continue; `None` starts from
    /// the beginning. A page with `next_token: None` is the last page.
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage>;

    /// Server-side copy. Overwrites `dst_key` if it already exists.
    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<()>;

    /// Deletes an object. Succeeds even if the object doesn't exist
    /// (idempotent).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if the object doesn't exist.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>>;
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production. Keys are matched
/// against prefixes as raw strings, and listing pages are served in key
/// order so continuation tokens stay stable across calls.
#[derive(Debug)]
pub struct MemoryStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
    page_size: usize,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a new empty memory store with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates a new empty memory store serving listings in pages of
    /// `page_size` objects.
    ///
    /// Tests use small page sizes to force multi-page listings.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: page_size.max(1),
        }
    }

    /// Stores an object, overwriting any existing one. Test seeding helper;
    /// the engine itself never writes object content.
    pub fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::internal("lock poisoned"))?
            .insert(
                key.to_string(),
                StoredObject {
                    data,
                    last_modified: Utc::now(),
                },
            );
        Ok(())
    }

    /// Returns all keys currently stored, in lexicographic order.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .map_err(|_| Error::internal("lock poisoned"))?
            .keys()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage> {
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::internal("lock poisoned"))?;

        let mut page = Vec::with_capacity(self.page_size);
        let mut remaining = false;
        for (key, obj) in objects.range::<str, _>((
            token.map_or(std::ops::Bound::Unbounded, std::ops::Bound::Excluded),
            std::ops::Bound::Unbounded,
        )) {
            if !key.starts_with(prefix) {
                // BTreeMap range is ordered; keys before the prefix region
                // can still appear, so filter rather than break.
                continue;
            }
            if page.len() == self.page_size {
                remaining = true;
                break;
            }
            page.push(ObjectMeta {
                key: key.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
            });
        }
        drop(objects);

        let next_token = if remaining {
            page.last().map(|o: &ObjectMeta| o.key.clone())
        } else {
            None
        };
        Ok(ListPage {
            objects: page,
            next_token,
        })
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| Error::internal("lock poisoned"))?;

        let src = objects
            .get(src_key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("object not found: {src_key}")))?;
        objects.insert(
            dst_key.to_string(),
            StoredObject {
                data: src.data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::internal("lock poisoned"))?
            .remove(key);
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::internal("lock poisoned"))?;

        Ok(objects.get(key).map(|obj| ObjectMeta {
            key: key.to_string(),
            size: obj.data.len() as u64,
            last_modified: Some(obj.last_modified),
        }))
    }
}

// ============================================================================
// Cloud bucket backend
// ============================================================================

/// Cloud object-storage backend over the `object_store` crate.
///
/// Credentials come from the ambient environment (the invoking identity is
/// assumed pre-authorized). The backend is selected from the bucket scheme:
/// `s3://bucket`, `gs://bucket`, or a bare name (treated as S3).
pub struct BucketStore {
    inner: Arc<dyn object_store::ObjectStore>,
    page_size: usize,
}

impl BucketStore {
    /// Creates a backend for the given bucket identifier.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the backend cannot be
    /// constructed (e.g. malformed bucket name).
    pub fn from_bucket(bucket: &str) -> Result<Self> {
        let inner: Arc<dyn object_store::ObjectStore> =
            if let Some(name) = bucket.strip_prefix("gs://") {
                Arc::new(
                    object_store::gcp::GoogleCloudStorageBuilder::from_env()
                        .with_bucket_name(name)
                        .build()
                        .map_err(|e| {
                            Error::storage_unavailable_with_source(
                                "configure",
                                format!("cannot build GCS backend for {bucket}"),
                                e,
                            )
                        })?,
                )
            } else {
                let name = bucket.strip_prefix("s3://").unwrap_or(bucket);
                Arc::new(
                    object_store::aws::AmazonS3Builder::from_env()
                        .with_bucket_name(name)
                        .build()
                        .map_err(|e| {
                            Error::storage_unavailable_with_source(
                                "configure",
                                format!("cannot build S3 backend for {bucket}"),
                                e,
                            )
                        })?,
                )
            };

        Ok(Self {
            inner,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Overrides the listing page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[async_trait]
impl ObjectStore for BucketStore {
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage> {
        let prefix_path = StorePath::from(prefix);
        let mut stream = match token {
            Some(offset) => self
                .inner
                .list_with_offset(Some(&prefix_path), &StorePath::from(offset)),
            None => self.inner.list(Some(&prefix_path)),
        };

        let mut objects = Vec::with_capacity(self.page_size);
        while objects.len() < self.page_size {
            match stream.next().await {
                Some(Ok(meta)) => objects.push(ObjectMeta {
                    key: meta.location.to_string(),
                    size: u64::try_from(meta.size).unwrap_or(u64::MAX),
                    last_modified: Some(meta.last_modified),
                }),
                Some(Err(e)) => {
                    return Err(Error::storage_unavailable_with_source(
                        "list",
                        format!("listing {prefix} failed"),
                        e,
                    ));
                }
                None => {
                    return Ok(ListPage {
                        objects,
                        next_token: None,
                    });
                }
            }
        }

        // Page filled; the next page continues after the last key seen.
        let next_token = objects.last().map(|o| o.key.clone());
        Ok(ListPage {
            objects,
            next_token,
        })
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<()> {
        self.inner
            .copy(&StorePath::from(src_key), &StorePath::from(dst_key))
            .await
            .map_err(|e| {
                Error::storage_unavailable_with_source(
                    "copy",
                    format!("copy {src_key} -> {dst_key} failed"),
                    e,
                )
            })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.inner.delete(&StorePath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(Error::storage_unavailable_with_source(
                "delete",
                format!("delete {key} failed"),
                e,
            )),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        match self.inner.head(&StorePath::from(key)).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                key: meta.location.to_string(),
                size: u64::try_from(meta.size).unwrap_or(u64::MAX),
                last_modified: Some(meta.last_modified),
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(Error::storage_unavailable_with_source(
                "head",
                format!("head {key} failed"),
                e,
            )),
        }
    }
}
