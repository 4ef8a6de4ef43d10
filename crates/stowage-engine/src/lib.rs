//! # stowage-engine
//!
//! Retention/archival engine for CI scan reports stored in an object bucket.
//!
//! For each configured category the engine runs three stages in sequence:
//!
//! 1. **Lister** - enumerates every object under the category's source
//!    prefix, assembling paginated listings into one complete set
//! 2. **Ranker** - extracts the build id from each key and orders objects
//!    newest-first
//! 3. **Archiver** - leaves the newest `keep_count` objects in place and
//!    moves the rest to the archive prefix (copy, verify, then delete)
//!
//! Categories touch disjoint prefixes and run concurrently. The engine is
//! stateless across invocations: the keep/demote split is recomputed from a
//! fresh listing every run, which also makes re-runs over unchanged buckets
//! no-ops.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stowage_core::MemoryStore;
//! use stowage_engine::{RetentionEngine, RetentionPolicy};
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = RetentionEngine::new(store);
//! let report = engine
//!     .run(&[RetentionPolicy {
//!         name: "sonar".into(),
//!         source_prefix: "reports/sonar".into(),
//!         archive_prefix: "archive/sonar".into(),
//!         keep_count: 3,
//!     }])
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod archiver;
pub mod engine;
pub mod lister;
pub mod policy;
pub mod ranker;
pub mod report;

pub use engine::{EngineConfig, RetentionEngine};
pub use policy::{RetentionPolicy, RunRequest};
pub use report::{
    ActionStatus, ArchiveAction, CategorySummary, ReportObject, RunReport, RunStatus,
};
