//! # stowage-core
//!
//! Shared infrastructure for the stowage retention engine:
//!
//! - **Storage Trait**: Abstract object-storage interface with explicit
//!   pagination, plus in-memory and cloud-bucket backends
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Structured logging initialization
//!
//! The retention engine itself lives in `stowage-engine`; this crate defines
//! the contracts it runs against so tests and real deployments share one
//! storage surface.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod storage;

pub use error::{Error, Result};
pub use storage::{BucketStore, ListPage, MemoryStore, ObjectMeta, ObjectStore};
