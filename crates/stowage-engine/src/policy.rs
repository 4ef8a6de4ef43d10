//! Retention policies and the invocation request document.

use serde::{Deserialize, Serialize};
use stowage_core::{Error, Result};

/// Retention policy for one report category.
///
/// Prefixes are opaque path prefixes within the bucket. Source and archive
/// prefixes must be disjoint: archived objects must never reappear in a
/// source listing, or the engine would archive its own output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    /// Category identifier (e.g. "sonar", "trivy-fs", "trivy-image").
    pub name: String,
    /// Prefix the category's live reports are stored under.
    pub source_prefix: String,
    /// Prefix demoted reports are moved under.
    pub archive_prefix: String,
    /// Number of most-recent reports to retain at the source prefix.
    pub keep_count: usize,
}

impl RetentionPolicy {
    /// Validates the policy invariants.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPolicy` if `keep_count` is zero, a prefix is
    /// empty, or the prefixes are not disjoint.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_policy("<unnamed>", "category name is empty"));
        }
        if self.keep_count == 0 {
            return Err(Error::invalid_policy(self.name.as_str(), "keepCount must be >= 1"));
        }
        if self.source_prefix.is_empty() || self.archive_prefix.is_empty() {
            return Err(Error::invalid_policy(self.name.as_str(), "prefixes must be non-empty"));
        }

        let source = self.source_prefix.trim_end_matches('/');
        let archive = self.archive_prefix.trim_end_matches('/');
        if source.starts_with(archive) || archive.starts_with(source) {
            return Err(Error::invalid_policy(
                self.name.as_str(),
                format!(
                    "source prefix {:?} and archive prefix {:?} must be disjoint",
                    self.source_prefix, self.archive_prefix
                ),
            ));
        }
        Ok(())
    }

    /// Computes the archive destination for a source key: the archive prefix
    /// plus the key's path relative to the source prefix.
    #[must_use]
    pub fn destination_key(&self, key: &str) -> String {
        let relative = key
            .strip_prefix(self.source_prefix.as_str())
            .unwrap_or(key)
            .trim_start_matches('/');
        format!("{}/{relative}", self.archive_prefix.trim_end_matches('/'))
    }
}

/// One retention invocation: a bucket and the categories to process.
///
/// This is the JSON document external triggers (a CI step or scheduler)
/// hand to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Object storage bucket identifier.
    pub bucket: String,
    /// Categories to process, independently of each other.
    pub categories: Vec<RetentionPolicy>,
}
