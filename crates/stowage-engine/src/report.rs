//! Report objects, archive actions, and the invocation summary.

use serde::{Deserialize, Serialize};

/// One stored report admitted to ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportObject {
    /// Storage key, unique within the bucket.
    pub key: String,
    /// Build identifier extracted from the key. Sole ordering key.
    pub build_id: u64,
}

/// Status of one archive action.
///
/// Success path is `Planned -> Copied -> Deleted`. A failed copy or
/// verification leaves the action `Failed` with the source untouched; a
/// failed delete leaves it `Failed` with a tolerated duplicate. Actions
/// not attempted before the run deadline are `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// Move planned, not yet attempted.
    Planned,
    /// Copy confirmed at the destination, source not yet deleted.
    Copied,
    /// Source deleted; the move is complete.
    Deleted,
    /// Copy, verification, or delete failed.
    Failed,
    /// Not attempted (run deadline reached).
    Skipped,
}

/// A planned or executed move of one demoted object.
///
/// Actions live only for the duration of one invocation; nothing is
/// persisted.
#[derive(Debug, Clone)]
pub struct ArchiveAction {
    /// The object being moved.
    pub object: ReportObject,
    /// Destination key under the archive prefix.
    pub destination_key: String,
    /// Current status.
    pub status: ActionStatus,
    /// Failure description, when `status` is `Failed`.
    pub error: Option<String>,
}

impl ArchiveAction {
    /// Creates a planned action for `object` targeting `destination_key`.
    #[must_use]
    pub fn planned(object: ReportObject, destination_key: String) -> Self {
        Self {
            object,
            destination_key,
            status: ActionStatus::Planned,
            error: None,
        }
    }
}

/// Per-category outcome counters.
///
/// Conservation invariant: `kept + moved + failed + skipped + unparseable`
/// equals the number of objects listed for the category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// Category identifier.
    pub category: String,
    /// Objects left at the source prefix (the keep set).
    pub kept: usize,
    /// Objects fully moved to the archive prefix.
    pub moved: usize,
    /// Objects whose move failed (retried next invocation).
    pub failed: usize,
    /// Objects not attempted before the deadline.
    pub skipped: usize,
    /// Objects excluded from ranking because their key did not parse.
    pub unparseable: usize,
    /// Failure descriptions, per-object and category-level.
    pub errors: Vec<String>,
}

impl CategorySummary {
    /// Creates an empty summary for `category`.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    /// Total objects accounted for by this summary.
    #[must_use]
    pub fn total(&self) -> usize {
        self.kept + self.moved + self.failed + self.skipped + self.unparseable
    }

    /// Whether the category completed with nothing left behind.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && self.errors.is_empty()
    }
}

/// Overall invocation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every category completed with zero failures and zero skips.
    Ok,
    /// Some moves failed or were skipped, but every category produced a
    /// listing.
    Partial,
    /// At least one category could not be listed at all.
    Error,
}

/// The invocation result document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Overall status.
    pub status: RunStatus,
    /// One summary per configured category, in request order.
    pub per_category: Vec<CategorySummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_conservation_total() {
        let summary = CategorySummary {
            category: "sonar".to_string(),
            kept: 3,
            moved: 2,
            failed: 1,
            skipped: 1,
            unparseable: 1,
            errors: vec!["copy failed".to_string()],
        };
        assert_eq!(summary.total(), 8);
        assert!(!summary.is_clean());
    }

    #[test]
    fn report_serializes_wire_format() {
        let report = RunReport {
            status: RunStatus::Partial,
            per_category: vec![CategorySummary::new("sonar")],
        };
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["status"], "partial");
        assert!(json["perCategory"].is_array());
        assert_eq!(json["perCategory"][0]["category"], "sonar");
    }
}
