//! Build-id extraction and newest-first ordering.
//!
//! Keys follow the producer convention `{category}-report-{buildId}.{ext}`.
//! The build id is the integer between the last `-` and the extension `.`
//! of the key's final path segment. Keys that do not parse are excluded
//! from ranking and reported back to the caller; they are never archived
//! and never abort the batch.

use tracing::warn;

use stowage_core::ObjectMeta;

use crate::report::ReportObject;

/// Outcome of ranking one category's listing.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Parseable objects, descending by build id.
    pub ranked: Vec<ReportObject>,
    /// Keys excluded because no build id could be extracted.
    pub unparseable: Vec<String>,
}

/// Extracts the build id from a storage key.
///
/// Returns `None` when the final path segment has no `-`-delimited integer
/// token before its extension (e.g. `trivy-report-abc.json`).
#[must_use]
pub fn parse_build_id(key: &str) -> Option<u64> {
    let segment = key.rsplit('/').next().unwrap_or(key);
    let (_, tail) = segment.rsplit_once('-')?;
    let token = tail.split('.').next().unwrap_or(tail);
    token.parse().ok()
}

/// Orders a category's listing newest-first.
///
/// Primary order is build id descending. Equal build ids (which a correct
/// producer never emits) tie-break on key descending, keeping repeated runs
/// deterministic. Unparseable keys are logged and collected separately.
#[must_use]
pub fn rank(category: &str, listed: Vec<ObjectMeta>) -> Ranking {
    let mut ranking = Ranking::default();

    for meta in listed {
        match parse_build_id(&meta.key) {
            Some(build_id) => ranking.ranked.push(ReportObject {
                key: meta.key,
                build_id,
            }),
            None => {
                warn!(
                    category = %category,
                    key = %meta.key,
                    error = "UnparseableKey",
                    "excluding object with unparseable build id"
                );
                ranking.unparseable.push(meta.key);
            }
        }
    }

    ranking
        .ranked
        .sort_by(|a, b| b.build_id.cmp(&a.build_id).then_with(|| b.key.cmp(&a.key)));
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(key: &str) -> ObjectMeta {
        ObjectMeta {
            key: key.to_string(),
            size: 1,
            last_modified: None,
        }
    }

    #[test]
    fn parses_conventional_key() {
        assert_eq!(parse_build_id("sonar-report-123.json"), Some(123));
    }

    #[test]
    fn parses_key_with_directory_prefix() {
        assert_eq!(
            parse_build_id("reports/sonar/sonar-report-7.json"),
            Some(7)
        );
    }

    #[test]
    fn ignores_dashes_in_earlier_segments() {
        // Only the final path segment participates in extraction.
        assert_eq!(
            parse_build_id("trivy-fs/2025-01-01/trivy-report-9.sarif"),
            Some(9)
        );
    }

    #[test]
    fn only_first_dot_terminates_the_token() {
        assert_eq!(parse_build_id("sonar-report-5.json.gz"), Some(5));
    }

    #[test]
    fn rejects_non_integer_token() {
        assert_eq!(parse_build_id("trivy-report-abc.json"), None);
    }

    #[test]
    fn rejects_key_without_dash() {
        assert_eq!(parse_build_id("report.json"), None);
    }

    #[test]
    fn rejects_empty_token() {
        assert_eq!(parse_build_id("sonar-report-.json"), None);
    }

    #[test]
    fn token_after_last_dash_is_always_unsigned() {
        // Extraction splits at the last '-', so "-3" can never reach the
        // parser as a negative number.
        assert_eq!(parse_build_id("sonar-report--3.json"), Some(3));
        assert_eq!(parse_build_id("x--.json"), None);
    }

    #[test]
    fn ranks_strictly_descending() {
        let listed = vec![
            meta("r/a-report-2.json"),
            meta("r/a-report-5.json"),
            meta("r/a-report-1.json"),
            meta("r/a-report-4.json"),
            meta("r/a-report-3.json"),
        ];
        let ranking = rank("a", listed);
        let ids: Vec<u64> = ranking.ranked.iter().map(|o| o.build_id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
        assert!(ranking.unparseable.is_empty());
    }

    #[test]
    fn equal_build_ids_tie_break_on_key_descending() {
        let listed = vec![meta("r/a-report-7.json"), meta("r/b-report-7.json")];
        let ranking = rank("a", listed);
        assert_eq!(ranking.ranked[0].key, "r/b-report-7.json");
        assert_eq!(ranking.ranked[1].key, "r/a-report-7.json");
    }

    #[test]
    fn tie_break_is_deterministic_across_input_orders() {
        let forward = rank(
            "a",
            vec![meta("r/a-report-7.json"), meta("r/b-report-7.json")],
        );
        let reverse = rank(
            "a",
            vec![meta("r/b-report-7.json"), meta("r/a-report-7.json")],
        );
        assert_eq!(forward.ranked, reverse.ranked);
    }

    #[test]
    fn unparseable_keys_are_collected_not_dropped() {
        let listed = vec![
            meta("r/a-report-1.json"),
            meta("r/trivy-report-abc.json"),
            meta("r/a-report-2.json"),
        ];
        let ranking = rank("a", listed);
        assert_eq!(ranking.ranked.len(), 2);
        assert_eq!(ranking.unparseable, vec!["r/trivy-report-abc.json"]);
    }
}
