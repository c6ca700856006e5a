//! Deduplication across and within sources.
//!
//! Two strategies, applied in one stable pass:
//! - identity: `source_id` seen before → drop;
//! - content: SHA-256 of the lower-cased, trimmed text seen before → drop.
//!
//! Synthetic records (demo data drawn from a small fixed sample pool) may repeat
//! the same content up to `SYNTHETIC_CONTENT_LIMIT` times; live records only once.
//! Survivors must then pass `ingest::validate`.

use std::collections::{HashMap, HashSet};

use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::ingest::validate;
use crate::mention::{Mention, Provenance};
use crate::telemetry::ensure_metrics_described;

/// Id fragments that mark generated placeholder data.
pub const SYNTHETIC_ID_MARKERS: [&str; 3] = ["sim_", "fb_sim_", "gp_sim_"];

/// Occurrences of one content hash a synthetic record may still join.
pub const SYNTHETIC_CONTENT_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub input: usize,
    pub kept: usize,
    pub identity_duplicates: usize,
    pub content_duplicates: usize,
    pub invalid: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub kept: Vec<Mention>,
    pub stats: DedupStats,
}

/// Explicit provenance wins; otherwise infer from the id markers.
pub fn is_synthetic(m: &Mention) -> bool {
    m.provenance == Provenance::Synthetic
        || SYNTHETIC_ID_MARKERS.iter().any(|marker| m.id.contains(marker))
}

/// Hex SHA-256 of the lower-cased, trimmed text. `None` for blank text.
pub fn content_hash(text: &str) -> Option<String> {
    let norm = text.trim().to_lowercase();
    if norm.is_empty() {
        return None;
    }
    let digest = Sha256::digest(norm.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Some(out)
}

pub fn deduplicate(mentions: Vec<Mention>) -> DedupOutcome {
    ensure_metrics_described();
    info!(total = mentions.len(), "starting deduplication");

    let mut stats = DedupStats {
        input: mentions.len(),
        ..DedupStats::default()
    };
    let mut seen_ids: HashSet<String> = HashSet::with_capacity(mentions.len());
    let mut seen_content: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(mentions.len());

    for m in mentions {
        let key = m.identity_key();
        if !seen_ids.insert(key.clone()) {
            stats.identity_duplicates += 1;
            continue;
        }

        if let Some(hash) = content_hash(&m.text) {
            let count = seen_content.entry(hash).or_insert(0);
            let limit = if is_synthetic(&m) {
                SYNTHETIC_CONTENT_LIMIT
            } else {
                1
            };
            if *count >= limit {
                stats.content_duplicates += 1;
                continue;
            }
            *count += 1;
        }

        if validate(&m) {
            kept.push(m);
        } else {
            stats.invalid += 1;
            debug!(mention = %key, "dropping invalid mention");
        }
    }

    stats.kept = kept.len();
    info!(
        kept = stats.kept,
        by_id = stats.identity_duplicates,
        by_content = stats.content_duplicates,
        invalid = stats.invalid,
        "deduplication complete"
    );
    counter!("mentions_dedup_identity_total").increment(stats.identity_duplicates as u64);
    counter!("mentions_dedup_content_total").increment(stats.content_duplicates as u64);
    counter!("mentions_invalid_total").increment(stats.invalid as u64);
    counter!("mentions_kept_total").increment(stats.kept as u64);

    DedupOutcome { kept, stats }
}

/// Survivors only.
pub fn deduplicate_mentions(mentions: Vec<Mention>) -> Vec<Mention> {
    deduplicate(mentions).kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::Source;

    fn m(source: Source, id: &str, text: &str) -> Mention {
        Mention::new(source, id, "someone", text, "2024-06-01T12:00:00Z")
    }

    #[test]
    fn identity_duplicates_are_dropped_first() {
        let out = deduplicate(vec![
            m(Source::Twitter, "1", "first version of the text"),
            m(Source::Twitter, "1", "edited version of the text"),
            m(Source::Facebook, "1", "same id but another source"),
        ]);
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.stats.identity_duplicates, 1);
        assert_eq!(out.kept[1].source, Source::Facebook);
    }

    #[test]
    fn content_match_ignores_case_and_outer_whitespace() {
        let out = deduplicate(vec![
            m(Source::Twitter, "1", "Branch links are broken"),
            m(Source::Facebook, "2", "  branch LINKS are broken "),
        ]);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.stats.content_duplicates, 1);
    }

    #[test]
    fn synthetic_content_allows_two() {
        let text = "Love how Branch handles cross-platform linking";
        let out = deduplicate(vec![
            m(Source::Twitter, "sim_1", text),
            m(Source::Twitter, "sim_2", text),
            m(Source::Twitter, "sim_3", text),
        ]);
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.stats.content_duplicates, 1);
    }

    #[test]
    fn live_content_allows_one() {
        let text = "Love how Branch handles cross-platform linking";
        let out = deduplicate(vec![
            m(Source::Twitter, "101", text),
            m(Source::Twitter, "102", text),
            m(Source::Twitter, "103", text),
        ]);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.stats.content_duplicates, 2);
    }

    #[test]
    fn explicit_provenance_counts_as_synthetic() {
        let text = "Generated sample text for the demo";
        let out = deduplicate(vec![
            m(Source::Facebook, "a", text).with_provenance(Provenance::Synthetic),
            m(Source::Facebook, "b", text).with_provenance(Provenance::Synthetic),
        ]);
        assert_eq!(out.kept.len(), 2);
    }

    #[test]
    fn invalid_items_still_claim_their_keys() {
        let mut bad = m(Source::Twitter, "1", "valid length text");
        bad.timestamp = "garbage".into();
        let out = deduplicate(vec![
            bad,
            m(Source::Twitter, "2", "valid length text"),
        ]);
        // The invalid first item consumed the content slot.
        assert!(out.kept.is_empty());
        assert_eq!(out.stats.invalid, 1);
        assert_eq!(out.stats.content_duplicates, 1);
    }

    #[derive(Clone, Default)]
    struct LogBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logs_at(level: tracing::Level, input: Vec<Mention>) -> String {
        let buf = LogBuf::default();
        let writer = buf.clone();
        let sub = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(sub, || deduplicate(input));
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn invalid_mentions_are_noted_at_debug_only() {
        let mut bad = m(Source::Twitter, "1", "valid length text");
        bad.timestamp = "garbage".into();

        let warn_out = logs_at(tracing::Level::WARN, vec![bad.clone()]);
        assert!(warn_out.is_empty(), "unexpected warn output: {warn_out}");

        let debug_out = logs_at(tracing::Level::DEBUG, vec![bad]);
        assert!(debug_out.contains("dropping invalid mention"));
        assert!(debug_out.contains("twitter_1"));
    }

    #[test]
    fn order_is_stable() {
        let out = deduplicate_mentions(vec![
            m(Source::Twitter, "3", "third mention text"),
            m(Source::Twitter, "1", "first mention text"),
            m(Source::Twitter, "2", "second mention text"),
        ]);
        let ids: Vec<_> = out.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        let h = content_hash(" ABC ").unwrap();
        assert_eq!(h.len(), 64);
        assert_eq!(Some(h), content_hash("abc"));
        assert_eq!(content_hash("   "), None);
    }
}
