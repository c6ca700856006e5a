//! # Aggregation
//! Ordering, summary statistics and keyword relevance over deduplicated mentions.
//! Pure functions; nothing here fails loudly.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::mention::{Mention, Source};

/// Brand terms used when no keyword list is configured.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "branch",
    "@branchapp",
    "branch.io",
    "deep link",
    "deeplink",
    "attribution",
    "mobile link",
    "app link",
    "branch sdk",
    "branch metrics",
    "branch analytics",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub span_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_source: BTreeMap<Source, usize>,
    pub date_range: Option<DateRange>,
    pub avg_text_length: f64,
}

/// Stable sort by parsed timestamp, newest first when `descending`.
/// Any unparseable timestamp aborts the sort and the input order is returned.
pub fn sort_by_timestamp(mentions: Vec<Mention>, descending: bool) -> Vec<Mention> {
    match sort_keys(&mentions) {
        Ok(keys) => {
            let mut indexed: Vec<(DateTime<Utc>, Mention)> = keys.into_iter().zip(mentions).collect();
            if descending {
                indexed.sort_by(|a, b| b.0.cmp(&a.0));
            } else {
                indexed.sort_by(|a, b| a.0.cmp(&b.0));
            }
            info!(
                count = indexed.len(),
                order = if descending { "newest" } else { "oldest" },
                "sorted mentions by timestamp"
            );
            indexed.into_iter().map(|(_, m)| m).collect()
        }
        Err(e) => {
            error!(error = %e, "error sorting mentions by timestamp");
            mentions
        }
    }
}

fn sort_keys(mentions: &[Mention]) -> Result<Vec<DateTime<Utc>>> {
    mentions
        .iter()
        .map(|m| {
            m.parsed_timestamp()
                .ok_or_else(|| anyhow!("unparseable timestamp '{}' on {}", m.timestamp, m.identity_key()))
        })
        .collect()
}

pub fn summarize(mentions: &[Mention]) -> Summary {
    if mentions.is_empty() {
        return Summary::default();
    }

    let mut by_source = BTreeMap::new();
    let mut stamps = Vec::with_capacity(mentions.len());
    let mut total_len = 0usize;
    for m in mentions {
        *by_source.entry(m.source).or_insert(0) += 1;
        if let Some(ts) = m.parsed_timestamp() {
            stamps.push(ts);
        }
        total_len += m.text.chars().count();
    }

    let date_range = match (stamps.iter().min(), stamps.iter().max()) {
        (Some(&earliest), Some(&latest)) => Some(DateRange {
            earliest,
            latest,
            span_days: (latest - earliest).num_days(),
        }),
        _ => None,
    };

    Summary {
        total: mentions.len(),
        by_source,
        date_range,
        avg_text_length: total_len as f64 / mentions.len() as f64,
    }
}

/// Lower-cased, trimmed keywords; blanks dropped.
pub fn keyword_needles<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Text or user contains any needle (case-insensitive). No needles matches everything.
pub fn matches_keywords(m: &Mention, needles: &[String]) -> bool {
    if needles.is_empty() {
        return true;
    }
    let text = m.text.to_lowercase();
    let user = m.user.to_lowercase();
    needles.iter().any(|k| text.contains(k) || user.contains(k))
}

/// Keep mentions whose text or user contains any keyword, in input order.
/// An empty keyword list keeps everything.
pub fn filter_by_keywords<S: AsRef<str>>(mentions: Vec<Mention>, keywords: &[S]) -> Vec<Mention> {
    let needles = keyword_needles(keywords);
    if needles.is_empty() {
        return mentions;
    }

    let before = mentions.len();
    let out: Vec<Mention> = mentions
        .into_iter()
        .filter(|m| matches_keywords(m, &needles))
        .collect();
    info!(before, after = out.len(), "filtered mentions by relevance");
    out
}
