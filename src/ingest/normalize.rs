// src/ingest/normalize.rs
//! Raw record → `Mention`, plus the validation gate the deduplicator applies.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;

use crate::ingest::normalize_text;
use crate::ingest::types::{RawFields, RawRecord};
use crate::mention::{parse_timestamp, Mention, PlatformSpecific};

pub const MIN_TEXT_CHARS: usize = 10;
pub const MAX_TEXT_CHARS: usize = 5000;

/// Convert any source's raw record into the unified shape. No validation here.
pub fn normalize(raw: RawRecord) -> Mention {
    let source = raw.source();
    let platform_specific = match &raw {
        RawRecord::Twitter(r) => PlatformSpecific::Tweet {
            tweet_metrics: numeric_metrics(&r.fields),
        },
        RawRecord::Facebook(r) => PlatformSpecific::Post {
            post_metrics: numeric_metrics(&r.fields),
        },
        RawRecord::GooglePlay(r) => {
            let from_metrics = numeric_metrics(&r.fields).get("rating").copied();
            PlatformSpecific::Review {
                review_rating: r.rating.or(from_metrics).unwrap_or(0.0),
                app_info: r.app_info.clone(),
            }
        }
    };

    let fields = match raw {
        RawRecord::Twitter(r) => r.fields,
        RawRecord::Facebook(r) => r.fields,
        RawRecord::GooglePlay(r) => r.fields,
    };
    let metrics = numeric_metrics(&fields);
    let now = Utc::now();

    Mention {
        source,
        id: fields.id.trim().to_string(),
        user: fields
            .user
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        text: normalize_text(fields.text.as_deref().unwrap_or_default()),
        timestamp: fields
            .timestamp
            .unwrap_or_else(|| now.to_rfc3339()),
        url: fields.url.filter(|u| !u.trim().is_empty()),
        metrics,
        processed_at: now,
        platform_specific: Some(platform_specific),
        provenance: fields.provenance.unwrap_or_default(),
        sentiment_label: None,
        sentiment_score: None,
    }
}

fn numeric_metrics(fields: &RawFields) -> BTreeMap<String, f64> {
    fields
        .metrics
        .iter()
        .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
        .collect()
}

/// Required fields present, timestamp parseable, trimmed text within bounds.
/// Source membership is guaranteed by the `Source` enum.
pub fn validate(m: &Mention) -> bool {
    for (field, value) in [
        ("id", &m.id),
        ("user", &m.user),
        ("text", &m.text),
        ("timestamp", &m.timestamp),
    ] {
        if value.trim().is_empty() {
            debug!(field, id = %m.id, "missing or empty required field");
            return false;
        }
    }

    if parse_timestamp(&m.timestamp).is_none() {
        debug!(timestamp = %m.timestamp, "invalid timestamp format");
        return false;
    }

    let len = m.text.trim().chars().count();
    if len < MIN_TEXT_CHARS {
        debug!(len, "text content too short");
        return false;
    }
    if len > MAX_TEXT_CHARS {
        debug!(len, "text content too long");
        return false;
    }

    true
}
