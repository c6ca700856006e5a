// src/ingest/mod.rs
pub mod normalize;
pub mod providers;
pub mod types;

use crate::ingest::types::{RawRecord, SourceProvider};
use crate::telemetry::ensure_metrics_described;
use metrics::counter;

pub use normalize::{normalize, validate};

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Records gathered from every provider that answered.
#[derive(Debug, Default)]
pub struct CollectOutcome {
    pub records: Vec<RawRecord>,
    pub failed_sources: Vec<&'static str>,
}

/// Fetch from each provider in turn. A failing provider contributes nothing;
/// the others are unaffected.
pub async fn collect(providers: &[Box<dyn SourceProvider>]) -> CollectOutcome {
    ensure_metrics_described();

    let mut out = CollectOutcome::default();
    for p in providers {
        match p.fetch().await {
            Ok(mut v) => {
                tracing::info!(provider = p.name(), fetched = v.len(), "provider fetched");
                counter!("mentions_fetched_total", "provider" => p.name()).increment(v.len() as u64);
                out.records.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(error = ?e, provider = p.name(), "provider error");
                counter!("source_errors_total", "provider" => p.name()).increment(1);
                out.failed_sources.push(p.name());
            }
        }
    }
    out
}
