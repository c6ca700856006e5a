// src/store/mod.rs
//! Spreadsheet persistence: row layout plus append-only sinks.

pub mod csv;
pub mod sheets;

use anyhow::Result;
use metrics::counter;
use serde::Serialize;
use tracing::{error, info};

use crate::mention::Mention;

pub use self::csv::CsvSink;
pub use self::sheets::GoogleSheetsSink;

pub const SHEET_COLUMNS: [&str; 7] = [
    "timestamp",
    "source",
    "id",
    "user",
    "text",
    "sentiment_label",
    "sentiment_score",
];
pub const TEXT_MAX_CHARS: usize = 1000;

/// One spreadsheet row, columns in `SHEET_COLUMNS` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub timestamp: String,
    pub source: String,
    pub id: String,
    pub user: String,
    pub text: String,
    pub sentiment_label: String,
    pub sentiment_score: String,
}

impl SheetRow {
    pub fn from_mention(m: &Mention) -> Self {
        let timestamp = m
            .parsed_timestamp()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| m.timestamp.clone());
        Self {
            timestamp,
            source: m.source.to_string(),
            id: m.id.clone(),
            user: m.user.clone(),
            text: sheet_text(&m.text),
            sentiment_label: m
                .sentiment_label
                .map(|l| l.to_string())
                .unwrap_or_default(),
            sentiment_score: m
                .sentiment_score
                .map(|s| format!("{s:.4}"))
                .unwrap_or_default(),
        }
    }

    pub fn cells(&self) -> [&str; 7] {
        [
            self.timestamp.as_str(),
            self.source.as_str(),
            self.id.as_str(),
            self.user.as_str(),
            self.text.as_str(),
            self.sentiment_label.as_str(),
            self.sentiment_score.as_str(),
        ]
    }
}

/// Newlines become spaces; cut at `TEXT_MAX_CHARS` with a `...` marker.
pub fn sheet_text(text: &str) -> String {
    let flat = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    if flat.chars().count() <= TEXT_MAX_CHARS {
        return flat;
    }
    let mut out: String = flat.chars().take(TEXT_MAX_CHARS).collect();
    out.push_str("...");
    out
}

/// Append-only row sink.
#[async_trait::async_trait]
pub trait MentionSink: Send + Sync {
    async fn append(&self, rows: &[SheetRow]) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Write every mention as a row; report success instead of failing the run.
pub async fn persist(sink: &dyn MentionSink, mentions: &[Mention]) -> bool {
    if mentions.is_empty() {
        info!(sink = sink.name(), "nothing to persist");
        return true;
    }
    let rows: Vec<SheetRow> = mentions.iter().map(SheetRow::from_mention).collect();
    match sink.append(&rows).await {
        Ok(()) => {
            counter!("rows_persisted_total", "sink" => sink.name()).increment(rows.len() as u64);
            info!(sink = sink.name(), rows = rows.len(), "rows persisted");
            true
        }
        Err(e) => {
            error!(error = ?e, sink = sink.name(), "persisting rows failed");
            false
        }
    }
}
