// src/ingest/providers/json_file.rs
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;

use crate::ingest::types::{RawRecord, SourceProvider};
use crate::mention::Source;

/// Reads a JSON array of raw records for one source (exports, fixtures).
pub struct JsonFileProvider {
    source: Source,
    mode: Mode,
}

enum Mode {
    File(PathBuf),
    Inline(String),
}

impl JsonFileProvider {
    pub fn from_path(source: Source, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            mode: Mode::File(path.into()),
        }
    }

    pub fn from_fixture_str(source: Source, content: &str) -> Self {
        Self {
            source,
            mode: Mode::Inline(content.to_string()),
        }
    }

    fn parse(&self, content: &str) -> Result<Vec<RawRecord>> {
        let values: Vec<serde_json::Value> =
            serde_json::from_str(content).context("expected a JSON array of records")?;
        let mut out = Vec::with_capacity(values.len());
        for (i, v) in values.into_iter().enumerate() {
            match RawRecord::from_value(self.source, v) {
                Ok(r) => out.push(r),
                // One malformed record is a validation problem, not a source failure.
                Err(e) => tracing::debug!(error = ?e, index = i, source = %self.source, "skipping undecodable record"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for JsonFileProvider {
    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let t0 = std::time::Instant::now();
        let content = match &self.mode {
            Mode::File(p) => tokio::fs::read_to_string(p)
                .await
                .with_context(|| format!("reading {} records from {}", self.source, p.display()))?,
            Mode::Inline(s) => s.clone(),
        };
        if content.trim().is_empty() {
            return Err(anyhow!("empty input for {}", self.source));
        }
        let out = self.parse(&content)?;
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        self.source.as_str()
    }
}
