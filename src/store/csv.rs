// src/store/csv.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

use super::{MentionSink, SheetRow, SHEET_COLUMNS};

/// Local append-only CSV file; the header is written when the file is created.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// RFC 4180 field quoting.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_line<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = cells.into_iter().map(csv_field).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

#[async_trait::async_trait]
impl MentionSink for CsvSink {
    async fn append(&self, rows: &[SheetRow]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let is_new = tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let mut buf = String::new();
        if is_new {
            buf.push_str(&csv_line(SHEET_COLUMNS));
        }
        for r in rows {
            buf.push_str(&csv_line(r.cells()));
        }

        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        f.write_all(buf.as_bytes())
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        f.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}
