// src/store/sheets.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Serialize;

use super::{MentionSink, SheetRow};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets `values:append` sink. The caller supplies an OAuth access
/// token (e.g. minted for a service account); this type does not refresh it.
pub struct GoogleSheetsSink {
    client: Client,
    spreadsheet_id: String,
    range: String,
    access_token: String,
    api_base: String,
}

#[derive(Serialize)]
struct ValueRange<'a> {
    #[serde(rename = "majorDimension")]
    major_dimension: &'static str,
    values: Vec<[&'a str; 7]>,
}

impl GoogleSheetsSink {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("building sheets http client")?;
        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
            access_token: access_token.into(),
            api_base: SHEETS_API.to_string(),
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn append_url(&self) -> String {
        format!(
            "{}/{}/values/{}:append",
            self.api_base.trim_end_matches('/'),
            self.spreadsheet_id,
            self.range
        )
    }
}

#[async_trait::async_trait]
impl MentionSink for GoogleSheetsSink {
    async fn append(&self, rows: &[SheetRow]) -> Result<()> {
        if self.access_token.is_empty() {
            bail!("missing Google Sheets access token");
        }
        let body = ValueRange {
            major_dimension: "ROWS",
            values: rows.iter().map(SheetRow::cells).collect(),
        };
        self.client
            .post(self.append_url())
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("sheets append")?
            .error_for_status()
            .context("sheets non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "google_sheets"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_url_shape() {
        let s = GoogleSheetsSink::new("abc123", "Mentions!A1", "tok")
            .unwrap()
            .with_api_base("http://localhost:9/v4/spreadsheets/");
        assert_eq!(
            s.append_url(),
            "http://localhost:9/v4/spreadsheets/abc123/values/Mentions!A1:append"
        );
    }

    #[tokio::test]
    async fn empty_token_is_rejected_before_any_request() {
        let s = GoogleSheetsSink::new("abc", "A1", "").unwrap();
        assert!(s.append(&[]).await.is_err());
    }
}
