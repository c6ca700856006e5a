//! Hosted inference scorer (Hugging Face Inference API).
//! Default model: `cardiffnlp/twitter-roberta-base-sentiment`, whose labels are
//! `LABEL_0` (negative), `LABEL_1` (neutral), `LABEL_2` (positive).

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{SentimentResult, SentimentScorer};
use crate::mention::SentimentLabel;

pub const DEFAULT_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment";
const API_BASE: &str = "https://api-inference.huggingface.co/models";
/// Longer inputs are cut before sending; the model only sees ~512 tokens anyway.
const MAX_INPUT_CHARS: usize = 1000;

pub struct HuggingFaceScorer {
    http: reqwest::Client,
    api_token: String,
    endpoint: String,
}

#[derive(Serialize)]
struct Req<'a> {
    inputs: Vec<&'a str>,
    options: ReqOptions,
}

#[derive(Serialize)]
struct ReqOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

impl HuggingFaceScorer {
    pub fn new(api_token: impl Into<String>, model: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("brand-mention-monitor/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building inference http client")?;
        let model = model.unwrap_or(DEFAULT_MODEL);
        Ok(Self {
            http,
            api_token: api_token.into(),
            endpoint: format!("{API_BASE}/{model}"),
        })
    }

    /// Point at a different base URL (self-hosted endpoint, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Model label → three-way class.
pub fn map_label(raw: &str) -> Option<SentimentLabel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "label_0" | "negative" | "neg" => Some(SentimentLabel::Negative),
        "label_1" | "neutral" | "neu" => Some(SentimentLabel::Neutral),
        "label_2" | "positive" | "pos" => Some(SentimentLabel::Positive),
        _ => None,
    }
}

/// Pick the winning label of one text's distribution.
fn top_label(scores: &[LabelScore]) -> SentimentResult {
    let best = scores
        .iter()
        .filter(|s| s.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score));
    match best.and_then(|b| map_label(&b.label).map(|l| (l, b.score))) {
        Some((label, score)) => SentimentResult::new(label, score),
        None => SentimentResult::fallback(Some("no recognizable label in model output".into())),
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait::async_trait]
impl SentimentScorer for HuggingFaceScorer {
    async fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.api_token.is_empty() {
            bail!("missing inference API token");
        }

        let req = Req {
            inputs: texts.iter().map(|t| truncate_chars(t, MAX_INPUT_CHARS)).collect(),
            options: ReqOptions {
                wait_for_model: true,
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&req)
            .send()
            .await
            .context("inference request")?
            .error_for_status()
            .context("inference non-2xx")?;

        let body: Vec<Vec<LabelScore>> = resp.json().await.context("decoding inference output")?;
        if body.len() != texts.len() {
            return Err(anyhow!(
                "inference returned {} rows for {} inputs",
                body.len(),
                texts.len()
            ));
        }
        Ok(body.iter().map(|row| top_label(row)).collect())
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}
