// src/config/mod.rs
//! Run configuration: TOML or JSON file, then environment overrides.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::DEFAULT_KEYWORDS;
use crate::mention::Source;
use crate::sentiment::DEFAULT_BATCH_SIZE;
use crate::threshold::DEFAULT_THRESHOLD;

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const ENV_THRESHOLD: &str = "ALERT_THRESHOLD";
pub const ENV_SLACK_WEBHOOK: &str = "SLACK_WEBHOOK_URL";
pub const ENV_HF_TOKEN: &str = "HF_API_TOKEN";
pub const ENV_SHEETS_TOKEN: &str = "GOOGLE_SHEETS_TOKEN";

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
fn default_true() -> bool {
    true
}
fn default_synthetic_count() -> usize {
    20
}

/// One file-backed source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub source: Source,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    Lexicon,
    Huggingface,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentConfig {
    #[serde(default)]
    pub provider: ScorerKind,
    #[serde(default)]
    pub model: Option<String>,
    /// Usually left out of the file and taken from `HF_API_TOKEN`.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Csv,
    GoogleSheets,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("data/mentions.csv")
}
fn default_range() -> String {
    "Sheet1!A1".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            csv_path: default_csv_path(),
            spreadsheet_id: None,
            range: default_range(),
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default, skip_serializing)]
    pub slack_webhook_url: Option<String>,
    /// Per-attempt webhook timeout.
    #[serde(default = "default_alert_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts, backing off 500ms, 1s, 2s... between them.
    #[serde(default = "default_alert_retries")]
    pub retries: u8,
}

fn default_alert_timeout_secs() -> u64 {
    5
}
fn default_alert_retries() -> u8 {
    3
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            slack_webhook_url: None,
            timeout_secs: default_alert_timeout_secs(),
            retries: default_alert_retries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Negative ratio at or above which an alert fires.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Relevance keywords; an empty list disables the filter.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub sort_descending: bool,
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
    /// Generate placeholder data for sources without an input file.
    #[serde(default)]
    pub synthetic: bool,
    #[serde(default = "default_synthetic_count")]
    pub synthetic_count: usize,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub alert: AlertConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            batch_size: default_batch_size(),
            keywords: default_keywords(),
            sort_descending: true,
            inputs: Vec::new(),
            synthetic: false,
            synthetic_count: default_synthetic_count(),
            sentiment: SentimentConfig::default(),
            store: StoreConfig::default(),
            alert: AlertConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $MONITOR_CONFIG_PATH
    /// 2) config/monitor.toml
    /// 3) config/monitor.json
    /// 4) defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/monitor.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/monitor.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// Environment wins over file values for secrets and the threshold.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(t) = std::env::var(ENV_THRESHOLD)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
        {
            self.threshold = t;
        }
        if let Some(url) = non_empty_env(ENV_SLACK_WEBHOOK) {
            self.alert.slack_webhook_url = Some(url);
        }
        if let Some(tok) = non_empty_env(ENV_HF_TOKEN) {
            self.sentiment.api_token = Some(tok);
        }
        if let Some(tok) = non_empty_env(ENV_SHEETS_TOKEN) {
            self.store.access_token = Some(tok);
        }
        self.sanitized()
    }

    /// Clamp threshold to [0, 1] (default when non-finite); batch size at least 1.
    pub fn sanitized(mut self) -> Self {
        self.threshold = if self.threshold.is_finite() {
            self.threshold.clamp(0.0, 1.0)
        } else {
            default_threshold()
        };
        self.batch_size = self.batch_size.max(1);
        self.alert.timeout_secs = self.alert.timeout_secs.max(1);
        self.alert.retries = self.alert.retries.max(1);
        self.keywords = self
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<PipelineConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => serde_json::from_str(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| toml::from_str(s).map_err(anyhow::Error::from))
            .map_err(|_| anyhow!("unsupported config format")),
    }
}
