// src/ingest/types.rs
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::mention::{Provenance, Source};

/// Fields every source delivers, under whichever key that source uses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFields {
    #[serde(default, alias = "reviewId", alias = "post_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "username", alias = "userName", alias = "author")]
    pub user: Option<String>,
    #[serde(default, alias = "content", alias = "message")]
    pub text: Option<String>,
    #[serde(default, alias = "created_at", alias = "created_time", alias = "at", alias = "date")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "permalink_url")]
    pub url: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, serde_json::Value>,
    /// Explicit provenance when the producer knows it.
    #[serde(default)]
    pub provenance: Option<Provenance>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TweetRecord {
    #[serde(flatten)]
    pub fields: RawFields,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostRecord {
    #[serde(flatten)]
    pub fields: RawFields,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReviewRecord {
    #[serde(flatten)]
    pub fields: RawFields,
    #[serde(default, alias = "score")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub app_info: BTreeMap<String, String>,
}

/// One raw record per source shape. Tagged by `source` when read from mixed dumps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawRecord {
    Twitter(TweetRecord),
    Facebook(PostRecord),
    GooglePlay(ReviewRecord),
}

impl RawRecord {
    pub fn source(&self) -> Source {
        match self {
            RawRecord::Twitter(_) => Source::Twitter,
            RawRecord::Facebook(_) => Source::Facebook,
            RawRecord::GooglePlay(_) => Source::GooglePlay,
        }
    }

    pub fn fields(&self) -> &RawFields {
        match self {
            RawRecord::Twitter(r) => &r.fields,
            RawRecord::Facebook(r) => &r.fields,
            RawRecord::GooglePlay(r) => &r.fields,
        }
    }

    /// Read an untagged record whose source is known from context (e.g. a per-source export).
    pub fn from_value(source: Source, value: serde_json::Value) -> Result<Self> {
        let rec = match source {
            Source::Twitter => RawRecord::Twitter(
                serde_json::from_value(value).context("decoding twitter record")?,
            ),
            Source::Facebook => RawRecord::Facebook(
                serde_json::from_value(value).context("decoding facebook record")?,
            ),
            Source::GooglePlay => RawRecord::GooglePlay(
                serde_json::from_value(value).context("decoding google_play record")?,
            ),
        };
        Ok(rec)
    }
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawRecord>>;
    fn name(&self) -> &'static str;
}

fn string_or_number<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
