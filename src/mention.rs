//! mention.rs — the unified record every source is normalized into.
//!
//! A `Mention` is built once by the normalizer and then only read, except for
//! the sentiment fields which the merger attaches later.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin system of a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Twitter,
    Facebook,
    GooglePlay,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Twitter, Source::Facebook, Source::GooglePlay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Twitter => "twitter",
            Source::Facebook => "facebook",
            Source::GooglePlay => "google_play",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" => Ok(Source::Twitter),
            "facebook" => Ok(Source::Facebook),
            "google_play" | "googleplay" => Ok(Source::GooglePlay),
            other => Err(anyhow!(
                "unknown source '{other}', expected one of twitter, facebook, google_play"
            )),
        }
    }
}

/// Three-way sentiment class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a record came from. Synthetic records get a relaxed content-dedup policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    #[default]
    Live,
    Synthetic,
}

/// Fields that only make sense for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformSpecific {
    Tweet {
        tweet_metrics: BTreeMap<String, f64>,
    },
    Post {
        post_metrics: BTreeMap<String, f64>,
    },
    Review {
        review_rating: f64,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        app_info: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub source: Source,
    pub id: String,
    pub user: String,
    pub text: String,
    /// ISO-8601 as delivered by the source; checked by `validate`.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    pub processed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_specific: Option<PlatformSpecific>,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_label: Option<SentimentLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
}

impl Mention {
    /// Minimal constructor; the normalizer fills the rest.
    pub fn new(
        source: Source,
        id: impl Into<String>,
        user: impl Into<String>,
        text: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            source,
            id: id.into(),
            user: user.into(),
            text: text.into(),
            timestamp: timestamp.into(),
            url: None,
            metrics: BTreeMap::new(),
            processed_at: Utc::now(),
            platform_specific: None,
            provenance: Provenance::Live,
            sentiment_label: None,
            sentiment_score: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Attach sentiment. Consumes the mention so the original stays untouched.
    pub fn with_sentiment(mut self, label: SentimentLabel, score: f64) -> Self {
        self.sentiment_label = Some(label);
        self.sentiment_score = Some(score);
        self
    }

    /// `source_id`, unique across the working set after dedup.
    pub fn identity_key(&self) -> String {
        format!("{}_{}", self.source, self.id)
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    pub fn has_sentiment(&self) -> bool {
        self.sentiment_label.is_some() && self.sentiment_score.is_some()
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (trailing `Z` or explicit offset), basic-format offsets
/// such as `+0000` or `+05`, naive date-times
/// (interpreted as UTC, fractional seconds allowed) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // basic-format offsets: +0000, +05
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
