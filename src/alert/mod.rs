//! Alert message model, formatting and transport.
//!
//! `format` never fails: anything unexpected turns into a one-line plain
//! message so an alert can still go out.

pub mod slack;

use anyhow::{bail, Result};
use metrics::counter;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::threshold::SentimentThresholdResult;

pub use slack::SlackNotifier;

pub const EXCERPT_MAX_CHARS: usize = 200;
pub const ALERT_TITLE: &str = "Negative sentiment alert";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertItem {
    pub source: String,
    pub user: String,
    /// Three decimals.
    pub score: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub title: String,
    pub summary: String,
    pub items: Vec<AlertItem>,
    /// Set only when structured formatting failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_text: Option<String>,
}

impl Message {
    pub fn is_fallback(&self) -> bool {
        self.fallback_text.is_some()
    }

    /// Plain rendering for logs and text-only transports.
    pub fn to_plain_text(&self) -> String {
        if let Some(text) = &self.fallback_text {
            return text.clone();
        }
        let mut out = format!("{}\n{}", self.title, self.summary);
        for (i, it) in self.items.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. [{}] @{} (score {}): {}",
                i + 1,
                it.source,
                it.user,
                it.score,
                it.excerpt
            ));
            if let Some(link) = &it.link {
                out.push_str(&format!(" <{link}>"));
            }
        }
        out
    }
}

/// Cut to `max` chars, appending `...` when something was removed.
pub fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

pub fn format(result: &SentimentThresholdResult, total_mentions: usize) -> Message {
    match try_format(result, total_mentions) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "alert formatting failed; using plain fallback");
            fallback(result.negative_ratio, total_mentions)
        }
    }
}

fn try_format(result: &SentimentThresholdResult, total_mentions: usize) -> Result<Message> {
    let ratio = result.negative_ratio;
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        bail!("negative ratio out of range: {ratio}");
    }

    let items = result
        .top_negative
        .iter()
        .map(|m| AlertItem {
            source: m.source.to_string(),
            user: m.user.clone(),
            score: format!("{:.3}", m.sentiment_score.unwrap_or_default()),
            excerpt: excerpt(&m.text, EXCERPT_MAX_CHARS),
            link: m.url.clone().filter(|u| !u.is_empty()),
        })
        .collect();

    Ok(Message {
        title: ALERT_TITLE.to_string(),
        summary: format!(
            "{:.1}% of {} mentions are negative",
            ratio * 100.0,
            total_mentions
        ),
        items,
        fallback_text: None,
    })
}

fn fallback(ratio: f64, total_mentions: usize) -> Message {
    let pct = if ratio.is_finite() { ratio * 100.0 } else { 0.0 };
    let line = format!(
        "Negative sentiment alert: {:.1}% negative across {} mentions",
        pct, total_mentions
    );
    Message {
        title: ALERT_TITLE.to_string(),
        summary: line.clone(),
        items: Vec::new(),
        fallback_text: Some(line),
    }
}

/// Outbound alert transport.
#[async_trait::async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send(&self, msg: &Message) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Writes the alert to the log; used for dry runs.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl AlertNotifier for LogNotifier {
    async fn send(&self, msg: &Message) -> Result<()> {
        info!(alert = %msg.to_plain_text(), "alert (log only)");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Deliver and report success; failures are logged, not raised.
pub async fn send_alert(notifier: &dyn AlertNotifier, msg: &Message) -> bool {
    match notifier.send(msg).await {
        Ok(()) => {
            counter!("alerts_sent_total", "transport" => notifier.name()).increment(1);
            info!(transport = notifier.name(), items = msg.items.len(), "alert sent");
            true
        }
        Err(e) => {
            error!(error = ?e, transport = notifier.name(), "alert delivery failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::{Mention, SentimentLabel, Source};

    fn neg(id: &str, text: &str, score: f64) -> Mention {
        Mention::new(Source::GooglePlay, id, "ana", text, "2024-01-01T00:00:00Z")
            .with_sentiment(SentimentLabel::Negative, score)
    }

    #[test]
    fn formats_summary_and_items() {
        let res = SentimentThresholdResult {
            threshold_crossed: true,
            negative_ratio: 0.3,
            top_negative: vec![
                neg("1", "App crashes constantly", 0.12345).with_url("https://x.test/1"),
                neg("2", "Login is broken", 0.5),
            ],
        };
        let msg = format(&res, 10);
        assert!(!msg.is_fallback());
        assert_eq!(msg.summary, "30.0% of 10 mentions are negative");
        assert_eq!(msg.items.len(), 2);
        assert_eq!(msg.items[0].score, "0.123");
        assert_eq!(msg.items[0].source, "google_play");
        assert_eq!(msg.items[0].link.as_deref(), Some("https://x.test/1"));
        assert_eq!(msg.items[1].link, None);
    }

    #[test]
    fn long_text_is_excerpted() {
        let long = "x".repeat(250);
        let res = SentimentThresholdResult {
            threshold_crossed: true,
            negative_ratio: 1.0,
            top_negative: vec![neg("1", &long, 0.9)],
        };
        let msg = format(&res, 1);
        assert_eq!(msg.items[0].excerpt.chars().count(), 203);
        assert!(msg.items[0].excerpt.ends_with("..."));
        assert_eq!(excerpt(&"y".repeat(200), 200), "y".repeat(200));
    }

    #[test]
    fn bad_ratio_falls_back_to_plain_line() {
        let res = SentimentThresholdResult {
            threshold_crossed: true,
            negative_ratio: f64::NAN,
            top_negative: vec![],
        };
        let msg = format(&res, 7);
        assert!(msg.is_fallback());
        assert!(msg.items.is_empty());
        assert_eq!(
            msg.to_plain_text(),
            "Negative sentiment alert: 0.0% negative across 7 mentions"
        );
    }

    #[test]
    fn plain_text_lists_items() {
        let res = SentimentThresholdResult {
            threshold_crossed: true,
            negative_ratio: 0.5,
            top_negative: vec![neg("1", "Support never answers", 0.4)],
        };
        let text = format(&res, 2).to_plain_text();
        assert!(text.contains("50.0% of 2 mentions"));
        assert!(text.contains("1. [google_play] @ana (score 0.400): Support never answers"));
    }

    struct Failing;

    #[async_trait::async_trait]
    impl AlertNotifier for Failing {
        async fn send(&self, _msg: &Message) -> Result<()> {
            anyhow::bail!("webhook down")
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn delivery_status_is_reported() {
        let msg = format(&SentimentThresholdResult::default(), 0);
        assert!(send_alert(&LogNotifier, &msg).await);
        assert!(!send_alert(&Failing, &msg).await);
    }
}
