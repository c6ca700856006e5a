// tests/pipeline_e2e.rs
// Full run with in-memory collaborators: 10 mentions, 3 negative.
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use brand_mention_monitor::alert::{AlertNotifier, Message};
use brand_mention_monitor::ingest::providers::json_file::JsonFileProvider;
use brand_mention_monitor::ingest::types::{RawRecord, SourceProvider};
use brand_mention_monitor::sentiment::{SentimentResult, SentimentScorer};
use brand_mention_monitor::store::{MentionSink, SheetRow};
use brand_mention_monitor::{Pipeline, PipelineConfig, SentimentLabel, Source};

/// Negative when the text mentions a crash; score grows with the review number.
struct CrashScorer;

#[async_trait::async_trait]
impl SentimentScorer for CrashScorer {
    async fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.contains("crash") {
                    let n = t.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
                    let score = 0.5 + n.parse::<f64>().unwrap_or(0.0) / 100.0;
                    SentimentResult::new(SentimentLabel::Negative, score)
                } else {
                    SentimentResult::new(SentimentLabel::Positive, 0.9)
                }
            })
            .collect())
    }
    fn name(&self) -> &'static str {
        "crash"
    }
}

#[derive(Default)]
struct Outbox(Mutex<Vec<Message>>);

#[async_trait::async_trait]
impl AlertNotifier for Outbox {
    async fn send(&self, msg: &Message) -> Result<()> {
        self.0.lock().unwrap().push(msg.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "outbox"
    }
}

#[derive(Default)]
struct Memory(Mutex<Vec<SheetRow>>);

#[async_trait::async_trait]
impl MentionSink for Memory {
    async fn append(&self, rows: &[SheetRow]) -> Result<()> {
        self.0.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

struct Failing;

#[async_trait::async_trait]
impl MentionSink for Failing {
    async fn append(&self, _rows: &[SheetRow]) -> Result<()> {
        bail!("quota exceeded")
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

struct Down;

#[async_trait::async_trait]
impl SourceProvider for Down {
    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        bail!("503 from upstream")
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

fn reviews_json() -> String {
    let items: Vec<serde_json::Value> = (1..=10)
        .map(|i| {
            let text = if i <= 3 {
                format!("Review {i}: the app keeps on crashing at launch")
            } else {
                format!("Review {i}: links open exactly where they should")
            };
            serde_json::json!({
                "reviewId": format!("gp-{i}"),
                "userName": format!("user{i}"),
                "content": text,
                "score": 3,
                "at": format!("2024-06-{:02}T08:00:00Z", i),
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

fn config() -> PipelineConfig {
    PipelineConfig {
        keywords: vec![],
        ..Default::default()
    }
}

#[tokio::test]
async fn ten_mentions_three_negative_alerts_with_three_items() {
    let outbox = Arc::new(Outbox::default());
    let memory = Arc::new(Memory::default());
    let pipeline = Pipeline::new(
        vec![Box::new(JsonFileProvider::from_fixture_str(
            Source::GooglePlay,
            &reviews_json(),
        ))],
        Arc::new(CrashScorer),
        outbox.clone(),
        config(),
    )
    .with_sink(memory.clone());

    let report = pipeline.run().await;

    assert_eq!(report.summary.total, 10);
    assert_eq!(report.summary.by_source.get(&Source::GooglePlay), Some(&10));
    assert!(report.threshold.threshold_crossed);
    assert!((report.threshold.negative_ratio - 0.3).abs() < 1e-9);
    assert!(report.alert_sent);
    assert_eq!(report.persisted, Some(true));
    assert_eq!(memory.0.lock().unwrap().len(), 10);

    let sent = outbox.0.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let msg = &sent[0];
    assert!(msg.summary.contains("30.0%"));
    assert_eq!(msg.items.len(), 3);
    // lowest confidence first
    let scores: Vec<&str> = msg.items.iter().map(|i| i.score.as_str()).collect();
    assert_eq!(scores, vec!["0.510", "0.520", "0.530"]);
}

#[tokio::test]
async fn sink_and_source_failures_do_not_stop_the_run() {
    let outbox = Arc::new(Outbox::default());
    let pipeline = Pipeline::new(
        vec![
            Box::new(Down),
            Box::new(JsonFileProvider::from_fixture_str(
                Source::GooglePlay,
                &reviews_json(),
            )),
        ],
        Arc::new(CrashScorer),
        outbox.clone(),
        config(),
    )
    .with_sink(Arc::new(Failing));

    let report = pipeline.run().await;
    assert_eq!(report.failed_sources, vec!["down"]);
    assert_eq!(report.persisted, Some(false));
    assert_eq!(report.summary.total, 10);
    assert!(report.alert_sent);
    assert_eq!(outbox.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn report_serializes_without_mentions() {
    let pipeline = Pipeline::new(
        vec![Box::new(Down)],
        Arc::new(CrashScorer),
        Arc::new(Outbox::default()),
        config(),
    );
    let report = pipeline.run().await;
    let v = serde_json::to_value(&report).unwrap();
    assert!(v.get("mentions").is_none());
    assert_eq!(v["summary"]["total"], 0);
    assert_eq!(v["threshold"]["threshold_crossed"], false);
}
