// tests/metrics_pipeline.rs
#![cfg(feature = "strict-metrics")]
use std::sync::Arc;

use brand_mention_monitor::alert::LogNotifier;
use brand_mention_monitor::ingest::providers::synthetic::SyntheticProvider;
use brand_mention_monitor::sentiment::LexiconScorer;
use brand_mention_monitor::store::CsvSink;
use brand_mention_monitor::telemetry::ensure_metrics_described;
use brand_mention_monitor::{Pipeline, PipelineConfig, Source};
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::test]
async fn metrics_exposed_after_run() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");
    ensure_metrics_described();

    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        vec![Box::new(SyntheticProvider::seeded(Source::Twitter, 25, 7))],
        Arc::new(LexiconScorer::new()),
        Arc::new(LogNotifier),
        PipelineConfig::default(),
    )
    .with_sink(Arc::new(CsvSink::new(dir.path().join("m.csv"))));
    let report = pipeline.run().await;

    // 10 distinct sample texts, two copies each allowed for synthetic data
    assert_eq!(report.summary.total, 20);
    assert_eq!(report.dedup.content_duplicates, 5);

    let out = handle.render();
    for needle in [
        "mentions_fetched_total",
        "mentions_dedup_content_total",
        "mentions_kept_total",
        "sentiment_chunk_ms",
        "rows_persisted_total",
        "pipeline_negative_ratio",
        "pipeline_last_run_ts",
    ] {
        assert!(out.contains(needle), "exposition missing '{needle}'\n{out}");
    }
}
