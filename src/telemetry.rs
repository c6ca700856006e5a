//! Logging and metrics setup shared by the binary and the pipeline.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// One-time metrics registration (so series show up in the exposition output).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("mentions_fetched_total", "Raw records returned by providers.");
        describe_histogram!("ingest_parse_ms", "File provider parse time in milliseconds.");
        describe_counter!("source_errors_total", "Provider fetch/parse errors.");
        describe_counter!(
            "mentions_dedup_identity_total",
            "Mentions dropped because source+id was already seen."
        );
        describe_counter!(
            "mentions_dedup_content_total",
            "Mentions dropped because their normalized text was already seen."
        );
        describe_counter!("mentions_invalid_total", "Mentions failing validation.");
        describe_counter!("mentions_kept_total", "Mentions kept after deduplication.");
        describe_counter!(
            "sentiment_chunk_failures_total",
            "Sentiment chunks that fell back to neutral."
        );
        describe_histogram!("sentiment_chunk_ms", "Sentiment scoring time per chunk in milliseconds.");
        describe_counter!("alerts_sent_total", "Alerts delivered to the transport.");
        describe_counter!("rows_persisted_total", "Rows appended to the sink.");
        describe_gauge!("pipeline_negative_ratio", "Negative ratio of the last run.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Install a Prometheus recorder; the handle renders the exposition text.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    Ok(handle)
}

/// `RUST_LOG` wins; otherwise `info`. `json` switches to the JSON formatter.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
