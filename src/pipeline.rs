// src/pipeline.rs
//! One monitoring run: collect → normalize → relevance → dedup → sort →
//! summarize → score → evaluate → persist → alert.
//!
//! Every collaborator is passed in by the caller; stages absorb their own
//! failures so a run always produces a report.

use std::sync::Arc;

use metrics::gauge;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{keyword_needles, matches_keywords, sort_by_timestamp, summarize, Summary};
use crate::alert::{self, AlertNotifier};
use crate::config::PipelineConfig;
use crate::dedup::{deduplicate, DedupStats};
use crate::ingest::{collect, normalize, types::SourceProvider};
use crate::mention::{Mention, Source};
use crate::sentiment::{score_mentions, DynScorer};
use crate::store::{persist, MentionSink};
use crate::telemetry::ensure_metrics_described;
use crate::threshold::{evaluate, SentimentThresholdResult};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub summary: Summary,
    pub dedup: DedupStats,
    pub threshold: SentimentThresholdResult,
    pub failed_sources: Vec<&'static str>,
    /// `None` when no sink is configured.
    pub persisted: Option<bool>,
    pub alert_sent: bool,
    /// Final mentions, sorted and scored.
    #[serde(skip)]
    pub mentions: Vec<Mention>,
}

pub struct Pipeline {
    providers: Vec<Box<dyn SourceProvider>>,
    scorer: DynScorer,
    sink: Option<Arc<dyn MentionSink>>,
    notifier: Arc<dyn AlertNotifier>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        providers: Vec<Box<dyn SourceProvider>>,
        scorer: DynScorer,
        notifier: Arc<dyn AlertNotifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            providers,
            scorer,
            sink: None,
            notifier,
            config,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn MentionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub async fn run(&self) -> PipelineReport {
        ensure_metrics_described();

        let collected = collect(&self.providers).await;
        let normalized: Vec<Mention> = collected.records.into_iter().map(normalize).collect();
        let relevant = self.relevant(normalized);

        let deduped = deduplicate(relevant);
        let sorted = sort_by_timestamp(deduped.kept, self.config.sort_descending);
        let summary = summarize(&sorted);

        let scored = score_mentions(self.scorer.as_ref(), sorted, self.config.batch_size).await;
        let threshold = evaluate(&scored, self.config.threshold);
        gauge!("pipeline_negative_ratio").set(threshold.negative_ratio);

        let persisted = match &self.sink {
            Some(sink) => Some(persist(sink.as_ref(), &scored).await),
            None => None,
        };

        let alert_sent = if threshold.threshold_crossed {
            let msg = alert::format(&threshold, scored.len());
            alert::send_alert(self.notifier.as_ref(), &msg).await
        } else {
            false
        };

        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        if !collected.failed_sources.is_empty() {
            warn!(failed = ?collected.failed_sources, "some sources returned nothing");
        }
        info!(
            total = summary.total,
            negative_ratio = threshold.negative_ratio,
            crossed = threshold.threshold_crossed,
            alert_sent,
            "pipeline run complete"
        );

        PipelineReport {
            summary,
            dedup: deduped.stats,
            threshold,
            failed_sources: collected.failed_sources,
            persisted,
            alert_sent,
            mentions: scored,
        }
    }

    /// App reviews belong to the brand's own listing, so only social
    /// sources go through the keyword filter. Fetch order is preserved so
    /// dedup keeps the earliest copy.
    fn relevant(&self, mentions: Vec<Mention>) -> Vec<Mention> {
        let needles = keyword_needles(&self.config.keywords);
        let before = mentions.len();
        let out: Vec<Mention> = mentions
            .into_iter()
            .filter(|m| m.source == Source::GooglePlay || matches_keywords(m, &needles))
            .collect();
        info!(before, after = out.len(), "filtered mentions by relevance");
        out
    }
}
