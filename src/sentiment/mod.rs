//! Sentiment attachment.
//!
//! The classifier itself is external (`SentimentScorer`). This module only
//! batches texts for it and puts the results back onto the right mentions.

pub mod huggingface;
pub mod lexicon;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::mention::{Mention, SentimentLabel};

pub use huggingface::HuggingFaceScorer;
pub use lexicon::LexiconScorer;

/// Score attached when no usable result exists for a mention.
pub const NEUTRAL_FALLBACK_SCORE: f64 = 0.5;
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// One classifier answer: label plus the confidence of that label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SentimentResult {
    pub fn new(label: SentimentLabel, score: f64) -> Self {
        Self {
            label,
            score,
            error: None,
        }
    }

    /// Neutral 0.5, optionally remembering why.
    pub fn fallback(error: Option<String>) -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: NEUTRAL_FALLBACK_SCORE,
            error,
        }
    }
}

/// Batch text classifier: texts in, equally long and equally ordered results out.
#[async_trait::async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>>;
    fn name(&self) -> &'static str;
}

pub type DynScorer = Arc<dyn SentimentScorer>;

/// Attach `results[i]` to `mentions[i]`. Mentions past the end of `results`
/// get the neutral fallback. Callers must derive both from the same ordering.
pub fn merge(mentions: Vec<Mention>, results: &[SentimentResult]) -> Vec<Mention> {
    if results.len() < mentions.len() {
        debug!(
            mentions = mentions.len(),
            results = results.len(),
            "fewer sentiment results than mentions; padding with neutral"
        );
    }
    mentions
        .into_iter()
        .enumerate()
        .map(|(i, m)| match results.get(i) {
            Some(r) => attach(m, r),
            None => m.with_sentiment(SentimentLabel::Neutral, NEUTRAL_FALLBACK_SCORE),
        })
        .collect()
}

fn attach(m: Mention, r: &SentimentResult) -> Mention {
    if let Some(err) = &r.error {
        debug!(mention = %m.identity_key(), error = %err, "sentiment result carries an error");
    }
    if !r.score.is_finite() {
        warn!(mention = %m.identity_key(), "non-finite sentiment score; using neutral");
        return m.with_sentiment(SentimentLabel::Neutral, NEUTRAL_FALLBACK_SCORE);
    }
    m.with_sentiment(r.label, r.score.clamp(0.0, 1.0))
}

/// Score mentions in chunks of `batch_size`, carrying each text's original
/// index so results can never be attached to the wrong mention.
///
/// A chunk whose call fails, or which answers with the wrong number of
/// results, degrades to neutral for its own mentions only.
pub async fn score_mentions(
    scorer: &dyn SentimentScorer,
    mentions: Vec<Mention>,
    batch_size: usize,
) -> Vec<Mention> {
    let batch_size = batch_size.max(1);
    let indexed: Vec<(usize, String)> = mentions
        .iter()
        .enumerate()
        .map(|(i, m)| (i, m.text.clone()))
        .collect();

    let mut slots: Vec<Option<SentimentResult>> = vec![None; mentions.len()];
    let mut failed_chunks = 0usize;

    for chunk in indexed.chunks(batch_size) {
        let texts: Vec<String> = chunk.iter().map(|(_, t)| t.clone()).collect();
        let t0 = std::time::Instant::now();
        let outcome = scorer.classify(&texts).await.and_then(|res| {
            if res.len() == texts.len() {
                Ok(res)
            } else {
                Err(anyhow!(
                    "scorer returned {} results for {} texts",
                    res.len(),
                    texts.len()
                ))
            }
        });
        histogram!("sentiment_chunk_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match outcome {
            Ok(results) => {
                for ((idx, _), r) in chunk.iter().zip(results) {
                    slots[*idx] = Some(r);
                }
            }
            Err(e) => {
                failed_chunks += 1;
                counter!("sentiment_chunk_failures_total").increment(1);
                warn!(error = ?e, scorer = scorer.name(), size = chunk.len(), "sentiment chunk failed; using neutral");
                let reason = e.to_string();
                for (idx, _) in chunk {
                    slots[*idx] = Some(SentimentResult::fallback(Some(reason.clone())));
                }
            }
        }
    }

    info!(
        scored = mentions.len(),
        failed_chunks,
        scorer = scorer.name(),
        "sentiment scoring complete"
    );

    mentions
        .into_iter()
        .zip(slots)
        .map(|(m, slot)| match slot {
            Some(r) => attach(m, &r),
            None => m.with_sentiment(SentimentLabel::Neutral, NEUTRAL_FALLBACK_SCORE),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::Source;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mk(id: &str, text: &str) -> Mention {
        Mention::new(Source::Twitter, id, "u", text, "2024-01-01T00:00:00Z")
    }

    #[test]
    fn positional_merge_pads_with_neutral() {
        let ms = vec![mk("1", "aaaaaaaaaa"), mk("2", "bbbbbbbbbb"), mk("3", "cccccccccc")];
        let results = vec![
            SentimentResult::new(SentimentLabel::Positive, 0.9),
            SentimentResult::new(SentimentLabel::Negative, 0.8),
        ];
        let out = merge(ms, &results);
        assert_eq!(out[0].sentiment_label, Some(SentimentLabel::Positive));
        assert_eq!(out[1].sentiment_label, Some(SentimentLabel::Negative));
        assert_eq!(out[2].sentiment_label, Some(SentimentLabel::Neutral));
        assert_eq!(out[2].sentiment_score, Some(0.5));
    }

    #[test]
    fn merge_sanitizes_scores() {
        let out = merge(
            vec![mk("1", "aaaaaaaaaa"), mk("2", "bbbbbbbbbb")],
            &[
                SentimentResult::new(SentimentLabel::Negative, f64::NAN),
                SentimentResult::new(SentimentLabel::Positive, 1.7),
            ],
        );
        assert_eq!(out[0].sentiment_label, Some(SentimentLabel::Neutral));
        assert_eq!(out[1].sentiment_score, Some(1.0));
    }

    /// Labels by keyword; fails any chunk containing "boom".
    struct KeywordScorer {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SentimentScorer for KeywordScorer {
        async fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.iter().any(|t| t.contains("boom")) {
                anyhow::bail!("classifier exploded");
            }
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("bad") {
                        SentimentResult::new(SentimentLabel::Negative, 0.9)
                    } else {
                        SentimentResult::new(SentimentLabel::Positive, 0.7)
                    }
                })
                .collect())
        }
        fn name(&self) -> &'static str {
            "keyword"
        }
    }

    #[tokio::test]
    async fn chunk_failure_only_affects_its_chunk() {
        let scorer = KeywordScorer {
            calls: AtomicUsize::new(0),
        };
        let ms = vec![
            mk("1", "bad service"),
            mk("2", "great stuff"),
            mk("3", "boom goes the model"),
            mk("4", "bad again"),
            mk("5", "fine really"),
        ];
        let out = score_mentions(&scorer, ms, 2).await;
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out[0].sentiment_label, Some(SentimentLabel::Negative));
        assert_eq!(out[1].sentiment_label, Some(SentimentLabel::Positive));
        // chunk [3, 4] failed as a whole
        assert_eq!(out[2].sentiment_label, Some(SentimentLabel::Neutral));
        assert_eq!(out[3].sentiment_label, Some(SentimentLabel::Neutral));
        assert_eq!(out[3].sentiment_score, Some(0.5));
        assert_eq!(out[4].sentiment_label, Some(SentimentLabel::Positive));
    }

    struct ShortScorer;

    #[async_trait::async_trait]
    impl SentimentScorer for ShortScorer {
        async fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>> {
            Ok(texts
                .iter()
                .skip(1)
                .map(|_| SentimentResult::new(SentimentLabel::Negative, 0.9))
                .collect())
        }
        fn name(&self) -> &'static str {
            "short"
        }
    }

    #[tokio::test]
    async fn misaligned_chunk_degrades_instead_of_shifting() {
        let out = score_mentions(&ShortScorer, vec![mk("1", "x"), mk("2", "y")], 8).await;
        assert!(out
            .iter()
            .all(|m| m.sentiment_label == Some(SentimentLabel::Neutral)));
    }

    #[tokio::test]
    async fn zero_batch_size_is_treated_as_one() {
        let scorer = KeywordScorer {
            calls: AtomicUsize::new(0),
        };
        let out = score_mentions(&scorer, vec![mk("1", "bad"), mk("2", "ok")], 0).await;
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.len(), 2);
    }
}
