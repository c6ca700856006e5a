//! # Threshold Evaluator
//! Negative-sentiment ratio over scored mentions and the alert decision.
//!
//! Only mentions carrying both a label and a score are counted. The boundary is
//! inclusive: a ratio equal to the threshold crosses it. When crossed, the
//! negatives with the lowest scores are selected, lowest first.
//!
//! Never fails: internal errors collapse to "not crossed, 0.0, empty".

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{error, info};

use crate::mention::{Mention, SentimentLabel};

pub const DEFAULT_THRESHOLD: f64 = 0.20;
pub const TOP_NEGATIVE_LIMIT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentThresholdResult {
    pub threshold_crossed: bool,
    pub negative_ratio: f64,
    pub top_negative: Vec<Mention>,
}

impl SentimentThresholdResult {
    /// Safe default returned on empty input or internal errors.
    pub fn not_crossed() -> Self {
        Self::default()
    }
}

pub fn evaluate(mentions: &[Mention], threshold: f64) -> SentimentThresholdResult {
    match try_evaluate(mentions, threshold) {
        Ok(res) => res,
        Err(e) => {
            error!(error = %e, "threshold evaluation failed; reporting not crossed");
            SentimentThresholdResult::not_crossed()
        }
    }
}

/// `evaluate` with `DEFAULT_THRESHOLD`.
pub fn evaluate_default(mentions: &[Mention]) -> SentimentThresholdResult {
    evaluate(mentions, DEFAULT_THRESHOLD)
}

fn try_evaluate(mentions: &[Mention], threshold: f64) -> Result<SentimentThresholdResult> {
    if !threshold.is_finite() {
        bail!("threshold must be finite, got {threshold}");
    }

    let mut counted = 0usize;
    let mut negatives: Vec<(f64, &Mention)> = Vec::new();
    for m in mentions {
        let (Some(label), Some(score)) = (m.sentiment_label, m.sentiment_score) else {
            continue;
        };
        if !score.is_finite() {
            bail!("non-finite sentiment score on {}", m.identity_key());
        }
        counted += 1;
        if label == SentimentLabel::Negative {
            negatives.push((score, m));
        }
    }

    if counted == 0 {
        return Ok(SentimentThresholdResult::not_crossed());
    }

    let negative_ratio = negatives.len() as f64 / counted as f64;
    let threshold_crossed = negative_ratio >= threshold;
    info!(
        counted,
        negative = negatives.len(),
        ratio = negative_ratio,
        threshold,
        crossed = threshold_crossed,
        "evaluated sentiment threshold"
    );

    let top_negative = if threshold_crossed {
        negatives.sort_by(|a, b| a.0.total_cmp(&b.0));
        negatives
            .into_iter()
            .take(TOP_NEGATIVE_LIMIT)
            .map(|(_, m)| m.clone())
            .collect()
    } else {
        Vec::new()
    };

    Ok(SentimentThresholdResult {
        threshold_crossed,
        negative_ratio,
        top_negative,
    })
}
