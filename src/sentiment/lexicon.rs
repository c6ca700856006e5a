//! Word-list scorer. Always available, no network; used for dry runs and as the
//! fallback when no inference endpoint is configured.

use anyhow::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::{SentimentResult, SentimentScorer};
use crate::mention::SentimentLabel;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (summed score, lexicon hits).
    /// A negator within the previous three tokens flips the sign of a word.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;
        let mut hits = 0usize;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            hits += 1;
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, hits)
    }

    /// Map the raw lexicon score onto a label and a confidence in [0, 1].
    pub fn classify_text(&self, text: &str) -> SentimentResult {
        let (score, hits) = self.score_text(text);
        let label = match score {
            s if s > 0 => SentimentLabel::Positive,
            s if s < 0 => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        };
        let confidence = match label {
            SentimentLabel::Neutral if hits == 0 => 0.6,
            SentimentLabel::Neutral => 0.5,
            _ => (0.55 + 0.1 * f64::from(score.unsigned_abs())).min(0.95),
        };
        SentimentResult::new(label, confidence)
    }
}

#[async_trait::async_trait]
impl SentimentScorer for LexiconScorer {
    async fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>> {
        Ok(texts.iter().map(|t| self.classify_text(t)).collect())
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Lower-cased tokens; apostrophes stay inside words so "isn't" survives.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "without"
    )
}
