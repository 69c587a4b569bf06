//! Corpus-level theme importance.
//!
//! weight(theme) = frequency(theme) * sentiment_weight(theme), where frequency
//! is the share of corpus texts tagged with the theme and sentiment_weight is
//! doubled when the tagged texts lean negative on average. Themes that never
//! occur are absent, which keeps "no signal" apart from "weak signal".

use crate::analysis::sentiment::{Sentiment, SentimentClassifier};
use crate::analysis::themes::ThemeTagger;
use crate::models::impact_score::ThemeStat;
use std::collections::BTreeMap;

pub const NEGATIVE_SENTIMENT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct AnalyzedText {
    pub text: String,
    pub sentiment: Sentiment,
}

/// Snapshot of theme weights for the corpus it was computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeStatistics {
    stats: BTreeMap<String, ThemeStat>,
    corpus_size: usize,
}

impl ThemeStatistics {
    pub fn compute(corpus: &[AnalyzedText], tagger: &ThemeTagger) -> Self {
        let corpus_size = corpus.len();
        let mut occurrences: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for record in corpus {
            for theme in tagger.tag(&record.text) {
                occurrences
                    .entry(theme)
                    .or_default()
                    .push(record.sentiment.signed_score());
            }
        }

        let stats = occurrences
            .into_iter()
            .map(|(theme, scores)| {
                let stat = theme_stat(&theme, &scores, corpus_size);
                (theme, stat)
            })
            .collect();

        Self { stats, corpus_size }
    }

    /// Classify the normalized texts and aggregate them. Texts without a
    /// sentiment result are left out of the corpus entirely.
    pub fn analyze<S>(texts: &[S], classifier: &SentimentClassifier, tagger: &ThemeTagger) -> Self
    where
        S: AsRef<str> + Sync,
    {
        let sentiments = classifier.classify_batch(texts);
        let corpus: Vec<AnalyzedText> = texts
            .iter()
            .zip(sentiments)
            .filter_map(|(text, sentiment)| {
                sentiment.map(|sentiment| AnalyzedText {
                    text: text.as_ref().to_string(),
                    sentiment,
                })
            })
            .collect();

        let excluded = texts.len() - corpus.len();
        if excluded > 0 {
            log::warn!(
                "{excluded} of {} texts produced no sentiment and were excluded from theme statistics",
                texts.len()
            );
        }

        let stats = Self::compute(&corpus, tagger);
        log::info!(
            "Theme statistics: {} themes over {} texts",
            stats.len(),
            stats.corpus_size()
        );
        stats
    }

    /// Statistics with the given weights and no corpus behind them.
    #[cfg(test)]
    pub(crate) fn from_weights<I, S>(weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let stats = weights
            .into_iter()
            .map(|(theme, weight)| {
                let theme = theme.into();
                let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
                let stat = ThemeStat {
                    theme: theme.clone(),
                    occurrences: 0,
                    frequency: 0.0,
                    mean_sentiment: 0.0,
                    sentiment_weight: 1.0,
                    weight,
                };
                (theme, stat)
            })
            .collect();

        Self {
            stats,
            corpus_size: 0,
        }
    }

    pub fn get(&self, theme: &str) -> Option<f64> {
        self.stat(theme).map(|s| s.weight)
    }

    pub fn stat(&self, theme: &str) -> Option<&ThemeStat> {
        self.stats.get(theme)
    }

    /// Largest theme weight, 0 when there are no themes.
    pub fn max_weight(&self) -> f64 {
        self.stats.values().map(|s| s.weight).fold(0.0, f64::max)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThemeStat> {
        self.stats.values()
    }

    pub fn to_vec(&self) -> Vec<ThemeStat> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn corpus_size(&self) -> usize {
        self.corpus_size
    }
}

fn theme_stat(theme: &str, scores: &[f64], corpus_size: usize) -> ThemeStat {
    let frequency = if corpus_size == 0 {
        0.0
    } else {
        scores.len() as f64 / corpus_size as f64
    };
    let mean_sentiment = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    let sentiment_weight = if mean_sentiment < 0.0 {
        NEGATIVE_SENTIMENT_MULTIPLIER
    } else {
        1.0
    };

    ThemeStat {
        theme: theme.to_string(),
        occurrences: scores.len(),
        frequency,
        mean_sentiment,
        sentiment_weight,
        weight: frequency * sentiment_weight,
    }
}
