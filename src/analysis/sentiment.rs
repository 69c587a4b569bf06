//! Sentiment classification over free text.
//!
//! The classifier wraps any [`SentimentModel`] (a pretrained model binding or
//! the bundled lexicon fallback) and owns the batch policy: inputs are
//! truncated to [`MAX_CLASSIFY_CHARS`], blank texts are never submitted, and a
//! failure on one text yields `None` for that text only.

use crate::error::{ClassifyError, LexiconError};
use aho_corasick::AhoCorasick;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const MAX_CLASSIFY_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub confidence: f64,
}

impl Sentiment {
    pub fn new(label: SentimentLabel, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { label, confidence }
    }

    pub fn positive(confidence: f64) -> Self {
        Self::new(SentimentLabel::Positive, confidence)
    }

    pub fn negative(confidence: f64) -> Self {
        Self::new(SentimentLabel::Negative, confidence)
    }

    /// Confidence signed by polarity: negative labels map below zero.
    pub fn signed_score(&self) -> f64 {
        match self.label {
            SentimentLabel::Positive => self.confidence,
            SentimentLabel::Negative => -self.confidence,
        }
    }
}

/// A text-classification capability. Loaded once and shared read-only.
pub trait SentimentModel: Send + Sync {
    fn predict(&self, text: &str) -> Result<Sentiment, ClassifyError>;

    fn name(&self) -> &str;
}

/// Word-list classifier used when no external model is configured.
pub struct LexiconSentimentModel {
    positive: AhoCorasick,
    negative: AhoCorasick,
}

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "love", "amazing", "wonderful", "happy", "fantastic",
    "awesome", "best", "easy", "helpful", "intuitive", "smooth", "reliable", "thank",
    "perfect", "pleased", "quick",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "horrible", "worst", "sad", "angry",
    "disappointed", "poor", "slow", "crash", "broken", "bug", "fail", "error", "issue",
    "problem", "frustrat", "confusing", "difficult", "missing", "annoying", "useless",
    "unable", "can't", "cannot", "doesn't", "won't",
];

impl LexiconSentimentModel {
    pub fn new() -> Result<Self, LexiconError> {
        let positive = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(POSITIVE_WORDS)?;
        let negative = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(NEGATIVE_WORDS)?;

        Ok(Self { positive, negative })
    }
}

impl SentimentModel for LexiconSentimentModel {
    fn predict(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        let positive_hits = self.positive.find_iter(text).count() as f64;
        let negative_hits = self.negative.find_iter(text).count() as f64;
        let total = positive_hits + negative_hits;

        let score = if total == 0.0 {
            0.5
        } else {
            positive_hits / total
        };

        Ok(if score >= 0.5 {
            Sentiment::positive(score)
        } else {
            Sentiment::negative(1.0 - score)
        })
    }

    fn name(&self) -> &str {
        "sentiment-lexicon"
    }
}

#[derive(Clone)]
pub struct SentimentClassifier {
    model: Arc<dyn SentimentModel>,
    workers: usize,
}

impl SentimentClassifier {
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self { model, workers: 0 }
    }

    /// Bound the batch worker pool. `0` uses the global rayon pool.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn try_classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyInput);
        }
        let raw = self.model.predict(truncate_chars(text, MAX_CLASSIFY_CHARS))?;
        Ok(Sentiment::new(raw.label, raw.confidence))
    }

    pub fn classify(&self, text: &str) -> Option<Sentiment> {
        match self.try_classify(text) {
            Ok(sentiment) => Some(sentiment),
            Err(ClassifyError::EmptyInput) => None,
            Err(e) => {
                log::warn!("Skipping text after classification failure: {e}");
                None
            }
        }
    }

    /// Classify every text, keeping input order. Entries are `None` where the
    /// text was blank or the model failed.
    pub fn classify_batch<S>(&self, texts: &[S]) -> Vec<Option<Sentiment>>
    where
        S: AsRef<str> + Sync,
    {
        let run = || {
            texts
                .par_iter()
                .map(|text| self.classify(text.as_ref()))
                .collect::<Vec<_>>()
        };

        if self.workers == 0 {
            return run();
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                log::warn!("Could not start {} classifier workers ({e}); classifying sequentially", self.workers);
                texts.iter().map(|text| self.classify(text.as_ref())).collect()
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingModel {
        seen: Mutex<Vec<String>>,
    }

    impl SentimentModel for RecordingModel {
        fn predict(&self, text: &str) -> Result<Sentiment, ClassifyError> {
            self.seen.lock().unwrap().push(text.to_string());
            if text.contains("<malformed>") {
                return Err(ClassifyError::Model("unparseable input".to_string()));
            }
            Ok(Sentiment::negative(0.9))
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn recording() -> Arc<RecordingModel> {
        Arc::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn truncates_long_text_before_prediction() {
        let model = recording();
        let classifier = SentimentClassifier::new(model.clone());
        let long = "é".repeat(MAX_CLASSIFY_CHARS + 100);

        assert!(classifier.classify(&long).is_some());
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].chars().count(), MAX_CLASSIFY_CHARS);
    }

    #[test]
    fn never_submits_blank_text() {
        let model = recording();
        let classifier = SentimentClassifier::new(model.clone());

        assert!(classifier.classify("   ").is_none());
        assert!(matches!(classifier.try_classify(""), Err(ClassifyError::EmptyInput)));
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn failure_on_one_text_does_not_abort_batch() {
        let classifier = SentimentClassifier::new(recording()).with_workers(2);
        let texts = vec!["fine", "<malformed>", "", "also fine"];

        let results = classifier.classify_batch(&texts);
        assert_eq!(results.len(), 4);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(results[2].is_none());
        assert!(results[3].is_some());
    }

    #[test]
    fn pooled_batch_matches_sequential_classification() {
        let model = LexiconSentimentModel::new().unwrap();
        let classifier = SentimentClassifier::new(Arc::new(model)).with_workers(4);
        let texts: Vec<String> = (0..64)
            .map(|i| match i % 4 {
                0 => format!("ticket {i}: the app is slow and keeps crashing"),
                1 => format!("ticket {i}: great support, very helpful"),
                2 => String::new(),
                _ => format!("ticket {i}: good design but a confusing bug in sync"),
            })
            .collect();

        let pooled = classifier.classify_batch(&texts);
        let sequential: Vec<Option<Sentiment>> = texts.iter().map(|t| classifier.classify(t)).collect();

        assert_eq!(pooled, sequential);
        assert!(pooled.iter().any(|s| s.map(|s| s.label) == Some(SentimentLabel::Negative)));
        assert!(pooled.iter().any(|s| s.map(|s| s.label) == Some(SentimentLabel::Positive)));
    }

    #[test]
    fn lexicon_model_detects_polarity() {
        let model = LexiconSentimentModel::new().unwrap();
        let negative = model.predict("The sync is SLOW and the app keeps crashing").unwrap();
        let positive = model.predict("Great support, really helpful team").unwrap();

        assert_eq!(negative.label, SentimentLabel::Negative);
        assert_eq!(positive.label, SentimentLabel::Positive);
        assert!(negative.signed_score() < 0.0);
        assert!(positive.signed_score() > 0.0);
    }

    #[test]
    fn sentiment_confidence_is_bounded() {
        assert_eq!(Sentiment::positive(1.7).confidence, 1.0);
        assert_eq!(Sentiment::negative(f64::NAN).confidence, 0.0);
    }
}
