use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub raw_score: f64,
    pub weight: f64,
    pub contribution: f64,
    pub details: Vec<String>,
}

impl ComponentScore {
    pub fn new(raw_score: f64, weight: f64, details: Vec<String>) -> Self {
        Self {
            raw_score,
            weight,
            contribution: raw_score * weight,
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub priority: ComponentScore,
    pub effort: ComponentScore,
    pub theme: ComponentScore,
}

/// Scored backlog item. Built once by the scorer and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactScore {
    pub ticket_id: String,
    pub title: String,
    pub priority: String,
    pub story_points: u32,
    pub composite_score: f64,
    pub components: ScoreComponents,
    pub matched_themes: Vec<String>,
}

impl ImpactScore {
    pub fn priority_component(&self) -> f64 {
        self.components.priority.raw_score
    }

    pub fn effort_component(&self) -> f64 {
        self.components.effort.raw_score
    }

    pub fn theme_component(&self) -> f64 {
        self.components.theme.raw_score
    }

    pub fn relevant_themes(&self) -> String {
        self.matched_themes.join("; ")
    }
}

/// Corpus-level importance of one theme for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeStat {
    pub theme: String,
    pub occurrences: usize,
    pub frequency: f64,
    pub mean_sentiment: f64,
    pub sentiment_weight: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub priority: f64,
    pub effort: f64,
    pub theme: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            priority: 0.4,
            effort: 0.3,
            theme: 0.3,
        }
    }
}

impl ScoreWeights {
    /// Clamp each weight to [0, 1] and rescale so they sum to 1. An all-zero
    /// set falls back to the defaults.
    pub fn normalized(priority: f64, effort: f64, theme: f64) -> Self {
        let clean = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let (p, e, t) = (clean(priority), clean(effort), clean(theme));
        let sum = p + e + t;

        if sum <= f64::EPSILON {
            return Self::default();
        }
        if (sum - 1.0).abs() < 1e-9 {
            return Self {
                priority: p,
                effort: e,
                theme: t,
            };
        }

        Self {
            priority: p / sum,
            effort: e / sum,
            theme: t / sum,
        }
    }

    pub fn from_map(weights: &HashMap<String, f64>) -> Self {
        let defaults = Self::default();
        Self::normalized(
            *weights.get("priority").unwrap_or(&defaults.priority),
            *weights.get("effort").unwrap_or(&defaults.effort),
            *weights.get("theme").unwrap_or(&defaults.theme),
        )
    }
}

/// Default scoring weights (sum to 1.0)
pub fn default_weights() -> HashMap<String, f64> {
    let mut w = HashMap::new();
    w.insert("priority".to_string(), 0.4);
    w.insert("effort".to_string(), 0.3);
    w.insert("theme".to_string(), 0.3);
    w
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub classifier: String,
    pub feedback_count: usize,
    pub ticket_count: usize,
    /// Rows rejected at ingestion, per table.
    pub feedback_dropped: usize,
    pub ticket_dropped: usize,
    pub backlog_dropped: usize,
    pub corpus_size: usize,
    pub backlog_count: usize,
    pub high_impact_count: usize,
    pub average_score: f64,
    pub themes: Vec<ThemeStat>,
    pub scores: Vec<ImpactScore>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisProgress {
    pub stage: String,
    pub current: usize,
    pub total: usize,
}
