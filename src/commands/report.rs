use crate::error::IngestError;
use crate::models::impact_score::{AnalysisResult, ImpactScore};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const RANKED_CSV_FILE: &str = "impact_scores.csv";
pub const RESULT_JSON_FILE: &str = "analysis_result.json";
pub const SUMMARY_FILE: &str = "summary_report.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    #[default]
    All,
}

impl ReportFormat {
    fn csv(self) -> bool {
        matches!(self, Self::Csv | Self::All)
    }

    fn json(self) -> bool {
        matches!(self, Self::Json | Self::All)
    }
}

#[derive(Debug, Serialize)]
struct RankedRow<'a> {
    ticket_id: &'a str,
    title: &'a str,
    priority: &'a str,
    story_points: u32,
    theme_score: f64,
    composite_score: f64,
    relevant_themes: String,
}

impl<'a> From<&'a ImpactScore> for RankedRow<'a> {
    fn from(score: &'a ImpactScore) -> Self {
        Self {
            ticket_id: &score.ticket_id,
            title: &score.title,
            priority: &score.priority,
            story_points: score.story_points,
            theme_score: round4(score.theme_component()),
            composite_score: round4(score.composite_score),
            relevant_themes: score.relevant_themes(),
        }
    }
}

/// Write every report `format` asks for, plus the Markdown summary, into
/// `out_dir`. Returns the written paths in write order.
pub fn write_reports(
    result: &AnalysisResult,
    out_dir: &Path,
    format: ReportFormat,
    top_n: usize,
) -> Result<Vec<PathBuf>, String> {
    fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create {}: {e}", out_dir.display()))?;

    let mut written = Vec::new();
    if format.csv() {
        let path = out_dir.join(RANKED_CSV_FILE);
        write_ranked_csv(&result.scores, &path).map_err(|e| e.to_string())?;
        written.push(path);
    }
    if format.json() {
        let path = out_dir.join(RESULT_JSON_FILE);
        write_result_json(result, &path)?;
        written.push(path);
    }

    let path = out_dir.join(SUMMARY_FILE);
    write_summary(result, &path, top_n)?;
    written.push(path);

    for path in &written {
        log::info!("Report saved to: {}", path.display());
    }
    Ok(written)
}

/// Ranked table, one row per backlog item in the order given.
pub fn write_ranked_csv(scores: &[ImpactScore], path: &Path) -> Result<(), IngestError> {
    let csv_err = |source: csv::Error| IngestError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for score in scores {
        writer.serialize(RankedRow::from(score)).map_err(csv_err)?;
    }
    // Header row for an empty ranking.
    if scores.is_empty() {
        writer
            .write_record([
                "ticket_id",
                "title",
                "priority",
                "story_points",
                "theme_score",
                "composite_score",
                "relevant_themes",
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn write_result_json(result: &AnalysisResult, path: &Path) -> Result<(), String> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| format!("Failed to serialize analysis result: {e}"))?;
    fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

pub fn write_summary(result: &AnalysisResult, path: &Path, top_n: usize) -> Result<(), String> {
    fs::write(path, render_summary(result, top_n))
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

pub fn render_summary(result: &AnalysisResult, top_n: usize) -> String {
    let mut out = String::from("# Development Impact Analysis Summary\n\n");
    out.push_str(&format!(
        "Scored {} backlog items against {} feedback texts ({} CSAT responses, {} tickets) \
         using `{}`. {} items at or above the high-impact threshold; average score {:.2}.\n",
        result.backlog_count,
        result.corpus_size,
        result.feedback_count,
        result.ticket_count,
        result.classifier,
        result.high_impact_count,
        result.average_score,
    ));
    let dropped = result.feedback_dropped + result.ticket_dropped + result.backlog_dropped;
    if dropped > 0 {
        out.push_str(&format!(
            "\nInvalid rows dropped at ingestion: {} CSAT, {} ticket, {} backlog.\n",
            result.feedback_dropped, result.ticket_dropped, result.backlog_dropped
        ));
    }

    out.push_str("\n## Top Priority Items\n\n");
    if result.scores.is_empty() {
        out.push_str("_No backlog items._\n");
    }
    for score in result.scores.iter().take(top_n) {
        out.push_str(&format!(
            "- {}: {} (Impact Score: {:.2})\n",
            score.ticket_id, score.title, score.composite_score
        ));
    }

    out.push_str("\n## Priority Distribution\n\n");
    for (label, count) in priority_distribution(&result.scores) {
        out.push_str(&format!("- {label}: {count} items\n"));
    }

    out.push_str("\n## Theme Statistics\n\n");
    if result.themes.is_empty() {
        out.push_str("_No theme mentions in the feedback corpus._\n");
        return out;
    }
    out.push_str("| Theme | Mentions | Frequency | Mean sentiment | Weight |\n");
    out.push_str("|---|---:|---:|---:|---:|\n");
    for stat in &result.themes {
        out.push_str(&format!(
            "| {} | {} | {:.3} | {:+.3} | {:.3} |\n",
            stat.theme, stat.occurrences, stat.frequency, stat.mean_sentiment, stat.weight
        ));
    }
    out
}

/// Item count per priority label, most common first, ties by label.
pub fn priority_distribution(scores: &[ImpactScore]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for score in scores {
        *counts.entry(score.priority.trim()).or_default() += 1;
    }
    let mut dist: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    dist.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    dist
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
