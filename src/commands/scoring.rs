use crate::analysis::impact::ImpactScorer;
use crate::analysis::sentiment::{LexiconSentimentModel, SentimentClassifier, SentimentModel};
use crate::analysis::text::normalize_corpus;
use crate::analysis::theme_stats::ThemeStatistics;
use crate::analysis::themes::ThemeTagger;
use crate::commands::ingest::{discover_inputs, load_backlog, load_feedback, load_tickets, InputPaths};
use crate::commands::settings::{load_effective_settings, EffectiveSettings};
use crate::error::IngestError;
use crate::models::impact_score::{AnalysisProgress, AnalysisResult, ImpactScore};
use crate::models::records::{BacklogItem, FeedbackRecord, TicketRecord};
use std::sync::Arc;

const STAGES: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct AnalysisInputs {
    pub feedback: Vec<FeedbackRecord>,
    pub tickets: Vec<TicketRecord>,
    pub backlog: Vec<BacklogItem>,
    pub feedback_dropped: usize,
    pub ticket_dropped: usize,
    pub backlog_dropped: usize,
}

/// The bundled lexicon model, used when no pretrained model is wired in.
pub fn default_model() -> Result<Arc<dyn SentimentModel>, String> {
    let model = LexiconSentimentModel::new()
        .map_err(|e| format!("MODEL_INIT_FAILED: {e}"))?;
    Ok(Arc::new(model))
}

/// Discover and load inputs for a workspace, then score its backlog.
/// Paths set in `overrides` win over discovered ones.
pub fn run_full_analysis_internal<F>(
    workspace_path: &str,
    overrides: InputPaths,
    model: Arc<dyn SentimentModel>,
    mut emit_progress: F,
) -> Result<AnalysisResult, String>
where
    F: FnMut(AnalysisProgress),
{
    let start = std::time::Instant::now();
    let settings = load_effective_settings(workspace_path)?;

    emit_progress(progress("ingest", 1));
    let paths = if overrides.feedback.is_some()
        && overrides.tickets.is_some()
        && overrides.backlog.is_some()
    {
        overrides
    } else {
        overrides.or(discover_inputs(&settings.data_dir))
    };
    let inputs = load_analysis_inputs(&paths, &settings)?;

    let classifier = SentimentClassifier::new(model).with_workers(settings.workers);
    let mut result = analyze_inputs(&inputs, &settings, &classifier, |p| emit_progress(p))?;
    result.duration_ms = start.elapsed().as_millis() as u64;

    log::info!(
        "Scored {} backlog items against {} feedback texts in {} ms",
        result.backlog_count,
        result.corpus_size,
        result.duration_ms
    );
    Ok(result)
}

/// Score already-loaded records. Pure over its inputs apart from logging.
pub fn analyze_inputs<F>(
    inputs: &AnalysisInputs,
    settings: &EffectiveSettings,
    classifier: &SentimentClassifier,
    mut emit_progress: F,
) -> Result<AnalysisResult, String>
where
    F: FnMut(AnalysisProgress),
{
    let start = std::time::Instant::now();
    let tagger = ThemeTagger::new(&settings.lexicon)
        .map_err(|e| format!("INVALID_LEXICON: {e}"))?;

    emit_progress(progress("classify", 2));
    let corpus = normalize_corpus(&inputs.feedback, &settings.feedback_text_columns, &inputs.tickets);
    let stats = ThemeStatistics::analyze(&corpus, classifier, &tagger);

    emit_progress(progress("score", 3));
    let scorer = ImpactScorer::new(&tagger, settings.weights);
    let scores = scorer.rank(&inputs.backlog, &stats);

    emit_progress(progress("done", STAGES));
    Ok(build_analysis_result(
        classifier.model_name(),
        inputs,
        &stats,
        scores,
        settings.high_impact_threshold,
        start.elapsed().as_millis() as u64,
    ))
}

fn load_analysis_inputs(paths: &InputPaths, settings: &EffectiveSettings) -> Result<AnalysisInputs, String> {
    // Feedback and tickets are optional signal: a rejected table is reported
    // and treated as absent.
    let (feedback, feedback_dropped) = match &paths.feedback {
        Some(path) => match load_feedback(path, &settings.feedback_text_columns) {
            Ok(loaded) => (loaded.records, loaded.dropped),
            Err(e) => {
                log::error!("CSAT data rejected: {e}");
                (Vec::new(), 0)
            }
        },
        None => (Vec::new(), 0),
    };

    let (tickets, ticket_dropped) = match &paths.tickets {
        Some(path) => match load_tickets(path) {
            Ok(loaded) => (loaded.records, loaded.dropped),
            Err(e) => {
                log::error!("Support ticket data rejected: {e}");
                (Vec::new(), 0)
            }
        },
        None => (Vec::new(), 0),
    };

    let backlog_path = paths
        .backlog
        .as_ref()
        .ok_or_else(|| format!("NO_BACKLOG: {}", IngestError::NotFound("development backlog".to_string())))?;
    let backlog = load_backlog(backlog_path).map_err(|e| format!("INGEST_FAILED: {e}"))?;

    Ok(AnalysisInputs {
        feedback,
        tickets,
        backlog: backlog.records,
        feedback_dropped,
        ticket_dropped,
        backlog_dropped: backlog.dropped,
    })
}

fn build_analysis_result(
    classifier: &str,
    inputs: &AnalysisInputs,
    stats: &ThemeStatistics,
    scores: Vec<ImpactScore>,
    high_impact_threshold: f64,
    duration_ms: u64,
) -> AnalysisResult {
    let backlog_count = scores.len();
    let total_score: f64 = scores.iter().map(|s| s.composite_score).sum();
    let high_impact_count = scores
        .iter()
        .filter(|s| s.composite_score >= high_impact_threshold)
        .count();

    AnalysisResult {
        classifier: classifier.to_string(),
        feedback_count: inputs.feedback.len(),
        ticket_count: inputs.tickets.len(),
        feedback_dropped: inputs.feedback_dropped,
        ticket_dropped: inputs.ticket_dropped,
        backlog_dropped: inputs.backlog_dropped,
        corpus_size: stats.corpus_size(),
        backlog_count,
        high_impact_count,
        average_score: if backlog_count == 0 {
            0.0
        } else {
            total_score / backlog_count as f64
        },
        themes: stats.to_vec(),
        scores,
        duration_ms,
    }
}

fn progress(stage: &str, current: usize) -> AnalysisProgress {
    AnalysisProgress {
        stage: stage.to_string(),
        current,
        total: STAGES,
    }
}
