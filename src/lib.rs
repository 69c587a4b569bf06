//! Ranks development backlog items by customer impact.
//!
//! Satisfaction surveys and support tickets are classified for sentiment and
//! tagged with product themes. Themes that are mentioned often and negatively
//! weigh more, and each backlog item's score blends its priority, its effort
//! estimate and the weight of the themes it touches.

pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;

pub use commands::ingest::InputPaths;
pub use commands::report::{write_reports, ReportFormat};
pub use commands::scoring::{analyze_inputs, default_model, run_full_analysis_internal, AnalysisInputs};
pub use error::{ClassifyError, IngestError, LexiconError};
pub use models::impact_score::{AnalysisResult, ImpactScore, ScoreWeights};
