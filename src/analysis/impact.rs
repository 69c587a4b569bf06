use crate::analysis::text::{normalize, BACKLOG_TEXT_FIELDS};
use crate::analysis::theme_stats::ThemeStatistics;
use crate::analysis::themes::ThemeTagger;
use crate::models::impact_score::{ComponentScore, ImpactScore, ScoreComponents, ScoreWeights};
use crate::models::records::{BacklogItem, Priority};
use std::cmp::Ordering;

/// Story points beyond this earn no further effort credit.
pub const EFFORT_CEILING: u32 = 34;

pub struct ImpactScorer<'a> {
    tagger: &'a ThemeTagger,
    weights: ScoreWeights,
}

impl<'a> ImpactScorer<'a> {
    pub fn new(tagger: &'a ThemeTagger, weights: ScoreWeights) -> Self {
        Self { tagger, weights }
    }

    pub fn score(&self, item: &BacklogItem, stats: &ThemeStatistics) -> ImpactScore {
        let (priority_raw, priority_detail) = match Priority::from_label(&item.priority) {
            Some(priority) => (
                priority_component(priority),
                format!("priority {priority:?}"),
            ),
            None => {
                log::warn!(
                    "Backlog item {} has unrecognized priority '{}'; treating it as Low",
                    item.id,
                    item.priority
                );
                (
                    priority_component(Priority::Low),
                    format!("unrecognized priority '{}' treated as Low", item.priority),
                )
            }
        };

        let effort_raw = effort_component(item.story_points);

        let matched = self.tagger.tag(&normalize(item, BACKLOG_TEXT_FIELDS));
        let theme_raw = theme_component(matched.iter().map(String::as_str), stats);
        let theme_details = matched
            .iter()
            .map(|theme| format!("{theme}: {:.3}", stats.get(theme).unwrap_or(0.0)))
            .collect();

        let components = ScoreComponents {
            priority: ComponentScore::new(priority_raw, self.weights.priority, vec![priority_detail]),
            effort: ComponentScore::new(
                effort_raw,
                self.weights.effort,
                vec![format!("{} points (ceiling {EFFORT_CEILING})", item.story_points)],
            ),
            theme: ComponentScore::new(theme_raw, self.weights.theme, theme_details),
        };

        let composite_score = (components.priority.contribution
            + components.effort.contribution
            + components.theme.contribution)
            .clamp(0.0, 1.0);

        ImpactScore {
            ticket_id: item.id.clone(),
            title: item.title.clone(),
            priority: item.priority.clone(),
            story_points: item.story_points,
            composite_score,
            components,
            matched_themes: matched.into_iter().collect(),
        }
    }

    /// Score every item and order by composite score, highest first. Exact
    /// ties fall back to ascending identifier.
    pub fn rank(&self, items: &[BacklogItem], stats: &ThemeStatistics) -> Vec<ImpactScore> {
        let mut scores: Vec<ImpactScore> = items.iter().map(|item| self.score(item, stats)).collect();
        scores.sort_by(compare_scores);
        scores
    }
}

pub fn priority_component(priority: Priority) -> f64 {
    f64::from(priority.rank()) / 3.0
}

pub fn effort_component(story_points: u32) -> f64 {
    f64::from(story_points.min(EFFORT_CEILING)) / f64::from(EFFORT_CEILING)
}

/// Sum of matched theme weights relative to the corpus' strongest theme,
/// capped at 1.0. An item touching several strong themes scores the same as
/// one touching only the strongest, which keeps the composite within [0, 1].
pub fn theme_component<'t>(matched: impl IntoIterator<Item = &'t str>, stats: &ThemeStatistics) -> f64 {
    let max = stats.max_weight();
    if stats.is_empty() || max <= 0.0 {
        return 0.0;
    }

    let raw: f64 = matched
        .into_iter()
        .map(|theme| stats.get(theme).unwrap_or(0.0))
        .sum();

    (raw / max).min(1.0)
}

pub fn compare_scores(a: &ImpactScore, b: &ImpactScore) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| a.ticket_id.cmp(&b.ticket_id))
}
