use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One satisfaction-survey response.
/// `satisfaction_score` is always within 1–5; ingestion drops anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub survey_date: NaiveDate,
    pub satisfaction_score: u8,
    pub text_fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: String,
    pub created_date: NaiveDate,
    pub status: String,
    pub category: String,
    pub subject: String,
    pub description: String,
}

/// One planned work item from the development backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String, // raw label, "High" | "Medium" | "Low" expected
    pub story_points: u32,
    pub created_date: Option<NaiveDate>,
    pub target_release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Parse a backlog priority label. Only the exact labels `High`,
    /// `Medium` and `Low` are recognized.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(Self::High),
            "Medium" => Some(Self::Medium),
            "Low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_labels_only() {
        assert_eq!(Priority::from_label("High"), Some(Priority::High));
        assert_eq!(Priority::from_label("Medium"), Some(Priority::Medium));
        assert_eq!(Priority::from_label("Low"), Some(Priority::Low));
        assert_eq!(Priority::from_label("medium"), None);
        assert_eq!(Priority::from_label("HIGH"), None);
        assert_eq!(Priority::from_label(" Low "), None);
        assert_eq!(Priority::from_label("Urgent"), None);
        assert_eq!(Priority::from_label(""), None);
    }

    #[test]
    fn ranks_high_above_low() {
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }
}
