use crate::models::records::{BacklogItem, FeedbackRecord, TicketRecord};

pub const TICKET_TEXT_FIELDS: &[&str] = &["subject", "description"];
pub const BACKLOG_TEXT_FIELDS: &[&str] = &["title", "description"];

/// Named free-text access for records that feed text analysis.
pub trait TextFields {
    fn text_field(&self, name: &str) -> Option<&str>;
}

impl TextFields for FeedbackRecord {
    fn text_field(&self, name: &str) -> Option<&str> {
        self.text_fields.get(name).map(String::as_str)
    }
}

impl TextFields for TicketRecord {
    fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "subject" => Some(&self.subject),
            "description" => Some(&self.description),
            "category" => Some(&self.category),
            "status" => Some(&self.status),
            _ => None,
        }
    }
}

impl TextFields for BacklogItem {
    fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(&self.title),
            "description" => Some(&self.description),
            _ => None,
        }
    }
}

/// Join the given fields of a record into one analyzable string.
/// Fields are taken in order, whitespace runs collapse to a single space and
/// missing or blank fields are skipped. A record with no text yields `""`.
pub fn normalize<R, S>(record: &R, fields: &[S]) -> String
where
    R: TextFields + ?Sized,
    S: AsRef<str>,
{
    let mut out = String::new();
    for field in fields {
        let Some(value) = record.text_field(field.as_ref()) else {
            continue;
        };
        for word in value.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// Normalized feedback and ticket texts, with empty records dropped.
pub fn normalize_corpus<S: AsRef<str>>(
    feedback: &[FeedbackRecord],
    feedback_fields: &[S],
    tickets: &[TicketRecord],
) -> Vec<String> {
    let feedback_texts = feedback.iter().map(|r| normalize(r, feedback_fields));
    let ticket_texts = tickets.iter().map(|t| normalize(t, TICKET_TEXT_FIELDS));

    let corpus: Vec<String> = feedback_texts
        .chain(ticket_texts)
        .filter(|text| !text.is_empty())
        .collect();

    let skipped = feedback.len() + tickets.len() - corpus.len();
    if skipped > 0 {
        log::debug!("{skipped} records carried no free text and were skipped");
    }

    corpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn feedback(fields: &[(&str, &str)]) -> FeedbackRecord {
        FeedbackRecord {
            id: "1".to_string(),
            survey_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            satisfaction_score: 3,
            text_fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn joins_fields_in_order_with_single_spaces() {
        let record = feedback(&[("reason", "  Slow   sync "), ("suggestion", "fix\tit")]);
        assert_eq!(normalize(&record, &["suggestion", "reason"]), "fix it Slow sync");
    }

    #[test]
    fn skips_missing_and_blank_fields() {
        let record = feedback(&[("reason", "  "), ("suggestion", "more themes")]);
        assert_eq!(
            normalize(&record, &["reason", "absent", "suggestion"]),
            "more themes"
        );
    }

    #[test]
    fn empty_record_yields_empty_string() {
        let record = feedback(&[]);
        assert_eq!(normalize(&record, &["reason"]), "");
    }

    #[test]
    fn corpus_drops_records_without_text() {
        let ticket = TicketRecord {
            id: "T-1".to_string(),
            created_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            status: "open".to_string(),
            category: "bug".to_string(),
            subject: "Email".to_string(),
            description: "not delivered".to_string(),
        };
        let corpus = normalize_corpus(&[feedback(&[]), feedback(&[("reason", "ok")])], &["reason"], &[ticket]);
        assert_eq!(corpus, vec!["ok".to_string(), "Email not delivered".to_string()]);
    }
}
