use crate::error::IngestError;
use crate::models::records::{BacklogItem, FeedbackRecord, TicketRecord};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

pub const FEEDBACK_REQUIRED_COLUMNS: &[&str] = &["satisfaction_score", "survey_date"];
pub const TICKET_REQUIRED_COLUMNS: &[&str] = &["ticket_id", "created_date", "status", "category"];
pub const BACKLOG_REQUIRED_COLUMNS: &[&str] = &[
    "ticket_id",
    "title",
    "description",
    "status",
    "priority",
    "created_date",
    "target_release_date",
    "story_points",
];

pub const DEFAULT_FEEDBACK_TEXT_COLUMNS: &[&str] =
    &["reason_for_rating", "feature_feedback", "improvement_suggestions"];

/// In-memory CSV table. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell<'r>(&self, row: &'r [String], name: &str) -> Option<&'r str> {
        self.column(name)
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
    }

    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|col| self.column(col).is_none())
            .map(|col| col.to_string())
            .collect()
    }

    pub fn require_columns(&self, table: &str, required: &[&str]) -> Result<(), IngestError> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IngestError::MissingColumns {
                table: table.to_string(),
                missing,
            })
        }
    }
}

/// Records loaded from one table plus the number of rows rejected.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputPaths {
    pub feedback: Option<PathBuf>,
    pub tickets: Option<PathBuf>,
    pub backlog: Option<PathBuf>,
}

impl InputPaths {
    /// Fill any unset path from `fallback`.
    pub fn or(self, fallback: InputPaths) -> InputPaths {
        InputPaths {
            feedback: self.feedback.or(fallback.feedback),
            tickets: self.tickets.or(fallback.tickets),
            backlog: self.backlog.or(fallback.backlog),
        }
    }
}

/// Locate processed feedback/ticket files in `<data>/output` and the backlog
/// export in `<data>/raw`.
pub fn discover_inputs(data_dir: &Path) -> InputPaths {
    let output_dir = data_dir.join("output");
    let raw_dir = data_dir.join("raw");

    let paths = InputPaths {
        feedback: first_match(&output_dir, "*csat*.csv"),
        tickets: first_match(&output_dir, "*ticket*.csv"),
        backlog: first_match(&raw_dir, "*dev*backlog*.csv"),
    };

    if paths.feedback.is_none() {
        log::warn!("No CSAT data file found in {}", output_dir.display());
    }
    if paths.tickets.is_none() {
        log::warn!("No support tickets file found in {}", output_dir.display());
    }
    if paths.backlog.is_none() {
        log::warn!("No development backlog file found in {}", raw_dir.display());
    }

    paths
}

pub(crate) fn matching_files(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let Some(dir) = dir.to_str() else {
        return Vec::new();
    };
    let pattern = Path::new(&glob::Pattern::escape(dir))
        .join(pattern)
        .to_string_lossy()
        .to_string();
    let mut files: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.flatten().filter(|p| p.is_file()).collect(),
        Err(e) => {
            log::warn!("Invalid file pattern {pattern}: {e}");
            Vec::new()
        }
    };
    files.sort();
    files
}

fn first_match(dir: &Path, pattern: &str) -> Option<PathBuf> {
    matching_files(dir, pattern).into_iter().next()
}

pub fn read_table(path: &Path) -> Result<Table, IngestError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|source| IngestError::Csv {
            path: display.clone(),
            source,
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| IngestError::Csv {
            path: display.clone(),
            source,
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Csv {
            path: display.clone(),
            source,
        })?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

pub fn write_table(table: &Table, path: &Path) -> Result<(), IngestError> {
    let display = path.display().to_string();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| IngestError::Io {
            path: display.clone(),
            source,
        })?;
    }

    let to_csv_err = |source| IngestError::Csv {
        path: display.clone(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(to_csv_err)?;
    writer.write_record(&table.headers).map_err(to_csv_err)?;
    for row in &table.rows {
        writer.write_record(row).map_err(to_csv_err)?;
    }
    writer.flush().map_err(|source| IngestError::Io {
        path: display.clone(),
        source,
    })
}

pub fn load_feedback<S: AsRef<str>>(
    path: &Path,
    text_columns: &[S],
) -> Result<Loaded<FeedbackRecord>, IngestError> {
    let table = read_table(path)?;
    table.require_columns("CSAT", FEEDBACK_REQUIRED_COLUMNS)?;

    let present: Vec<&str> = text_columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|col| table.column(col).is_some())
        .collect();
    if present.is_empty() {
        log::warn!("CSAT file {} has none of the configured text columns", path.display());
    }

    let mut records = Vec::with_capacity(table.rows.len());
    let mut dropped = 0;

    for (index, row) in table.rows.iter().enumerate() {
        let score = table.cell(row, "satisfaction_score").and_then(parse_satisfaction);
        let date = table.cell(row, "survey_date").and_then(parse_date);
        let (Some(satisfaction_score), Some(survey_date)) = (score, date) else {
            dropped += 1;
            continue;
        };

        let id = table
            .cell(row, "response_id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| (index + 1).to_string());

        let text_fields: BTreeMap<String, String> = present
            .iter()
            .filter_map(|col| {
                table
                    .cell(row, col)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (col.to_string(), v.to_string()))
            })
            .collect();

        records.push(FeedbackRecord {
            id,
            survey_date,
            satisfaction_score,
            text_fields,
        });
    }

    log_loaded("CSAT", path, records.len(), dropped);
    Ok(Loaded { records, dropped })
}

pub fn load_tickets(path: &Path) -> Result<Loaded<TicketRecord>, IngestError> {
    let table = read_table(path)?;
    table.require_columns("Support ticket", TICKET_REQUIRED_COLUMNS)?;

    let mut records = Vec::with_capacity(table.rows.len());
    let mut dropped = 0;

    for row in &table.rows {
        let id = table.cell(row, "ticket_id").map(str::trim).unwrap_or_default();
        let Some(created_date) = table.cell(row, "created_date").and_then(parse_date) else {
            dropped += 1;
            continue;
        };
        if id.is_empty() {
            dropped += 1;
            continue;
        }

        let text = |name: &str| table.cell(row, name).unwrap_or_default().trim().to_string();
        records.push(TicketRecord {
            id: id.to_string(),
            created_date,
            status: text("status"),
            category: text("category"),
            subject: text("subject"),
            description: text("description"),
        });
    }

    log_loaded("Support ticket", path, records.len(), dropped);
    Ok(Loaded { records, dropped })
}

pub fn load_backlog(path: &Path) -> Result<Loaded<BacklogItem>, IngestError> {
    let table = read_table(path)?;
    table.require_columns("Development backlog", BACKLOG_REQUIRED_COLUMNS)?;

    let mut records: Vec<BacklogItem> = Vec::with_capacity(table.rows.len());
    let mut seen = HashSet::new();
    let mut dropped = 0;

    for row in &table.rows {
        let id = table.cell(row, "ticket_id").map(str::trim).unwrap_or_default();
        let points = table.cell(row, "story_points").and_then(parse_story_points);

        let Some(story_points) = points.filter(|_| !id.is_empty()) else {
            log::warn!("Dropping backlog row '{id}': missing identifier or invalid story points");
            dropped += 1;
            continue;
        };
        if !seen.insert(id.to_string()) {
            log::warn!("Dropping duplicate backlog item {id}");
            dropped += 1;
            continue;
        }

        let text = |name: &str| table.cell(row, name).unwrap_or_default().trim().to_string();
        records.push(BacklogItem {
            id: id.to_string(),
            title: text("title"),
            description: text("description"),
            status: text("status"),
            priority: text("priority"),
            story_points,
            created_date: table.cell(row, "created_date").and_then(parse_date),
            target_release_date: table.cell(row, "target_release_date").and_then(parse_date),
        });
    }

    log_loaded("Development backlog", path, records.len(), dropped);
    Ok(Loaded { records, dropped })
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    None
}

/// Integral score within 1–5. Spreadsheet exports often write "4.0".
pub fn parse_satisfaction(raw: &str) -> Option<u8> {
    let value: f64 = raw.trim().parse().ok()?;
    if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return None;
    }
    Some(value as u8)
}

pub fn parse_story_points(raw: &str) -> Option<u32> {
    let value: f64 = raw.trim().parse().ok()?;
    if value.fract() != 0.0 || value < 1.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

fn log_loaded(table: &str, path: &Path, kept: usize, dropped: usize) {
    log::info!("Loaded {kept} {table} rows from {}", path.display());
    if dropped > 0 {
        log::warn!("Dropped {dropped} invalid {table} rows from {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn parses_common_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("2024-03-09 14:30:00"), expected);
        assert_eq!(parse_date("2024-03-09T14:30:00Z"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn satisfaction_must_be_integral_and_in_range() {
        assert_eq!(parse_satisfaction("4"), Some(4));
        assert_eq!(parse_satisfaction("5.0"), Some(5));
        assert_eq!(parse_satisfaction("0"), None);
        assert_eq!(parse_satisfaction("6"), None);
        assert_eq!(parse_satisfaction("3.5"), None);
        assert_eq!(parse_satisfaction("n/a"), None);
    }

    #[test]
    fn story_points_must_be_positive_integers() {
        assert_eq!(parse_story_points("13"), Some(13));
        assert_eq!(parse_story_points("0"), None);
        assert_eq!(parse_story_points("-3"), None);
        assert_eq!(parse_story_points("2.5"), None);
    }

    #[test]
    fn backlog_missing_columns_is_a_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "dev_backlog.csv", "ticket_id,title\nDEV-1,Thing\n");

        match load_backlog(&path) {
            Err(IngestError::MissingColumns { table, missing }) => {
                assert_eq!(table, "Development backlog");
                assert!(missing.contains(&"story_points".to_string()));
                assert!(missing.contains(&"priority".to_string()));
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn feedback_rows_outside_score_range_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "csat.csv",
            "satisfaction_score,survey_date,reason_for_rating\n\
             5,2024-01-01,\"Love it, thanks\"\n\
             9,2024-01-02,out of range\n\
             2,2024-01-03,\n",
        );

        let loaded = load_feedback(&path, DEFAULT_FEEDBACK_TEXT_COLUMNS).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.dropped, 1);
        assert_eq!(loaded.records[0].id, "1");
        assert_eq!(
            loaded.records[0].text_fields.get("reason_for_rating").map(String::as_str),
            Some("Love it, thanks")
        );
        assert!(loaded.records[1].text_fields.is_empty());
    }

    #[test]
    fn backlog_duplicates_and_bad_points_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "dev_backlog.csv",
            "ticket_id,title,description,status,priority,created_date,target_release_date,story_points\n\
             DEV-1,Email sync,Fix it,open,High,2024-01-01,2024-03-01,8\n\
             DEV-1,Dup,Dup,open,Low,2024-01-01,,3\n\
             DEV-2,Zero,None,open,Low,2024-01-01,,0\n\
             DEV-3,Mobile,App,open,Medium,,,5\n",
        );

        let loaded = load_backlog(&path).unwrap();
        let ids: Vec<&str> = loaded.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["DEV-1", "DEV-3"]);
        assert_eq!(loaded.dropped, 2);
        assert_eq!(loaded.records[1].created_date, None);
    }

    #[test]
    fn discovers_inputs_by_name_pattern() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("output")).unwrap();
        fs::create_dir_all(dir.path().join("raw")).unwrap();
        write(&dir.path().join("output"), "csat_processed.csv", "x\n");
        write(&dir.path().join("output"), "tickets_processed.csv", "x\n");
        write(&dir.path().join("raw"), "q3_dev_backlog.csv", "x\n");

        let paths = discover_inputs(dir.path());
        assert!(paths.feedback.unwrap().ends_with("csat_processed.csv"));
        assert!(paths.tickets.unwrap().ends_with("tickets_processed.csv"));
        assert!(paths.backlog.unwrap().ends_with("q3_dev_backlog.csv"));
    }
}
