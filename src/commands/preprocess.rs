use crate::commands::ingest::{
    matching_files, parse_date, parse_satisfaction, read_table, write_table, Table,
    FEEDBACK_REQUIRED_COLUMNS, TICKET_REQUIRED_COLUMNS,
};
use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const CSAT_OUTPUT_FILE: &str = "csat_processed.csv";
pub const TICKETS_OUTPUT_FILE: &str = "tickets_processed.csv";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessSummary {
    pub csat_files: usize,
    pub csat_rows: usize,
    pub ticket_files: usize,
    pub ticket_rows: usize,
    pub skipped_files: Vec<String>,
    pub outputs: Vec<PathBuf>,
}

/// Clean every raw CSAT and ticket export under `<data>/raw` into one file
/// per kind under `<data>/output`.
pub fn process_all(data_dir: &Path) -> Result<PreprocessSummary, String> {
    let raw_dir = data_dir.join("raw");
    let output_dir = data_dir.join("output");
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| format!("Failed to create {}: {e}", output_dir.display()))?;

    let mut summary = PreprocessSummary::default();

    if let Some((files, rows, out)) = process_kind(
        &raw_dir,
        "*csat*.csv",
        "CSAT",
        clean_csat_table,
        &output_dir.join(CSAT_OUTPUT_FILE),
        &mut summary.skipped_files,
    )? {
        summary.csat_files = files;
        summary.csat_rows = rows;
        summary.outputs.push(out);
    }

    if let Some((files, rows, out)) = process_kind(
        &raw_dir,
        "*ticket*.csv",
        "ticket",
        clean_ticket_table,
        &output_dir.join(TICKETS_OUTPUT_FILE),
        &mut summary.skipped_files,
    )? {
        summary.ticket_files = files;
        summary.ticket_rows = rows;
        summary.outputs.push(out);
    }

    Ok(summary)
}

fn process_kind(
    raw_dir: &Path,
    pattern: &str,
    kind: &str,
    clean: fn(Table) -> Result<Table, IngestError>,
    output_path: &Path,
    skipped: &mut Vec<String>,
) -> Result<Option<(usize, usize, PathBuf)>, String> {
    let files = matching_files(raw_dir, pattern);
    if files.is_empty() {
        log::warn!("No {kind} files found in {}", raw_dir.display());
        return Ok(None);
    }

    let mut cleaned = Vec::new();
    for file in &files {
        log::info!("Processing {kind} file: {}", file.display());
        match read_table(file).and_then(clean) {
            Ok(table) => cleaned.push(table),
            Err(e) => {
                log::error!("Error processing {}: {e}", file.display());
                skipped.push(file.display().to_string());
            }
        }
    }

    if cleaned.is_empty() {
        log::error!("No valid {kind} data to process");
        return Ok(None);
    }

    let file_count = cleaned.len();
    let combined = drop_duplicate_rows(concat_tables(cleaned));
    let row_count = combined.rows.len();

    write_table(&combined, output_path).map_err(|e| e.to_string())?;
    log::info!("Saved processed {kind} data to {}", output_path.display());

    Ok(Some((file_count, row_count, output_path.to_path_buf())))
}

/// Validate a raw CSAT export and drop rows with out-of-range scores or
/// unreadable survey dates.
pub fn clean_csat_table(mut table: Table) -> Result<Table, IngestError> {
    table.require_columns("CSAT", FEEDBACK_REQUIRED_COLUMNS)?;
    let score_idx = table.column("satisfaction_score").unwrap_or_default();
    let date_idx = table.column("survey_date").unwrap_or_default();

    let before = table.rows.len();
    table.rows.retain(|row| {
        parse_satisfaction(&row[score_idx]).is_some() && parse_date(&row[date_idx]).is_some()
    });

    let removed = before - table.rows.len();
    if removed > 0 {
        log::warn!("Found {removed} CSAT rows with scores outside 1-5 or invalid dates");
    }
    Ok(table)
}

/// Validate a raw ticket export: normalize status/category, keep the first
/// row per ticket_id, and order by creation date.
pub fn clean_ticket_table(mut table: Table) -> Result<Table, IngestError> {
    table.require_columns("Support ticket", TICKET_REQUIRED_COLUMNS)?;
    let id_idx = table.column("ticket_id").unwrap_or_default();
    let date_idx = table.column("created_date").unwrap_or_default();
    let status_idx = table.column("status").unwrap_or_default();
    let category_idx = table.column("category").unwrap_or_default();

    let mut seen = HashSet::new();
    let mut dated = Vec::with_capacity(table.rows.len());

    for mut row in std::mem::take(&mut table.rows) {
        let Some(created) = parse_date(&row[date_idx]) else {
            log::warn!("Dropping ticket '{}' with invalid created_date", row[id_idx]);
            continue;
        };
        if !seen.insert(row[id_idx].trim().to_string()) {
            continue;
        }
        for idx in [status_idx, category_idx] {
            row[idx] = row[idx].trim().to_lowercase();
        }
        dated.push((created, row));
    }

    dated.sort_by_key(|(created, _)| *created);
    table.rows = dated.into_iter().map(|(_, row)| row).collect();
    Ok(table)
}

/// Stack tables over the union of their headers (first-seen order).
pub fn concat_tables(tables: Vec<Table>) -> Table {
    let mut headers: Vec<String> = Vec::new();
    for table in &tables {
        for header in &table.headers {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }
    }

    let mut rows = Vec::new();
    for table in tables {
        let mapping: Vec<Option<usize>> = headers.iter().map(|h| table.column(h)).collect();
        for row in table.rows {
            rows.push(
                mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect(),
            );
        }
    }

    Table { headers, rows }
}

fn drop_duplicate_rows(mut table: Table) -> Table {
    let mut seen = HashSet::new();
    table.rows.retain(|row| seen.insert(row.clone()));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn csat_cleaning_requires_columns() {
        let t = table(&["satisfaction_score"], &[&["3"]]);
        assert!(matches!(
            clean_csat_table(t),
            Err(IngestError::MissingColumns { .. })
        ));
    }

    #[test]
    fn csat_cleaning_filters_scores() {
        let t = table(
            &["satisfaction_score", "survey_date"],
            &[&["3", "2024-01-01"], &["7", "2024-01-01"], &["4", "soon"]],
        );
        let cleaned = clean_csat_table(t).unwrap();
        assert_eq!(cleaned.rows, vec![vec!["3".to_string(), "2024-01-01".to_string()]]);
    }

    #[test]
    fn ticket_cleaning_dedupes_lowercases_and_sorts() {
        let t = table(
            &["ticket_id", "created_date", "status", "category"],
            &[
                &["T-2", "2024-02-01", " Open ", "Billing"],
                &["T-1", "2024-01-01", "CLOSED", "Email"],
                &["T-2", "2024-03-01", "open", "billing"],
            ],
        );
        let cleaned = clean_ticket_table(t).unwrap();
        let ids: Vec<&str> = cleaned.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["T-1", "T-2"]);
        assert_eq!(cleaned.rows[1][2], "open");
        assert_eq!(cleaned.rows[1][3], "billing");
    }

    #[test]
    fn concat_uses_union_of_headers() {
        let a = table(&["a", "b"], &[&["1", "2"]]);
        let b = table(&["b", "c"], &[&["3", "4"]]);
        let combined = concat_tables(vec![a, b]);

        assert_eq!(combined.headers, vec!["a", "b", "c"]);
        assert_eq!(combined.rows[1], vec!["".to_string(), "3".to_string(), "4".to_string()]);
    }

    #[test]
    fn process_all_writes_combined_outputs_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        fs::write(
            raw.join("csat_jan.csv"),
            "satisfaction_score,survey_date,reason_for_rating\n4,2024-01-05,ok\n4,2024-01-05,ok\n",
        )
        .unwrap();
        fs::write(
            raw.join("csat_feb.csv"),
            "satisfaction_score,survey_date,feature_feedback\n1,2024-02-05,slow app\n",
        )
        .unwrap();
        fs::write(raw.join("support_tickets_bad.csv"), "ticket_id,subject\nT-1,hi\n").unwrap();

        let summary = process_all(dir.path()).unwrap();
        assert_eq!(summary.csat_files, 2);
        assert_eq!(summary.csat_rows, 2);
        assert_eq!(summary.ticket_files, 0);
        assert_eq!(summary.skipped_files.len(), 1);

        let combined = read_table(&dir.path().join("output").join(CSAT_OUTPUT_FILE)).unwrap();
        assert_eq!(
            combined.headers,
            vec!["satisfaction_score", "survey_date", "feature_feedback", "reason_for_rating"]
        );
    }
}
