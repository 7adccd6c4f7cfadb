/// CSV loading for comparison tables and expected-score curves.
///
/// One comparison CSV per source. The source tag comes from the file's
/// `study` column when it has one (it must be uniform within the file),
/// otherwise from the file stem. Parsing problems are fatal and name the
/// offending file.
use std::path::Path;

use itemdiff_core::{ComparisonRecord, ExpectedScorePoint, SourceTable};

use crate::bail;

const CHOSEN_COLUMN: &str = "candidate_chosen";
const NOT_CHOSEN_COLUMN: &str = "candidate_not_chosen";
const JUDGE_COLUMN: &str = "judge";
const STUDY_COLUMN: &str = "study";

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> usize {
    headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| bail(format!("{}: missing column \"{name}\"", display(path))))
}

fn parse_item(field: &str, column: &str, path: &Path) -> i64 {
    field.trim().parse().unwrap_or_else(|_| {
        bail(format!(
            "{}: column \"{column}\" holds \"{field}\", expected an item number",
            display(path),
        ))
    })
}

/// Read one comparison CSV into a `SourceTable`.
///
/// The raw "chosen"/"not chosen" columns become winner/loser here — the
/// chosen candidate is the one the judge picked as more difficult.
pub fn load_comparison_table(path: &Path) -> SourceTable {
    let mut reader = csv::Reader::from_path(path)
        .unwrap_or_else(|e| bail(format!("Failed to open {}: {e}", display(path))));

    let headers = reader
        .headers()
        .unwrap_or_else(|e| bail(format!("{}: unreadable header row: {e}", display(path))))
        .clone();

    let chosen_idx = column_index(&headers, CHOSEN_COLUMN, path);
    let not_chosen_idx = column_index(&headers, NOT_CHOSEN_COLUMN, path);
    let judge_idx = column_index(&headers, JUDGE_COLUMN, path);
    let study_idx = headers.iter().position(|h| h == STUDY_COLUMN);

    let stem_tag = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| bail(format!("{}: cannot derive a source tag", display(path))));

    let mut tag: Option<String> = None;
    let mut rows: Vec<(String, i64, i64, Option<String>)> = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let record = result.unwrap_or_else(|e| {
            bail(format!("{}: row {}: {e}", display(path), line + 2))
        });

        let judge = record.get(judge_idx).unwrap_or("").trim().to_string();
        let winner = parse_item(record.get(chosen_idx).unwrap_or(""), CHOSEN_COLUMN, path);
        let loser = parse_item(
            record.get(not_chosen_idx).unwrap_or(""),
            NOT_CHOSEN_COLUMN,
            path,
        );
        let study = study_idx.map(|idx| record.get(idx).unwrap_or("").trim().to_string());

        if let Some(ref study) = study {
            match tag {
                None => tag = Some(study.clone()),
                Some(ref existing) if existing != study => bail(format!(
                    "{}: mixes study tags \"{existing}\" and \"{study}\"",
                    display(path),
                )),
                Some(_) => {}
            }
        }

        rows.push((judge, winner, loser, study));
    }

    let tag = tag.unwrap_or(stem_tag);

    SourceTable {
        tag: tag.clone(),
        columns: headers.iter().map(|h| h.to_string()).collect(),
        records: rows
            .into_iter()
            .map(|(judge, winner, loser, _)| ComparisonRecord {
                source: tag.clone(),
                judge,
                winner,
                loser,
            })
            .collect(),
    }
}

/// Read the expected-score table: one row per (item label, ability level).
pub fn load_expected_scores(path: &Path) -> Vec<ExpectedScorePoint> {
    let mut reader = csv::Reader::from_path(path)
        .unwrap_or_else(|e| bail(format!("Failed to open {}: {e}", display(path))));

    let headers = reader
        .headers()
        .unwrap_or_else(|e| bail(format!("{}: unreadable header row: {e}", display(path))))
        .clone();

    let item_idx = column_index(&headers, "item", path);
    let theta_idx = column_index(&headers, "theta", path);
    let score_idx = column_index(&headers, "expected_score", path);

    let parse_real = |field: &str, column: &str, line: usize| -> f64 {
        field.trim().parse().unwrap_or_else(|_| {
            bail(format!(
                "{}: row {line}: column \"{column}\" holds \"{field}\", expected a number",
                display(path),
            ))
        })
    };

    reader
        .records()
        .enumerate()
        .map(|(line, result)| {
            let record = result.unwrap_or_else(|e| {
                bail(format!("{}: row {}: {e}", display(path), line + 2))
            });
            ExpectedScorePoint {
                item_label: record.get(item_idx).unwrap_or("").trim().to_string(),
                theta: parse_real(record.get(theta_idx).unwrap_or(""), "theta", line + 2),
                expected_score: parse_real(
                    record.get(score_idx).unwrap_or(""),
                    "expected_score",
                    line + 2,
                ),
            }
        })
        .collect()
}
