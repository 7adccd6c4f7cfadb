//! Merging of per-source comparison tables into one provenance-tagged table.
//!
//! The loader does no deduplication and no semantic cleanup. It enforces
//! exactly two things, both fatal: every table must carry the same column
//! set, and no record may compare an item against itself.

use crate::error::{PipelineError, Result};
use crate::types::ComparisonRecord;

/// One raw input table, already parsed by the caller (the core does no IO).
#[derive(Debug, Clone)]
pub struct SourceTable {
    /// Source tag identifying provenance; stamped onto every record.
    pub tag: String,
    /// Column names as they appeared in the input, in input order.
    pub columns: Vec<String>,
    pub records: Vec<ComparisonRecord>,
}

/// Concatenate the input tables into one table.
///
/// The first table's column set is the reference schema; any table whose
/// columns differ (order-insensitive) aborts the whole load with a
/// `SchemaMismatch` naming the offending tag. No partial output.
pub fn merge_sources(tables: &[SourceTable]) -> Result<Vec<ComparisonRecord>> {
    let Some(first) = tables.first() else {
        return Ok(Vec::new());
    };

    let mut reference = first.columns.clone();
    reference.sort();

    let mut merged = Vec::with_capacity(tables.iter().map(|t| t.records.len()).sum());

    for table in tables {
        let mut columns = table.columns.clone();
        columns.sort();
        if columns != reference {
            return Err(PipelineError::SchemaMismatch {
                tag: table.tag.clone(),
                expected: reference.join(", "),
                found: columns.join(", "),
            });
        }

        for record in &table.records {
            if record.winner == record.loser {
                return Err(PipelineError::SelfComparison {
                    source: table.tag.clone(),
                    judge: record.judge.clone(),
                    item: record.winner,
                });
            }
            debug_assert_eq!(record.source, table.tag);
            merged.push(record.clone());
        }
    }

    Ok(merged)
}
