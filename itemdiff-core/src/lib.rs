/// itemdiff-core: perceived vs. empirical item difficulty, as pure computation.
///
/// Pairwise judgements → per-cohort Bradley-Terry difficulty fit →
/// reference difficulty from IRT expected-score curves → rank correlation.
/// No IO, no filesystem — just math. Bring your own tables.
///
/// Items are identified by caller-provided `i64` IDs; judges and source
/// tags are plain strings. The crate maps everything to internal indices
/// itself — callers never think about indices.
///
/// # Quick start
///
/// ```rust
/// use std::collections::BTreeMap;
/// use itemdiff_core::{run_analysis, AnalysisOptions, ComparisonRecord, ExpectedScorePoint};
///
/// let item_ids = vec![1, 2, 3, 4];
///
/// // winner = the item judged more difficult
/// let mut records = Vec::new();
/// for tag in ["students_even_withsolutions", "experts_even_withsolutions"] {
///     for (judge, winner, loser) in [
///         ("j1", 2, 1), ("j1", 3, 2), ("j2", 4, 3),
///         ("j2", 3, 1), ("j3", 4, 2), ("j3", 4, 1),
///     ] {
///         records.push(ComparisonRecord {
///             source: tag.to_string(),
///             judge: judge.to_string(),
///             winner,
///             loser,
///         });
///     }
/// }
///
/// // expected-score curve per item label, from the IRT model
/// let curve: Vec<ExpectedScorePoint> = (1..=4)
///     .flat_map(|i| (-8..=8).map(move |s| ExpectedScorePoint {
///         item_label: format!("q{i}"),
///         theta: s as f64 * 0.5,
///         expected_score: 5.0 / (1.0 + (-(s as f64 * 0.5 - i as f64 + 2.5)).exp()),
///     }))
///     .collect();
/// let remap: BTreeMap<String, i64> = (1..=4).map(|i| (format!("q{i}"), i)).collect();
///
/// let report = run_analysis(&item_ids, &records, &curve, &remap, &AnalysisOptions::default())
///     .unwrap();
///
/// for row in &report.joined {
///     println!("item {}: gap {:+.3}", row.item, row.perception_gap);
/// }
/// ```

pub mod analysis;
pub mod bradley_terry;
pub mod correlate;
pub mod error;
pub mod load;
pub mod normalize;
pub mod resolver;
pub mod types;

// Re-export primary public API at crate root.
pub use analysis::{
    run_analysis, AnalysisOptions, AnalysisReport, CohortCorrelation, JoinMisses,
};
pub use bradley_terry::{fit_cohort, reliability_from_separation, FitOptions};
pub use correlate::{spearman, Correlation};
pub use error::{PipelineError, Result};
pub use load::{merge_sources, SourceTable};
pub use normalize::{normalize_record, normalize_records};
pub use resolver::{resolve_reference, ResolvedReference};
pub use types::{
    Cohort, CohortFit, ComparisonRecord, DifficultyEstimate, ExpectedScorePoint, JoinedRow,
    NormalizedRecord, ReferencePoint, Subset,
};
