//! Error types for the analysis pipeline.
//!
//! Fatal errors always name the offending source, item, or cohort —
//! "fit failed" alone is useless to the analyst.

use std::fmt;

use crate::types::Cohort;

// Display/Error are written by hand rather than derived with thiserror:
// the spec-mandated field name `source` would otherwise be picked up as
// the error's cause, which these String fields are not.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Input tables disagree on their column set. No partial load.
    SchemaMismatch {
        tag: String,
        expected: String,
        found: String,
    },

    /// A record compares an item against itself.
    SelfComparison {
        source: String,
        judge: String,
        item: i64,
    },

    /// A record references an item outside the known item set.
    UnknownItem { item: i64, source: String },

    /// Duplicate ID in the caller-supplied item set.
    DuplicateItem(i64),

    /// The comparison graph does not link every item into one component.
    /// Listed items are the ones unreachable from the first item
    /// (including items never compared at all).
    DisconnectedItems { cohort: Cohort, items: Vec<i64> },

    /// A cohort has no comparison records at all.
    NoRecords { cohort: Cohort },

    /// Fewer than two items — nothing to compare.
    NotEnoughItems { cohort: Cohort, n: usize },

    /// Too few paired observations, or zero rank variance, for a
    /// meaningful rank correlation.
    DegenerateCorrelation { context: String, n: usize },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch {
                tag,
                expected,
                found,
            } => write!(
                f,
                "source \"{tag}\" has columns [{found}], expected [{expected}]"
            ),
            Self::SelfComparison {
                source,
                judge,
                item,
            } => write!(
                f,
                "source \"{source}\", judge \"{judge}\": item {item} compared against itself"
            ),
            Self::UnknownItem { item, source } => {
                write!(f, "source \"{source}\": unknown item {item}")
            }
            Self::DuplicateItem(id) => write!(f, "duplicate item ID {id} in item set"),
            Self::DisconnectedItems { cohort, items } => write!(
                f,
                "{cohort} cohort: comparison graph leaves items {items:?} disconnected"
            ),
            Self::NoRecords { cohort } => write!(f, "{cohort} cohort has no comparison records"),
            Self::NotEnoughItems { cohort, n } => {
                write!(f, "{cohort} cohort: need at least 2 items, got {n}")
            }
            Self::DegenerateCorrelation { context, n } => write!(
                f,
                "{context}: cannot correlate {n} pairs (need >= 4 with rank variance)"
            ),
        }
    }
}

impl std::error::Error for PipelineError {}

pub type Result<T> = std::result::Result<T, PipelineError>;
