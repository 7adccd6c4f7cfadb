use std::collections::HashMap;
use std::fmt;

use crate::error::{PipelineError, Result};

/// A judge population whose comparisons are fit independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cohort {
    Student,
    Expert,
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cohort::Student => write!(f, "student"),
            Cohort::Expert => write!(f, "expert"),
        }
    }
}

/// Which item subset a source presented to its judges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subset {
    Even,
    Odd,
    All,
}

/// One judged pairwise trial, already in winner/loser form.
///
/// `winner` is the item the judge picked as more difficult. The raw
/// "chosen"/"not chosen" column names are renamed at load time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonRecord {
    /// Source tag encoding cohort/subset/condition provenance.
    pub source: String,
    pub judge: String,
    pub winner: i64,
    pub loser: i64,
}

/// A `ComparisonRecord` plus the metadata derived from its source tag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizedRecord {
    pub source: String,
    pub judge: String,
    pub winner: i64,
    pub loser: i64,
    pub cohort: Cohort,
    pub subset: Subset,
    pub solutions_shown: bool,
    /// Comparisons each judge was asked to perform in this source (20 or 40).
    pub expected_comparisons: u32,
}

/// Latent difficulty estimate for one item: theta and its standard error.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DifficultyEstimate {
    pub item: i64,
    pub theta: f64,
    pub se: f64,
}

/// Result of fitting one cohort's paired-comparison model.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CohortFit {
    pub cohort: Cohort,
    /// One estimate per item, in the caller's item order.
    pub estimates: Vec<DifficultyEstimate>,
    /// Shrunk decisiveness effect per judge, sorted by judge ID.
    pub judge_effects: Vec<(String, f64)>,
    /// Separation statistic sepG: spread of thetas relative to their noise.
    pub separation: f64,
    /// sepG^2 / (1 + sepG^2), in [0, 1).
    pub reliability: f64,
    /// False when the iteration cap expired before the fit settled.
    /// Non-fatal: the estimates are still reported, flagged for the caller.
    pub converged: bool,
    pub iterations: usize,
    pub num_records: usize,
}

/// One sampled point of an item's expected-score curve from the IRT model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpectedScorePoint {
    /// Cohort-prefixed label used by the IRT dataset, remapped via config.
    pub item_label: String,
    pub theta: f64,
    pub expected_score: f64,
}

/// Reference difficulty for one item: the ability level where its
/// expected-score curve crosses half the maximum attainable score.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferencePoint {
    pub item: i64,
    pub theta: f64,
}

/// One row of the final joined comparison table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JoinedRow {
    pub item: i64,
    pub student_theta: f64,
    pub expert_theta: f64,
    pub reference: f64,
    /// student_theta - expert_theta.
    pub perception_gap: f64,
}

/// Maps between caller-provided i64 item IDs and internal 0..N indices.
///
/// Unknown and duplicate IDs surface as pipeline errors carrying the
/// offending ID — data integrity failures must name their culprit.
#[derive(Debug)]
pub(crate) struct IdMap {
    ids: Vec<i64>,
    id_to_idx: HashMap<i64, usize>,
}

impl IdMap {
    pub fn from_ids(ids: &[i64]) -> Result<Self> {
        let mut id_to_idx = HashMap::with_capacity(ids.len());
        for (idx, &id) in ids.iter().enumerate() {
            if id_to_idx.insert(id, idx).is_some() {
                return Err(PipelineError::DuplicateItem(id));
            }
        }
        Ok(IdMap {
            ids: ids.to_vec(),
            id_to_idx,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Resolve a caller ID, naming the source on failure.
    pub fn to_idx(&self, id: i64, source: &str) -> Result<usize> {
        self.id_to_idx
            .get(&id)
            .copied()
            .ok_or_else(|| PipelineError::UnknownItem {
                item: id,
                source: source.to_string(),
            })
    }

    pub fn to_id(&self, idx: usize) -> i64 {
        self.ids[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_map_round_trip() {
        let map = IdMap::from_ids(&[7, 3, 19]).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.to_idx(3, "src").unwrap(), 1);
        assert_eq!(map.to_id(2), 19);
    }

    #[test]
    fn test_id_map_unknown_names_source() {
        let map = IdMap::from_ids(&[1, 2]).unwrap();
        let err = map.to_idx(9, "students_even").unwrap_err();
        assert_eq!(
            err,
            PipelineError::UnknownItem {
                item: 9,
                source: "students_even".to_string(),
            }
        );
    }

    #[test]
    fn test_id_map_duplicate_rejected() {
        let err = IdMap::from_ids(&[1, 2, 1]).unwrap_err();
        assert_eq!(err, PipelineError::DuplicateItem(1));
    }

    #[test]
    fn test_cohort_display() {
        assert_eq!(Cohort::Student.to_string(), "student");
        assert_eq!(Cohort::Expert.to_string(), "expert");
    }
}
