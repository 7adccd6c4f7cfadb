//! Full-pipeline orchestration: normalize, fit per cohort, resolve the
//! reference difficulty, join, correlate.
//!
//! Each stage consumes its predecessor's complete output; nothing here is
//! mutated after its producing stage finishes, and nothing is random — the
//! same inputs yield bit-identical reports.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::bradley_terry::{fit_cohort, FitOptions};
use crate::correlate::{spearman, Correlation};
use crate::error::Result;
use crate::normalize::normalize_records;
use crate::resolver::resolve_reference;
use crate::types::{
    Cohort, CohortFit, ComparisonRecord, DifficultyEstimate, ExpectedScorePoint, JoinedRow,
    ReferencePoint,
};

/// Options for `run_analysis()`.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub fit: FitOptions,
    pub confidence_level: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            fit: FitOptions::default(),
            confidence_level: 0.95,
        }
    }
}

/// One cohort's correlation against the reference difficulty.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CohortCorrelation {
    pub cohort: Cohort,
    pub correlation: Correlation,
}

/// Join bookkeeping, reported so large exclusion rates stand out.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JoinMisses {
    /// Items carrying a difficulty estimate (the full item set).
    pub estimated_items: usize,
    /// Items with a resolved reference difficulty.
    pub reference_items: usize,
    /// Estimated items excluded from the join for lack of a reference.
    pub excluded_items: usize,
    /// Expected-score labels dropped for lack of a remap entry.
    pub dropped_labels: usize,
}

/// Everything downstream consumers need: both fits, the reference, the
/// joined comparison table, and the rank correlations.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisReport {
    pub student: CohortFit,
    pub expert: CohortFit,
    pub reference: Vec<ReferencePoint>,
    pub joined: Vec<JoinedRow>,
    pub correlations: Vec<CohortCorrelation>,
    pub join_misses: JoinMisses,
}

/// Inner join of both cohort estimates with the reference difficulty.
///
/// Items without a reference are excluded, never imputed. Returns the
/// joined rows (in the student estimates' item order) and the exclusion
/// count.
pub fn join_tables(
    student: &[DifficultyEstimate],
    expert: &[DifficultyEstimate],
    reference: &[ReferencePoint],
) -> (Vec<JoinedRow>, usize) {
    let expert_by_item: HashMap<i64, f64> =
        expert.iter().map(|e| (e.item, e.theta)).collect();
    let reference_by_item: HashMap<i64, f64> =
        reference.iter().map(|p| (p.item, p.theta)).collect();

    let mut joined = Vec::new();
    let mut excluded = 0;

    for estimate in student {
        let Some(&expert_theta) = expert_by_item.get(&estimate.item) else {
            excluded += 1;
            continue;
        };
        let Some(&reference_theta) = reference_by_item.get(&estimate.item) else {
            excluded += 1;
            continue;
        };
        joined.push(JoinedRow {
            item: estimate.item,
            student_theta: estimate.theta,
            expert_theta,
            reference: reference_theta,
            perception_gap: estimate.theta - expert_theta,
        });
    }

    (joined, excluded)
}

/// Run the whole pipeline on in-memory tables.
pub fn run_analysis(
    item_ids: &[i64],
    records: &[ComparisonRecord],
    curve_points: &[ExpectedScorePoint],
    remap: &BTreeMap<String, i64>,
    options: &AnalysisOptions,
) -> Result<AnalysisReport> {
    let normalized = normalize_records(records);

    let student = fit_cohort(Cohort::Student, item_ids, &normalized, &options.fit)?;
    let expert = fit_cohort(Cohort::Expert, item_ids, &normalized, &options.fit)?;

    let resolved = resolve_reference(curve_points, remap);

    let (joined, excluded_items) =
        join_tables(&student.estimates, &expert.estimates, &resolved.points);

    let reference_column: Vec<f64> = joined.iter().map(|row| row.reference).collect();
    let mut correlations = Vec::with_capacity(2);
    for (cohort, thetas) in [
        (
            Cohort::Student,
            joined.iter().map(|row| row.student_theta).collect::<Vec<f64>>(),
        ),
        (
            Cohort::Expert,
            joined.iter().map(|row| row.expert_theta).collect::<Vec<f64>>(),
        ),
    ] {
        let context = format!("{cohort} vs reference");
        let correlation = spearman(
            &context,
            &thetas,
            &reference_column,
            options.confidence_level,
        )?;
        correlations.push(CohortCorrelation {
            cohort,
            correlation,
        });
    }

    let join_misses = JoinMisses {
        estimated_items: item_ids.len(),
        reference_items: resolved.points.len(),
        excluded_items,
        dropped_labels: resolved.dropped_labels,
    };

    Ok(AnalysisReport {
        student,
        expert,
        reference: resolved.points,
        joined,
        correlations,
        join_misses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn estimate(item: i64, theta: f64) -> DifficultyEstimate {
        DifficultyEstimate { item, theta, se: 0.1 }
    }

    #[test]
    fn test_join_excludes_items_without_reference() {
        let student: Vec<DifficultyEstimate> =
            (1..=20).map(|i| estimate(i, i as f64 * 0.1)).collect();
        let expert: Vec<DifficultyEstimate> =
            (1..=20).map(|i| estimate(i, i as f64 * 0.05)).collect();
        let reference: Vec<ReferencePoint> = (1..=18)
            .map(|i| ReferencePoint { item: i, theta: i as f64 * 0.2 })
            .collect();

        let (joined, excluded) = join_tables(&student, &expert, &reference);
        assert_eq!(joined.len(), 18);
        assert_eq!(excluded, 2);
        assert!(joined.iter().all(|row| row.reference.is_finite()));
    }

    #[test]
    fn test_perception_gap_is_student_minus_expert() {
        let (joined, _) = join_tables(
            &[estimate(1, 1.5)],
            &[estimate(1, 0.5)],
            &[ReferencePoint { item: 1, theta: 0.0 }],
        );
        assert_eq!(joined[0].perception_gap, 1.0);
    }

    /// Pairwise records for one cohort with planted item strengths: a full
    /// round-robin (guaranteeing a connected graph) padded with random
    /// pairs up to `total`, outcomes sampled from the Bradley-Terry
    /// probabilities.
    fn synthetic_cohort(
        tag: &str,
        true_theta: &[f64],
        judges: usize,
        total: usize,
        rng: &mut SmallRng,
    ) -> Vec<ComparisonRecord> {
        let n = true_theta.len();
        let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(total);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
            }
        }
        while pairs.len() < total {
            let i = rng.random_range(0..n);
            let j = rng.random_range(0..n);
            if i != j {
                pairs.push((i.min(j), i.max(j)));
            }
        }
        pairs.truncate(total);

        pairs
            .iter()
            .enumerate()
            .map(|(trial, &(i, j))| {
                let p_i_harder =
                    1.0 / (1.0 + (-(true_theta[i] - true_theta[j])).exp());
                let (winner, loser) = if rng.random::<f64>() < p_i_harder {
                    (i, j)
                } else {
                    (j, i)
                };
                ComparisonRecord {
                    source: tag.to_string(),
                    judge: format!("{tag}_j{}", trial % judges),
                    winner: winner as i64 + 1,
                    loser: loser as i64 + 1,
                }
            })
            .collect()
    }

    /// Spearman's rho between fitted thetas and the planted ranking.
    fn rank_recovery(fit: &CohortFit, true_theta: &[f64]) -> f64 {
        let fitted: Vec<f64> = fit.estimates.iter().map(|e| e.theta).collect();
        crate::correlate::spearman("recovery", &fitted, true_theta, 0.95)
            .unwrap()
            .rho
    }

    #[test]
    fn test_end_to_end_recovers_planted_signal() {
        // 8 items spread 1.25 logits apart, centered on 0.
        let true_theta: Vec<f64> = (0..8).map(|i| (i as f64 - 3.5) * 1.25).collect();
        let item_ids: Vec<i64> = (1..=8).collect();

        let mut rng = SmallRng::seed_from_u64(42);
        let mut records =
            synthetic_cohort("students_even_withsolutions", &true_theta, 5, 40, &mut rng);
        records.extend(synthetic_cohort(
            "experts_even_withsolutions",
            &true_theta,
            5,
            40,
            &mut rng,
        ));

        // Expected-score curves consistent with the planted difficulty:
        // a 5-point item crosses half max right at its true theta.
        let mut curve_points = Vec::new();
        for (idx, &theta_true) in true_theta.iter().enumerate() {
            let label = format!("q{}", idx + 1);
            let mut ability = -5.0;
            while ability <= 5.0 {
                curve_points.push(ExpectedScorePoint {
                    item_label: label.clone(),
                    theta: ability,
                    expected_score: 5.0 / (1.0 + (-(ability - theta_true)).exp()),
                });
                ability += 0.25;
            }
        }
        let remap: BTreeMap<String, i64> =
            (1..=8).map(|i| (format!("q{i}"), i)).collect();

        let report = run_analysis(
            &item_ids,
            &records,
            &curve_points,
            &remap,
            &AnalysisOptions::default(),
        )
        .unwrap();

        assert!(
            rank_recovery(&report.student, &true_theta) > 0.9,
            "student fit failed to recover planted ranking"
        );
        assert!(
            rank_recovery(&report.expert, &true_theta) > 0.9,
            "expert fit failed to recover planted ranking"
        );

        assert_eq!(report.joined.len(), 8);
        assert_eq!(report.correlations.len(), 2);
        for cohort_correlation in &report.correlations {
            assert!(
                cohort_correlation.correlation.rho > 0.9,
                "{} correlation too weak: {}",
                cohort_correlation.cohort,
                cohort_correlation.correlation.rho
            );
        }
        assert_eq!(report.join_misses.excluded_items, 0);
        assert_eq!(report.join_misses.dropped_labels, 0);
    }

    #[test]
    fn test_rerun_is_bit_identical() {
        let true_theta: Vec<f64> = (0..6).map(|i| (i as f64 - 2.5) * 1.0).collect();
        let item_ids: Vec<i64> = (1..=6).collect();

        let mut rng = SmallRng::seed_from_u64(7);
        let mut records =
            synthetic_cohort("students_odd_withsolutions", &true_theta, 4, 30, &mut rng);
        records.extend(synthetic_cohort(
            "experts_odd_withsolutions",
            &true_theta,
            4,
            30,
            &mut rng,
        ));

        let curve_points: Vec<ExpectedScorePoint> = (1..=6)
            .flat_map(|i| {
                (-10..=10).map(move |step| ExpectedScorePoint {
                    item_label: format!("q{i}"),
                    theta: step as f64 * 0.4,
                    expected_score: 5.0 / (1.0 + (-(step as f64 * 0.4 - i as f64 + 3.5)).exp()),
                })
            })
            .collect();
        let remap: BTreeMap<String, i64> =
            (1..=6).map(|i| (format!("q{i}"), i)).collect();

        let options = AnalysisOptions::default();
        let a = run_analysis(&item_ids, &records, &curve_points, &remap, &options).unwrap();
        let b = run_analysis(&item_ids, &records, &curve_points, &remap, &options).unwrap();

        for (row_a, row_b) in a.joined.iter().zip(&b.joined) {
            assert_eq!(row_a.student_theta.to_bits(), row_b.student_theta.to_bits());
            assert_eq!(row_a.expert_theta.to_bits(), row_b.expert_theta.to_bits());
            assert_eq!(row_a.reference.to_bits(), row_b.reference.to_bits());
        }
        for (ca, cb) in a.correlations.iter().zip(&b.correlations) {
            assert_eq!(ca.correlation.rho.to_bits(), cb.correlation.rho.to_bits());
            assert_eq!(
                ca.correlation.p_value.to_bits(),
                cb.correlation.p_value.to_bits()
            );
        }
    }

    #[test]
    fn test_missing_cohort_aborts_whole_analysis() {
        let true_theta = [0.0, 1.0, 2.0];
        let mut rng = SmallRng::seed_from_u64(3);
        let records =
            synthetic_cohort("students_even_withsolutions", &true_theta, 2, 10, &mut rng);

        let err = run_analysis(
            &[1, 2, 3],
            &records,
            &[],
            &BTreeMap::new(),
            &AnalysisOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            crate::error::PipelineError::NoRecords { cohort: Cohort::Expert }
        );
    }
}
