//! Penalized maximum-likelihood fit of the Bradley-Terry difficulty model.
//!
//! Generative assumption: judge j picks item A over item B as "harder" with
//! probability sigmoid(theta_A - theta_B + b_j), where b_j is a per-judge
//! decisiveness effect shrunk toward 0 by a Gaussian prior. Every record is
//! one fully decisive outcome — no ties, no partial credit.
//!
//! The solver is a damped Newton iteration on the diagonal of the observed
//! information. A ghost opponent with theta fixed at 0 gives every item a
//! fractional win and loss, which anchors the additive indeterminacy of the
//! latent scale and keeps separable data from diverging. Iteration cost is
//! bounded: hitting the cap is recorded on the result, never fatal.

use std::collections::HashMap;

use crate::error::{PipelineError, Result};
use crate::types::{Cohort, CohortFit, DifficultyEstimate, IdMap, NormalizedRecord};

/// Fit settles when no parameter moves more than this between iterations.
const CONVERGENCE_THRESHOLD: f64 = 1e-6;

/// Newton step clamp in logits. Early iterations on sparse data can
/// overshoot badly without it.
const MAX_STEP: f64 = 1.0;

/// Options for `fit_cohort()`.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Hard cap on Newton iterations.
    pub max_iterations: usize,
    /// Variance of the Gaussian prior on judge effects. Without the prior
    /// the judge parameters are unidentified (every observed outcome is a
    /// win for the oriented pair, so unpenalized effects diverge).
    pub judge_prior_variance: f64,
    /// Fractional wins and losses each item gets against the ghost anchor
    /// at theta = 0. Pins the scale origin and keeps items that win (or
    /// lose) every single comparison at a finite theta.
    pub regularization_strength: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            max_iterations: 400,
            judge_prior_variance: 1.0,
            regularization_strength: 0.1,
        }
    }
}

/// Indexed trial: (winner index, loser index, judge index).
type Trial = (usize, usize, usize);

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Reliability ratio derived from the separation statistic:
/// sepG^2 / (1 + sepG^2). Zero at sepG = 0, approaches 1 as sepG grows.
pub fn reliability_from_separation(separation: f64) -> f64 {
    let s2 = separation * separation;
    s2 / (1.0 + s2)
}

/// Fit one cohort's paired-comparison model.
///
/// `records` may be the full normalized table; only records matching
/// `cohort` are used. `item_ids` is the known item set — every record must
/// reference items from it, and the comparison graph over those items must
/// be one connected component, otherwise the fit is ill-posed and errors
/// out naming the culprits.
pub fn fit_cohort(
    cohort: Cohort,
    item_ids: &[i64],
    records: &[NormalizedRecord],
    options: &FitOptions,
) -> Result<CohortFit> {
    if item_ids.len() < 2 {
        return Err(PipelineError::NotEnoughItems {
            cohort,
            n: item_ids.len(),
        });
    }

    let cohort_records: Vec<&NormalizedRecord> =
        records.iter().filter(|r| r.cohort == cohort).collect();
    if cohort_records.is_empty() {
        return Err(PipelineError::NoRecords { cohort });
    }

    let id_map = IdMap::from_ids(item_ids)?;
    let num_items = id_map.len();

    // Judge indices in sorted-ID order so the output is reproducible
    // regardless of record order in the input files.
    let mut judge_ids: Vec<String> = cohort_records.iter().map(|r| r.judge.clone()).collect();
    judge_ids.sort();
    judge_ids.dedup();
    let judge_index: HashMap<&str, usize> = judge_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();

    let mut trials: Vec<Trial> = Vec::with_capacity(cohort_records.len());
    for record in &cohort_records {
        let winner = id_map.to_idx(record.winner, &record.source)?;
        let loser = id_map.to_idx(record.loser, &record.source)?;
        trials.push((winner, loser, judge_index[record.judge.as_str()]));
    }

    check_connected(cohort, &id_map, num_items, &trials)?;

    let num_judges = judge_ids.len();
    let prior_precision = 1.0 / options.judge_prior_variance;
    let ghost = options.regularization_strength;

    let mut theta = vec![0.0; num_items];
    let mut bias = vec![0.0; num_judges];
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=options.max_iterations {
        iterations = iteration;

        let mut grad_theta = vec![0.0; num_items];
        let mut info_theta = vec![0.0; num_items];
        let mut grad_bias = vec![0.0; num_judges];
        let mut info_bias = vec![0.0; num_judges];

        for &(winner, loser, judge) in &trials {
            let p = sigmoid(theta[winner] - theta[loser] + bias[judge]);
            let residual = 1.0 - p;
            let fisher = p * residual;

            grad_theta[winner] += residual;
            grad_theta[loser] -= residual;
            info_theta[winner] += fisher;
            info_theta[loser] += fisher;

            grad_bias[judge] += residual;
            info_bias[judge] += fisher;
        }

        // Ghost anchor: each item wins and loses `ghost` fractional games
        // against theta = 0.
        for i in 0..num_items {
            let p = sigmoid(theta[i]);
            grad_theta[i] += ghost * (1.0 - 2.0 * p);
            info_theta[i] += 2.0 * ghost * p * (1.0 - p);
        }

        let mut max_change = 0.0_f64;

        for i in 0..num_items {
            let step = (grad_theta[i] / info_theta[i]).clamp(-MAX_STEP, MAX_STEP);
            theta[i] += step;
            max_change = max_change.max(step.abs());
        }

        for j in 0..num_judges {
            let grad = grad_bias[j] - bias[j] * prior_precision;
            let info = info_bias[j] + prior_precision;
            let step = (grad / info).clamp(-MAX_STEP, MAX_STEP);
            bias[j] += step;
            max_change = max_change.max(step.abs());
        }

        if max_change < CONVERGENCE_THRESHOLD {
            converged = true;
            break;
        }
    }

    // Standard errors from the information diagonal at the final estimates,
    // ghost pseudo-games included since they are part of the penalized
    // likelihood. Connectivity guarantees every item has at least one real
    // trial, so the information is strictly positive.
    let mut info_theta = vec![0.0; num_items];
    for &(winner, loser, judge) in &trials {
        let p = sigmoid(theta[winner] - theta[loser] + bias[judge]);
        let fisher = p * (1.0 - p);
        info_theta[winner] += fisher;
        info_theta[loser] += fisher;
    }
    for i in 0..num_items {
        let p = sigmoid(theta[i]);
        info_theta[i] += 2.0 * ghost * p * (1.0 - p);
    }

    let estimates: Vec<DifficultyEstimate> = (0..num_items)
        .map(|i| DifficultyEstimate {
            item: id_map.to_id(i),
            theta: theta[i],
            se: 1.0 / info_theta[i].sqrt(),
        })
        .collect();

    let separation = separation_statistic(&estimates);

    let judge_effects: Vec<(String, f64)> =
        judge_ids.into_iter().zip(bias.iter().copied()).collect();

    Ok(CohortFit {
        cohort,
        estimates,
        judge_effects,
        separation,
        reliability: reliability_from_separation(separation),
        converged,
        iterations,
        num_records: trials.len(),
    })
}

/// sepG: noise-corrected theta spread relative to average noise.
///
/// True variance is the observed theta variance minus the mean squared SE,
/// floored at 0.
fn separation_statistic(estimates: &[DifficultyEstimate]) -> f64 {
    let n = estimates.len() as f64;
    let mean = estimates.iter().map(|e| e.theta).sum::<f64>() / n;
    let var_observed = estimates
        .iter()
        .map(|e| (e.theta - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let mean_square_error = estimates.iter().map(|e| e.se * e.se).sum::<f64>() / n;

    let true_variance = (var_observed - mean_square_error).max(0.0);
    (true_variance / mean_square_error).sqrt()
}

/// Every item must be reachable from the anchor through the comparison
/// graph. An item never compared, or a clique of items only compared among
/// themselves, makes the fit ill-posed.
fn check_connected(
    cohort: Cohort,
    id_map: &IdMap,
    num_items: usize,
    trials: &[Trial],
) -> Result<()> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); num_items];
    for &(winner, loser, _) in trials {
        adjacency[winner].push(loser);
        adjacency[loser].push(winner);
    }

    let mut visited = vec![false; num_items];
    let mut stack = vec![0];
    visited[0] = true;
    while let Some(i) = stack.pop() {
        for &j in &adjacency[i] {
            if !visited[j] {
                visited[j] = true;
                stack.push(j);
            }
        }
    }

    let stranded: Vec<i64> = (0..num_items)
        .filter(|&i| !visited[i])
        .map(|i| id_map.to_id(i))
        .collect();

    if stranded.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::DisconnectedItems {
            cohort,
            items: stranded,
        })
    }
}
