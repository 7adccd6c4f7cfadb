//! Spearman rank correlation with significance and confidence interval.
//!
//! Pure read-and-compute stage: joined difficulty tables in, one
//! `Correlation` out per cohort pairing. The p-value uses the t
//! approximation; the confidence interval uses the Fisher z transform with
//! the Bonett-Wright standard error for Spearman's rho.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::error::{PipelineError, Result};

/// Rank correlation between one cohort's difficulty estimates and the
/// reference difficulty.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Correlation {
    pub rho: f64,
    /// Two-tailed p-value from the t approximation with n - 2 df.
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub confidence_level: f64,
    pub n: usize,
}

/// Spearman's rho between two paired samples.
///
/// `context` names the pairing (e.g. "student vs reference") so a
/// degenerate input error tells the analyst which comparison broke.
/// Requires at least 4 pairs and rank variance on both sides.
pub fn spearman(
    context: &str,
    xs: &[f64],
    ys: &[f64],
    confidence_level: f64,
) -> Result<Correlation> {
    let n = xs.len();
    if n != ys.len() || n < 4 {
        return Err(PipelineError::DegenerateCorrelation {
            context: context.to_string(),
            n: n.min(ys.len()),
        });
    }

    let rank_x = average_ranks(xs);
    let rank_y = average_ranks(ys);

    // Clamp against float overshoot past +/-1 on perfectly monotone data.
    let rho = match pearson(&rank_x, &rank_y) {
        Some(rho) => rho.clamp(-1.0, 1.0),
        None => {
            return Err(PipelineError::DegenerateCorrelation {
                context: context.to_string(),
                n,
            })
        }
    };

    let df = (n - 2) as f64;
    let t_statistic = rho * (df / (1.0 - rho * rho)).sqrt();
    let p_value = match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_statistic.abs())),
        Err(_) => {
            return Err(PipelineError::DegenerateCorrelation {
                context: context.to_string(),
                n,
            })
        }
    };

    // Fisher z interval; Bonett-Wright variance (1 + rho^2/2)/(n - 3)
    // accounts for rank-based rho being noisier than Pearson's.
    let z = rho.atanh();
    let se = ((1.0 + rho * rho / 2.0) / (n as f64 - 3.0)).sqrt();
    let normal = Normal::new(0.0, 1.0).expect("standard normal is well-formed");
    let crit = normal.inverse_cdf(0.5 + confidence_level / 2.0);

    Ok(Correlation {
        rho,
        p_value,
        ci_lower: (z - crit * se).tanh(),
        ci_upper: (z + crit * se).tanh(),
        confidence_level,
        n,
    })
}

/// Ranks starting at 1, with tied values sharing their average rank.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Average of ranks i+1 ..= j+1.
        let average = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = average;
        }
        i = j + 1;
    }
    ranks
}

/// Pearson correlation; `None` when either side has zero variance.
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        None
    } else {
        Some(covariance / denominator)
    }
}
