/// Output formatting: terminal tables and JSON.
use itemdiff_core::{AnalysisReport, CohortFit, DifficultyEstimate, JoinedRow};
use serde::Serialize;

#[derive(Serialize)]
struct JsonEstimate {
    item: i64,
    theta: f64,
    se: f64,
}

#[derive(Serialize)]
struct JsonCohort {
    cohort: String,
    reliability: f64,
    separation: f64,
    converged: bool,
    iterations: usize,
    comparisons: usize,
    estimates: Vec<JsonEstimate>,
}

#[derive(Serialize)]
struct JsonCorrelation {
    cohort: String,
    rho: f64,
    p_value: f64,
    ci_lower: f64,
    ci_upper: f64,
    n: usize,
}

#[derive(Serialize)]
struct JsonJoinedRow {
    item: i64,
    student_theta: f64,
    expert_theta: f64,
    reference: f64,
    perception_gap: f64,
}

#[derive(Serialize)]
struct JsonOutput {
    cohorts: Vec<JsonCohort>,
    joined: Vec<JsonJoinedRow>,
    correlations: Vec<JsonCorrelation>,
    excluded_items: usize,
    dropped_labels: usize,
}

fn json_cohort(fit: &CohortFit) -> JsonCohort {
    JsonCohort {
        cohort: fit.cohort.to_string(),
        reliability: fit.reliability,
        separation: fit.separation,
        converged: fit.converged,
        iterations: fit.iterations,
        comparisons: fit.num_records,
        estimates: fit
            .estimates
            .iter()
            .map(|e| JsonEstimate {
                item: e.item,
                theta: e.theta,
                se: e.se,
            })
            .collect(),
    }
}

/// Print the full report as JSON.
pub fn print_json(report: &AnalysisReport) {
    let output = JsonOutput {
        cohorts: vec![json_cohort(&report.student), json_cohort(&report.expert)],
        joined: report
            .joined
            .iter()
            .map(|row| JsonJoinedRow {
                item: row.item,
                student_theta: row.student_theta,
                expert_theta: row.expert_theta,
                reference: row.reference,
                perception_gap: row.perception_gap,
            })
            .collect(),
        correlations: report
            .correlations
            .iter()
            .map(|c| JsonCorrelation {
                cohort: c.cohort.to_string(),
                rho: c.correlation.rho,
                p_value: c.correlation.p_value,
                ci_lower: c.correlation.ci_lower,
                ci_upper: c.correlation.ci_upper,
                n: c.correlation.n,
            })
            .collect(),
        excluded_items: report.join_misses.excluded_items,
        dropped_labels: report.join_misses.dropped_labels,
    };

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

fn print_difficulty_table(estimates: &[DifficultyEstimate]) {
    println!("Item |   Theta |     SE");
    println!("-----|---------|-------");
    for estimate in estimates {
        println!(
            "{:>4} | {:>7.3} | {:>6.3}",
            estimate.item, estimate.theta, estimate.se,
        );
    }
}

fn print_cohort(fit: &CohortFit) {
    let convergence = if fit.converged {
        format!("converged in {} iterations", fit.iterations)
    } else {
        format!("NOT converged after {} iterations", fit.iterations)
    };
    println!(
        "\n{} cohort — {} comparisons, reliability {:.3} (sepG {:.2}), {}",
        fit.cohort, fit.num_records, fit.reliability, fit.separation, convergence,
    );
    print_difficulty_table(&fit.estimates);
}

fn print_joined_table(joined: &[JoinedRow]) {
    println!("\nJoined comparison table ({} items):", joined.len());
    println!("Item | Student |  Expert | Reference |     Gap");
    println!("-----|---------|---------|-----------|--------");
    for row in joined {
        println!(
            "{:>4} | {:>7.3} | {:>7.3} | {:>9.3} | {:>+7.3}",
            row.item, row.student_theta, row.expert_theta, row.reference, row.perception_gap,
        );
    }
}

/// Print the full report as formatted terminal tables.
pub fn print_report(report: &AnalysisReport) {
    print_cohort(&report.student);
    print_cohort(&report.expert);
    print_joined_table(&report.joined);

    println!("\nRank correlation against reference difficulty:");
    for c in &report.correlations {
        let level = (c.correlation.confidence_level * 100.0).round();
        println!(
            "  {} — rho {:+.3}, p {:.4}, {level:.0}% CI [{:+.3}, {:+.3}], n = {}",
            c.cohort,
            c.correlation.rho,
            c.correlation.p_value,
            c.correlation.ci_lower,
            c.correlation.ci_upper,
            c.correlation.n,
        );
    }

    let misses = &report.join_misses;
    println!(
        "\n{} of {} estimated items joined against {} reference items \
         ({} excluded, {} curve labels without a remap entry)",
        report.joined.len(),
        misses.estimated_items,
        misses.reference_items,
        misses.excluded_items,
        misses.dropped_labels,
    );
}
