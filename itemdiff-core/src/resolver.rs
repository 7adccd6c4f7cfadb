//! Reference difficulty from IRT expected-score curves.
//!
//! For each item the IRT model supplies an expected-score curve sampled at
//! discrete ability levels. The reference difficulty is the ability level
//! whose expected score is closest to half the maximum attainable score on
//! that item. Ties go to the lower ability level: the curve is sorted by
//! ability ascending and the first minimum wins. That rule affects
//! reproducibility, so it is fixed here and pinned by a test.

use std::collections::BTreeMap;

use crate::types::{ExpectedScorePoint, ReferencePoint};

/// Output of the resolver: one point per remapped item, plus how many
/// curve labels were dropped for lack of a remap entry.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedReference {
    /// Sorted by canonical item id.
    pub points: Vec<ReferencePoint>,
    /// Labels present in the curve data but absent from the remap. Their
    /// reference difficulty is undefined for this study — dropped, not
    /// defaulted. Reported so the analyst can spot unexpected exclusions.
    pub dropped_labels: usize,
}

/// Resolve one reference difficulty per remapped item.
///
/// `remap` is the external lookup from the IRT dataset's item labels to
/// canonical item numbers. A BTreeMap keeps the iteration order, and thus
/// the output, independent of how the config was written.
pub fn resolve_reference(
    curve_points: &[ExpectedScorePoint],
    remap: &BTreeMap<String, i64>,
) -> ResolvedReference {
    let mut curves: BTreeMap<&str, Vec<&ExpectedScorePoint>> = BTreeMap::new();
    for point in curve_points {
        curves.entry(point.item_label.as_str()).or_default().push(point);
    }

    let mut points = Vec::new();
    let mut dropped_labels = 0;

    for (label, mut curve) in curves {
        let Some(&item) = remap.get(label) else {
            dropped_labels += 1;
            continue;
        };

        // Ascending ability order; the tie-break below relies on it.
        curve.sort_by(|a, b| a.theta.total_cmp(&b.theta));

        let max_score = curve
            .iter()
            .map(|p| p.expected_score)
            .fold(f64::NEG_INFINITY, f64::max);
        let target = max_score / 2.0;

        // First minimum wins: strict `<` keeps the earlier (lower-ability)
        // point when two levels are equally close to the target.
        let mut best = curve[0];
        let mut best_distance = (best.expected_score - target).abs();
        for point in &curve[1..] {
            let distance = (point.expected_score - target).abs();
            if distance < best_distance {
                best = point;
                best_distance = distance;
            }
        }

        points.push(ReferencePoint {
            item,
            theta: best.theta,
        });
    }

    points.sort_by_key(|p| p.item);

    ResolvedReference {
        points,
        dropped_labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(label: &str, theta: f64, score: f64) -> ExpectedScorePoint {
        ExpectedScorePoint {
            item_label: label.to_string(),
            theta,
            expected_score: score,
        }
    }

    fn remap(entries: &[(&str, i64)]) -> BTreeMap<String, i64> {
        entries.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_monotone_curve_picks_half_max() {
        // Curve rises 0..5; half max is 2.5, hit closest at theta 0.1.
        let curve = vec![
            point("q1", -1.0, 0.0),
            point("q1", -0.5, 1.0),
            point("q1", 0.1, 2.4),
            point("q1", 0.5, 4.0),
            point("q1", 1.0, 5.0),
        ];
        let resolved = resolve_reference(&curve, &remap(&[("q1", 1)]));
        assert_eq!(resolved.points, vec![ReferencePoint { item: 1, theta: 0.1 }]);
    }

    #[test]
    fn test_exact_crossing_is_selected() {
        let curve = vec![
            point("q1", 0.0, 2.0),
            point("q1", 0.3, 2.5),
            point("q1", 0.6, 3.2),
            point("q1", 1.0, 5.0),
        ];
        let resolved = resolve_reference(&curve, &remap(&[("q1", 1)]));
        assert_eq!(resolved.points[0].theta, 0.3);
    }

    #[test]
    fn test_tie_breaks_to_lower_ability() {
        // 2.4 and 2.6 are equally close to 2.5; the lower ability wins.
        let curve = vec![
            point("q1", -0.2, 2.4),
            point("q1", 0.4, 2.6),
            point("q1", 1.0, 5.0),
        ];
        let resolved = resolve_reference(&curve, &remap(&[("q1", 1)]));
        assert_eq!(resolved.points[0].theta, -0.2);
    }

    #[test]
    fn test_tie_break_ignores_input_order() {
        let mut curve = vec![
            point("q1", 0.4, 2.6),
            point("q1", 1.0, 5.0),
            point("q1", -0.2, 2.4),
        ];
        let forward = resolve_reference(&curve, &remap(&[("q1", 1)]));
        curve.reverse();
        let backward = resolve_reference(&curve, &remap(&[("q1", 1)]));
        assert_eq!(forward.points, backward.points);
        assert_eq!(forward.points[0].theta, -0.2);
    }

    #[test]
    fn test_unmapped_labels_dropped_and_counted() {
        let curve = vec![
            point("q1", 0.0, 2.5),
            point("q1", 1.0, 5.0),
            point("extra_item", 0.0, 1.5),
            point("extra_item", 1.0, 3.0),
        ];
        let resolved = resolve_reference(&curve, &remap(&[("q1", 7)]));
        assert_eq!(resolved.points.len(), 1);
        assert_eq!(resolved.points[0].item, 7);
        assert_eq!(resolved.dropped_labels, 1);
    }

    #[test]
    fn test_output_sorted_by_item_id() {
        let curve = vec![
            point("zz_late", 0.0, 1.0),
            point("zz_late", 1.0, 2.0),
            point("aa_early", 0.0, 1.0),
            point("aa_early", 1.0, 2.0),
        ];
        let resolved = resolve_reference(&curve, &remap(&[("zz_late", 2), ("aa_early", 11)]));
        let ids: Vec<i64> = resolved.points.iter().map(|p| p.item).collect();
        assert_eq!(ids, vec![2, 11]);
    }

    #[test]
    fn test_per_item_max_score() {
        // Max differs per item: q1 tops at 5 (target 2.5), q2 at 3 (1.5).
        let curve = vec![
            point("q1", 0.0, 2.5),
            point("q1", 2.0, 5.0),
            point("q2", -1.0, 1.5),
            point("q2", 2.0, 3.0),
        ];
        let resolved = resolve_reference(&curve, &remap(&[("q1", 1), ("q2", 2)]));
        assert_eq!(resolved.points[0].theta, 0.0);
        assert_eq!(resolved.points[1].theta, -1.0);
    }
}
