//! Source-tag metadata derivation.
//!
//! Cohort, item subset, and presentation condition are all encoded in the
//! source tag string. Matching is case-sensitive substring matching, one
//! rule per field, applied in a fixed order. Pure function of the tag —
//! no external state, no filtering: every record in, one record out.

use crate::types::{Cohort, ComparisonRecord, NormalizedRecord, Subset};

/// Cohort is `Expert` iff the tag contains "experts".
pub fn cohort_from_tag(tag: &str) -> Cohort {
    if tag.contains("experts") {
        Cohort::Expert
    } else {
        Cohort::Student
    }
}

/// "even" wins over "odd" when both appear; neither means the full set.
pub fn subset_from_tag(tag: &str) -> Subset {
    if tag.contains("even") {
        Subset::Even
    } else if tag.contains("odd") {
        Subset::Odd
    } else {
        Subset::All
    }
}

/// Solutions were shown unless the tag says "withoutsolutions".
pub fn solutions_shown_from_tag(tag: &str) -> bool {
    !tag.contains("withoutsolutions")
}

/// Judges in the "withsolutions2" sources did 40 comparisons, all others 20.
pub fn expected_comparisons_from_tag(tag: &str) -> u32 {
    if tag.contains("withsolutions2") {
        40
    } else {
        20
    }
}

/// Derive all tag metadata for one record.
pub fn normalize_record(record: &ComparisonRecord) -> NormalizedRecord {
    NormalizedRecord {
        source: record.source.clone(),
        judge: record.judge.clone(),
        winner: record.winner,
        loser: record.loser,
        cohort: cohort_from_tag(&record.source),
        subset: subset_from_tag(&record.source),
        solutions_shown: solutions_shown_from_tag(&record.source),
        expected_comparisons: expected_comparisons_from_tag(&record.source),
    }
}

/// Normalize a whole merged table, preserving record order.
pub fn normalize_records(records: &[ComparisonRecord]) -> Vec<NormalizedRecord> {
    records.iter().map(normalize_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(source: &str) -> ComparisonRecord {
        ComparisonRecord {
            source: source.to_string(),
            judge: "j1".to_string(),
            winner: 1,
            loser: 2,
        }
    }

    #[test]
    fn test_tag_truth_table() {
        // The nine source tags from the reference study.
        let cases = [
            ("students_even_withsolutions", Cohort::Student, Subset::Even, true, 20),
            ("students_odd_withsolutions", Cohort::Student, Subset::Odd, true, 20),
            ("students_even_withoutsolutions", Cohort::Student, Subset::Even, false, 20),
            ("students_odd_withoutsolutions", Cohort::Student, Subset::Odd, false, 20),
            ("students_withsolutions2", Cohort::Student, Subset::All, true, 40),
            ("experts_even_withsolutions", Cohort::Expert, Subset::Even, true, 20),
            ("experts_odd_withsolutions", Cohort::Expert, Subset::Odd, true, 20),
            ("experts_withsolutions2", Cohort::Expert, Subset::All, true, 40),
            ("experts_all", Cohort::Expert, Subset::All, true, 20),
        ];

        for (tag, cohort, subset, shown, expected) in cases {
            let n = normalize_record(&rec(tag));
            assert_eq!(n.cohort, cohort, "cohort for {tag}");
            assert_eq!(n.subset, subset, "subset for {tag}");
            assert_eq!(n.solutions_shown, shown, "solutions_shown for {tag}");
            assert_eq!(n.expected_comparisons, expected, "count for {tag}");
        }
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        // "Experts" does not match the lowercase rule.
        assert_eq!(cohort_from_tag("Experts_even"), Cohort::Student);
        assert!(solutions_shown_from_tag("students_WITHOUTSOLUTIONS"));
    }

    #[test]
    fn test_condition_only_tag_resolves_to_full_subset() {
        assert_eq!(subset_from_tag("students_withoutsolutions"), Subset::All);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let r = rec("experts_odd_withsolutions");
        let a = normalize_record(&r);
        let b = normalize_record(&r);
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_filtering() {
        let records = vec![rec("students_even_withsolutions"), rec("experts_withsolutions2")];
        assert_eq!(normalize_records(&records).len(), records.len());
    }

    #[test]
    fn test_winner_loser_carried_through() {
        let n = normalize_record(&ComparisonRecord {
            source: "students_even_withsolutions".to_string(),
            judge: "s07".to_string(),
            winner: 14,
            loser: 3,
        });
        assert_eq!(n.winner, 14);
        assert_eq!(n.loser, 3);
        assert_eq!(n.judge, "s07");
    }
}
