//! Bijective best-match selection over entity collections
//!
//! This is the single point of truth for hierarchical descent: every
//! comparator that faces two collections of sub-entities (files of a
//! project, methods of a class, blocks of a function, …) funnels through
//! [`compare_collections`], which
//!
//! 1. short-circuits empty sides,
//! 2. optionally rejects wildly different collection sizes (fast scan),
//! 3. scores the full Cartesian product of cross-comparisons,
//! 4. commits matches greedily from the best score downwards, each element
//!    pairing at most once on either side, and
//! 5. charges a fixed penalty for every element left without a counterpart.

use crate::report::{EntityRef, Report};
use crate::types::CompareConfig;

/// How balanced two collection sizes are, in `0.0..=1.0`.
///
/// Equal sizes give 1.0; the more lopsided the pair, the closer to 0. The
/// square root steepens the penalty for small absolute differences.
pub fn size_balance(left: usize, right: usize) -> f64 {
    let diff = left.abs_diff(right) as f64;
    let total = (left + right) as f64;
    1.0 - (diff / total).sqrt()
}

/// Compare two collections of sub-entities under a bijective best-match
/// policy and fold the outcome into a single report for the parent pair.
///
/// The result's probability is the weight-balanced mean of all committed
/// matches and penalties; its weight is `10 * max(len(left), len(right))`
/// whenever both sides are non-empty and the fast-scan gate does not fire.
///
/// Greedy selection is deterministic: the pool is scanned in insertion
/// order (left-major), ties on (probability, weight) keep the earliest
/// candidate.
pub fn compare_collections<T>(
    first: EntityRef,
    second: EntityRef,
    left: &[T],
    right: &[T],
    config: &CompareConfig,
    describe_left: impl Fn(&T) -> EntityRef,
    describe_right: impl Fn(&T) -> EntityRef,
    compare: impl Fn(&T, &T) -> Report,
) -> Report {
    if left.is_empty() || right.is_empty() {
        return Report::identity(first, second);
    }
    if config.fast_scan && size_balance(left.len(), right.len()) < config.skip_list_threshold {
        // A penalty of the same magnitude as a single missed child.
        return Report::new(0, 10, first, second);
    }

    struct Candidate {
        left: usize,
        right: usize,
        report: Report,
    }

    let mut pool: Vec<Candidate> = Vec::with_capacity(left.len() * right.len());
    for (li, l) in left.iter().enumerate() {
        for (ri, r) in right.iter().enumerate() {
            pool.push(Candidate {
                left: li,
                right: ri,
                report: compare(l, r),
            });
        }
    }

    let mut matched_left = vec![false; left.len()];
    let mut matched_right = vec![false; right.len()];
    let mut accumulated = Report::identity(first, second);

    while !pool.is_empty() {
        let mut best = 0;
        for (i, candidate) in pool.iter().enumerate().skip(1) {
            if candidate.report.cmp_score(&pool[best].report) == std::cmp::Ordering::Greater {
                best = i;
            }
        }
        let chosen = pool.remove(best);
        matched_left[chosen.left] = true;
        matched_right[chosen.right] = true;
        pool.retain(|c| c.left != chosen.left && c.right != chosen.right);
        accumulated = accumulated.combine(chosen.report);
    }

    for (i, l) in left.iter().enumerate() {
        if !matched_left[i] {
            accumulated =
                accumulated.combine(Report::penalty(describe_left(l), EntityRef::not_found()));
        }
    }
    for (i, r) in right.iter().enumerate() {
        if !matched_right[i] {
            accumulated =
                accumulated.combine(Report::penalty(EntityRef::not_found(), describe_right(r)));
        }
    }

    accumulated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::EntityKind;

    fn parent_refs() -> (EntityRef, EntityRef) {
        (
            EntityRef::new(EntityKind::File, "left.java"),
            EntityRef::new(EntityKind::File, "right.java"),
        )
    }

    fn class_ref(name: &str) -> EntityRef {
        EntityRef::new(EntityKind::Class, name)
    }

    /// Compare indices through a fixed score matrix.
    fn run_matrix(
        left: &[usize],
        right: &[usize],
        scores: &[Vec<u32>],
        config: &CompareConfig,
    ) -> Report {
        let (first, second) = parent_refs();
        compare_collections(
            first,
            second,
            left,
            right,
            config,
            |l| class_ref(&format!("L{l}")),
            |r| class_ref(&format!("R{r}")),
            |&l, &r| {
                Report::new(
                    scores[l][r],
                    10,
                    class_ref(&format!("L{l}")),
                    class_ref(&format!("R{r}")),
                )
            },
        )
    }

    #[test]
    fn test_empty_side_yields_identity() {
        let (first, second) = parent_refs();
        let report = compare_collections(
            first,
            second,
            &[],
            &[0usize],
            &CompareConfig::default(),
            |_: &usize| unreachable!(),
            |r| class_ref(&format!("R{r}")),
            |_, _| unreachable!(),
        );
        assert_eq!(report.weight, 0);
        assert!(report.children.is_empty());
    }

    #[test]
    fn test_weight_conservation() {
        // 3 vs 2: two matches plus one left-side penalty = 10 * max(3, 2).
        let scores = vec![vec![90, 10], vec![10, 80], vec![5, 5]];
        let report = run_matrix(&[0, 1, 2], &[0, 1], &scores, &CompareConfig::default());
        assert_eq!(report.weight, 30);
    }

    #[test]
    fn test_each_element_matches_at_most_once() {
        // Both left elements prefer right 0; only one of them may have it.
        let scores = vec![vec![90, 20], vec![85, 30]];
        let report = run_matrix(&[0, 1], &[0, 1], &scores, &CompareConfig::default());

        // Greedy: (0,0)=90 commits, forcing (1,1)=30.
        assert_eq!(report.weight, 20);
        assert_eq!(report.probability, (90 + 30) / 2);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let scores = vec![vec![50, 50], vec![50, 50]];
        let report = run_matrix(&[0, 1], &[0, 1], &scores, &CompareConfig::default());

        // All scores equal: (0,0) then (1,1) commit, children in that order.
        let names: Vec<&str> = report
            .children
            .iter()
            .map(|c| c.first.name.as_str())
            .collect();
        assert_eq!(names, vec!["L0", "L1"]);
        assert_eq!(
            report.children[0].second.name, "R0",
            "first left element pairs with first right element on ties"
        );
    }

    #[test]
    fn test_unmatched_elements_become_not_found_penalties() {
        let scores = vec![vec![100, 0], vec![0, 0], vec![0, 0]];
        let report = run_matrix(&[0, 1, 2], &[0], &scores, &CompareConfig::default());

        let not_founds: Vec<&Report> = report
            .children
            .iter()
            .filter(|c| c.second.kind == EntityKind::NotFound)
            .collect();
        assert_eq!(not_founds.len(), 2);
        for orphan in not_founds {
            assert_eq!(orphan.probability, 0);
            assert_eq!(orphan.weight, 10);
        }
    }

    #[test]
    fn test_fast_scan_gate_skips_lopsided_collections() {
        let config = CompareConfig {
            fast_scan: true,
            ..CompareConfig::default()
        };
        // 1 vs 9 is far below the default balance threshold.
        let left: Vec<usize> = vec![0];
        let right: Vec<usize> = (0..9).collect();
        let scores = vec![vec![100; 9]];
        let report = run_matrix(&left, &right, &scores, &config);

        assert_eq!(report.probability, 0);
        assert_eq!(report.weight, 10);
        assert!(report.children.is_empty());
    }

    #[test]
    fn test_fast_scan_gate_passes_balanced_collections() {
        let config = CompareConfig {
            fast_scan: true,
            ..CompareConfig::default()
        };
        let scores = vec![vec![100, 0], vec![0, 100]];
        let report = run_matrix(&[0, 1], &[0, 1], &scores, &config);

        assert_eq!(report.probability, 100);
    }

    #[test]
    fn test_size_balance_bounds() {
        assert!((size_balance(5, 5) - 1.0).abs() < f64::EPSILON);
        assert!(size_balance(1, 9) < 0.2);
        assert!(size_balance(4, 5) > 0.6);
    }
}
