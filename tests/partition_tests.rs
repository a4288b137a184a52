//! End-to-end partitioning behavior over scripted and resource documents.

use std::cell::RefCell;

use pagesplit_core::prelude::*;
use pagesplit_io::{ResourceDocument, ScriptedDocument};
use pagesplit_plan::verify::{assert_covers, assert_within_budget};
use pagesplit_plan::Partitioner;

const MB: f64 = BYTES_PER_MB;

/// Cumulative size (MB) of a range of `k + 1` pages.
const TEN_PAGES_MB: [f64; 10] = [1.0, 1.9, 2.7, 3.4, 4.0, 4.5, 4.9, 5.2, 5.4, 5.5];

fn four_mb() -> SizeBudget {
    SizeBudget::from_megabytes(4.0, 0.9).unwrap()
}

fn ranges(plan: &PartitionPlan) -> Vec<(usize, usize)> {
    plan.ranges().iter().map(|r| (r.start(), r.end())).collect()
}

fn completed(outcome: SplitOutcome) -> (PartitionPlan, PartitionStats) {
    match outcome {
        SplitOutcome::Completed { plan, stats } => (plan, stats),
        SplitOutcome::Cancelled => panic!("unexpected cancellation"),
    }
}

#[test]
fn test_ten_page_scenario() {
    let doc = ScriptedDocument::from_megabytes(&TEN_PAGES_MB);
    let (plan, _) = completed(Partitioner::new(four_mb()).run(&doc).unwrap());

    assert_eq!(ranges(&plan), vec![(0, 3), (4, 7), (8, 9)]);
    assert_covers(&plan, 10);
    assert_within_budget(&plan, &four_mb());
    assert_eq!(plan.oversized(), 0);
    for part in plan.parts() {
        assert!(part.size() as f64 <= 3.6 * MB);
    }
}

#[test]
fn test_plan_is_independent_of_tuning() {
    let expected = vec![(0, 3), (4, 7), (8, 9)];
    let hints = [Some(1), Some(5), None];
    let strategies = [BacktrackStrategy::Linear, BacktrackStrategy::Bisect];
    let source_hints = [None, Some((5.5 * MB) as u64)];

    let mut probe_counts = Vec::new();
    for hint in hints {
        for strategy in strategies {
            for source_hint in source_hints {
                let doc = ScriptedDocument::from_megabytes(&TEN_PAGES_MB)
                    .with_source_hint(source_hint);
                let (plan, stats) = completed(
                    Partitioner::new(four_mb())
                        .with_batch_hint(hint)
                        .with_strategy(strategy)
                        .run(&doc)
                        .unwrap(),
                );
                assert_eq!(
                    ranges(&plan),
                    expected,
                    "hint {hint:?}, {strategy:?}, source {source_hint:?}"
                );
                assert_eq!(stats.probes, doc.probes());
                probe_counts.push(stats.probes);
            }
        }
    }

    // Only the amount of work differs.
    assert!(probe_counts.iter().any(|p| *p != probe_counts[0]));
}

#[test]
fn test_batch_wider_than_backtrack_cap_keeps_the_plan() {
    // One byte per page; each part holds 100 pages.
    let profile: Vec<usize> = (1..=6000).collect();
    let budget = SizeBudget::new(100.0, 1.0).unwrap();
    assert!(profile.len() > SplitConfig::default().max_backtrack_steps);

    let doc = ScriptedDocument::new(profile.clone());
    let (expected, _) = completed(
        Partitioner::new(budget)
            .with_batch_hint(Some(1))
            .run(&doc)
            .unwrap(),
    );
    assert_eq!(expected.len(), 60);

    for strategy in [BacktrackStrategy::Linear, BacktrackStrategy::Bisect] {
        let doc = ScriptedDocument::new(profile.clone());
        let (plan, _) = completed(
            Partitioner::new(budget)
                .with_batch_hint(Some(6000))
                .with_strategy(strategy)
                .run(&doc)
                .unwrap(),
        );
        assert_eq!(ranges(&plan), ranges(&expected), "{strategy:?}");
        assert_within_budget(&plan, &budget);
    }
}

#[test]
fn test_part_bytes_come_from_the_committed_probe() {
    let doc = ScriptedDocument::new(vec![10, 20, 30, 40, 50]);
    let budget = SizeBudget::new(35.0, 1.0).unwrap();
    let (plan, stats) = completed(Partitioner::new(budget).with_batch_hint(Some(1)).run(&doc).unwrap());

    // Probes: [0], [0-1], [0-2], [0-3] over; [3], [3-4].
    assert_eq!(ranges(&plan), vec![(0, 2), (3, 4)]);
    assert_eq!(stats.probes, 6);
    assert_eq!(stats.backtrack_probes, 0);
    assert_eq!(plan.parts()[0].bytes.len(), 30);
}

#[test]
fn test_empty_document() {
    let doc = ScriptedDocument::new(vec![]);
    let (plan, stats) = completed(Partitioner::new(four_mb()).run(&doc).unwrap());
    assert!(plan.is_empty());
    assert_eq!(stats.probes, 0);
    assert_eq!(doc.probes(), 0);
}

#[test]
fn test_single_page_documents() {
    let small = ScriptedDocument::from_megabytes(&[1.0]);
    let (plan, _) = completed(Partitioner::new(four_mb()).run(&small).unwrap());
    assert_eq!(ranges(&plan), vec![(0, 0)]);
    assert!(!plan.parts()[0].exceeds_budget);

    let huge = ScriptedDocument::from_megabytes(&[10.0]);
    let (plan, _) = completed(Partitioner::new(four_mb()).run(&huge).unwrap());
    assert_eq!(ranges(&plan), vec![(0, 0)]);
    assert!(plan.parts()[0].exceeds_budget);
    assert_eq!(plan.parts()[0].size(), (10.0 * MB) as usize);
}

#[test]
fn test_oversized_page_in_the_middle() {
    // The third page pulls in a resource bigger than the whole budget.
    let mut doc = ResourceDocument::new("mixed");
    let big = doc.add_resource(vec![7; 5000]);
    for _ in 0..2 {
        doc.add_page(vec![1; 100], &[]).unwrap();
    }
    doc.add_page(vec![2; 100], &[big]).unwrap();
    for _ in 0..2 {
        doc.add_page(vec![3; 100], &[]).unwrap();
    }

    let budget = SizeBudget::new(1000.0, 1.0).unwrap();
    for strategy in [BacktrackStrategy::Linear, BacktrackStrategy::Bisect] {
        let (plan, _) = completed(
            Partitioner::new(budget)
                .with_strategy(strategy)
                .run(&doc)
                .unwrap(),
        );
        assert_covers(&plan, 5);
        assert_within_budget(&plan, &budget);
        assert_eq!(ranges(&plan), vec![(0, 1), (2, 2), (3, 4)]);
        assert_eq!(plan.oversized(), 1);
        assert!(plan.parts()[1].exceeds_budget);
    }
}

#[test]
fn test_invalid_budgets_fail_before_any_probe() {
    for (max_mb, margin) in [(0.0, 0.9), (-1.0, 0.9), (4.0, 0.0), (4.0, 1.5)] {
        let err = SizeBudget::from_megabytes(max_mb, margin).unwrap_err();
        assert!(matches!(err, Error::InvalidBudget(_)));
        assert!(err.is_preflight());
    }

    let cfg = SplitConfig {
        max_bytes: 0.0,
        ..SplitConfig::default()
    };
    assert!(matches!(Partitioner::from_config(&cfg), Err(Error::InvalidBudget(_))));
}

#[test]
fn test_serialization_failure_names_the_range() {
    let doc = ScriptedDocument::from_megabytes(&TEN_PAGES_MB).failing_on(6);
    let err = Partitioner::new(four_mb()).run(&doc).unwrap_err();
    match err {
        Error::Serialization { range, .. } => assert!(range.contains(6)),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_cancellation_yields_no_plan() {
    let doc = ScriptedDocument::from_megabytes(&TEN_PAGES_MB);
    let cancel = || doc.probes() >= 3;
    let outcome = Partitioner::new(four_mb())
        .with_batch_hint(Some(1))
        .with_cancellation(&cancel)
        .run(&doc)
        .unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(doc.probes(), 3);
    assert!(outcome.into_plan().is_none());
}

#[test]
fn test_progress_is_monotone_and_finishes() {
    let doc = ScriptedDocument::from_megabytes(&TEN_PAGES_MB);
    let seen = RefCell::new(Vec::new());
    let sink = |p: u8| seen.borrow_mut().push(p);
    completed(
        Partitioner::new(four_mb())
            .with_progress(&sink)
            .run(&doc)
            .unwrap(),
    );

    let seen = seen.into_inner();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&100));
}

#[test]
fn test_resource_document_respects_budget() {
    let mut doc = ResourceDocument::new("report");
    let font = doc.add_resource(vec![0; 4000]);
    let logo = doc.add_resource(vec![1; 2500]);
    for i in 0..40 {
        let refs = if i % 3 == 0 { vec![font, logo] } else { vec![font] };
        doc.add_page(vec![i as u8; 600 + 37 * i], &refs).unwrap();
    }

    let budget = SizeBudget::new(20_000.0, 0.9).unwrap();
    let (plan, _) = completed(Partitioner::new(budget).run(&doc).unwrap());

    assert_covers(&plan, 40);
    assert_eq!(plan.oversized(), 0);
    for part in plan.parts() {
        assert!(budget.fits(part.size()), "{} is {} bytes", part.range, part.size());
        assert_eq!(part.bytes, doc.serialize_range(part.range).unwrap());
    }

    // Greedy: adding the next page to any part but the last would overflow.
    for pair in plan.parts().windows(2) {
        let grown = pair[0].range.extend_to(pair[0].range.end() + 1).unwrap();
        assert!(!budget.fits(doc.serialize_range(grown).unwrap().len()));
    }
}
