//! Job store and background task behavior through the public exec API.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pagesplit_core::prelude::*;
use pagesplit_exec::{
    spawn_split, InMemoryJobStore, JobError, JobOutcome, JobStatus, JobStatusKind, JobStore,
    SplitEngine, TaskEvent,
};
use pagesplit_io::ScriptedDocument;

fn engine() -> Arc<SplitEngine> {
    let cfg = SplitConfig::default().with_max_megabytes(4.0);
    Arc::new(SplitEngine::new(cfg).unwrap())
}

fn ten_pages() -> ScriptedDocument {
    ScriptedDocument::from_megabytes(&[1.0, 1.9, 2.7, 3.4, 4.0, 4.5, 4.9, 5.2, 5.4, 5.5])
}

/// Sleeps on every probe so a test can cancel mid-run.
struct Slow(ScriptedDocument);

impl DocumentAccessor for Slow {
    fn page_count(&self) -> usize {
        self.0.page_count()
    }

    fn serialize_range(&self, range: PageRange) -> Result<Vec<u8>> {
        thread::sleep(Duration::from_millis(20));
        self.0.serialize_range(range)
    }
}

#[test]
fn test_background_split_completes() {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::default());
    let task = spawn_split(store.clone(), engine(), ten_pages(), "ten.pdf");
    let id = task.id();

    let mut progress = Vec::new();
    let mut finished = None;
    for event in task.events().iter() {
        match event {
            TaskEvent::Progress(p) => progress.push(p),
            TaskEvent::Finished(kind) => finished = Some(kind),
        }
    }
    assert_eq!(task.wait(), JobStatusKind::Completed);
    assert_eq!(finished, Some(JobStatusKind::Completed));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100));

    assert_eq!(store.get(id), Some(JobStatus::Completed { parts: 3 }));
    let Some(JobOutcome::Completed { plan, stats }) = store.take(id) else {
        panic!("{id} did not complete");
    };
    let spans: Vec<_> = plan.ranges().iter().map(|r| (r.start(), r.end())).collect();
    assert_eq!(spans, vec![(0, 3), (4, 7), (8, 9)]);
    assert!(stats.probes > 0);

    // Taken exactly once.
    assert!(store.take(id).is_none());
    assert_eq!(store.update_progress(id, 1), Err(JobError::UnknownJob(id)));
}

#[test]
fn test_cancel_token_stops_a_running_split() {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::default());
    let doc = Slow(ten_pages());
    let task = spawn_split(store.clone(), engine(), doc, "slow.pdf");
    let id = task.id();
    let token = task.cancel_token();

    // Cancel after the first progress report.
    for event in task.events().iter() {
        if matches!(event, TaskEvent::Progress(_)) {
            token.cancel();
            break;
        }
    }

    assert_eq!(task.wait(), JobStatusKind::Cancelled);
    assert_eq!(store.take(id), Some(JobOutcome::Cancelled));
}

#[test]
fn test_failed_split_keeps_the_reason() {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::default());
    let task = spawn_split(store.clone(), engine(), ten_pages().failing_on(0), "bad.pdf");
    let id = task.id();

    assert_eq!(task.wait(), JobStatusKind::Failed);
    let Some(JobOutcome::Failed(reason)) = store.take(id) else {
        panic!("{id} did not fail");
    };
    assert!(reason.contains("page 1"), "{reason}");
}

#[test]
fn test_concurrent_jobs_get_distinct_ids() {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::default());
    let engine = engine();
    let tasks: Vec<_> = (0..4)
        .map(|i| spawn_split(store.clone(), engine.clone(), ten_pages(), &format!("doc-{i}")))
        .collect();

    let mut ids: Vec<_> = tasks.iter().map(|t| t.id()).collect();
    for task in tasks {
        assert_eq!(task.wait(), JobStatusKind::Completed);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    for id in ids {
        assert!(matches!(store.take(id), Some(JobOutcome::Completed { .. })));
    }
}

#[test]
fn test_idle_jobs_expire() {
    let store = InMemoryJobStore::new(Duration::from_secs(60));
    let finished = store.create("finished");
    store.complete(finished, JobOutcome::Cancelled).unwrap();
    let abandoned = store.create("abandoned");

    assert_eq!(store.expire(Instant::now()), 0);
    assert_eq!(store.expire(Instant::now() + Duration::from_secs(61)), 2);
    assert_eq!(store.get(finished), None);
    assert_eq!(store.get(abandoned), None);
}
