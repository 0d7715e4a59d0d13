mod common;

use std::io::Write;
use std::sync::{Arc, Mutex};

use common::{pull, tracked, FakeSource, PullReply};
use pr_pulse::notify::{notifications_for, MemorySink, Notification, Notifier};
use pr_pulse::poll::{PollSummary, Poller};
use pr_pulse::status::PrStatus;
use pr_pulse::store::{ChangeFeed, StatusStore};

const LM_OLD: &str = "Wed, 01 May 2024 10:00:00 GMT";
const LM_NEW: &str = "Thu, 02 May 2024 08:00:00 GMT";

fn drain(changes: &mut ChangeFeed) -> Vec<Notification> {
    let mut notifications = Vec::new();
    while let Ok(change) = changes.try_recv() {
        notifications.extend(notifications_for(&change));
    }
    notifications
}

/// Log output captured from a scoped tracing subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn setup() -> (Arc<FakeSource>, Arc<StatusStore>, Poller) {
    let source = Arc::new(FakeSource::default());
    let store = Arc::new(StatusStore::in_memory());
    let poller = Poller::new(source.clone(), store.clone()).with_max_concurrent(2);
    (source, store, poller)
}

#[tokio::test]
async fn test_pending_to_ok_to_merge_notifies_once() {
    let (source, store, poller) = setup();
    store.upsert(tracked(1, 10, 5, PrStatus::Pending, 2)).unwrap();
    let mut changes = store.subscribe();

    source.set_pull(
        "o/r",
        10,
        PullReply::Ok {
            pull: pull(1, 10, false, "clean", 2),
            last_modified: Some(LM_NEW.to_string()),
        },
    );

    let summary = poller.poll_once().await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.failed, 0);

    let notes = drain(&mut changes);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "Pull request 10");
    assert_eq!(notes[0].message, "OK to Merge");
    assert_eq!(notes[0].id.to_string(), "TabID:5:OK to Merge");

    let stored = store.get(1).unwrap().unwrap();
    assert_eq!(stored.status, PrStatus::OkToMerge);
    assert_eq!(stored.last_modified.as_deref(), Some(LM_NEW));

    // Not pending, so no commit status lookup
    assert!(source.commit_calls().is_empty());
}

#[tokio::test]
async fn test_blocked_with_passing_checks_becomes_review_required() {
    let (source, store, poller) = setup();
    store.upsert(tracked(1, 10, 5, PrStatus::Pending, 0)).unwrap();
    source.set_pull(
        "o/r",
        10,
        PullReply::Ok {
            pull: pull(1, 10, false, "blocked", 0),
            last_modified: None,
        },
    );
    source.set_commit_state("sha-10", "success");
    let mut changes = store.subscribe();

    poller.poll_once().await.unwrap();

    let stored = store.get(1).unwrap().unwrap();
    assert_eq!(stored.status, PrStatus::ReviewRequired);
    assert_eq!(stored.img, "assets/images/review-required.png");
    assert_eq!(source.commit_calls(), vec!["sha-10".to_string()]);

    let notes = drain(&mut changes);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message, "Review Required");
}

#[tokio::test]
async fn test_pending_refined_with_failing_checks() {
    let (source, store, poller) = setup();
    store.upsert(tracked(1, 10, 5, PrStatus::Unknown, 0)).unwrap();
    source.set_pull(
        "o/r",
        10,
        PullReply::Ok {
            pull: pull(1, 10, false, "blocked", 0),
            last_modified: None,
        },
    );
    source.set_commit_state("sha-10", "failure");

    poller.poll_once().await.unwrap();

    let stored = store.get(1).unwrap().unwrap();
    assert_eq!(stored.status, PrStatus::Failure);
    assert_eq!(stored.status.label(), "Failure");
}

#[tokio::test]
async fn test_commit_status_failure_leaves_record_untouched() {
    let (source, store, poller) = setup();
    store.upsert(tracked(1, 10, 5, PrStatus::Unknown, 0)).unwrap();
    source.set_pull(
        "o/r",
        10,
        PullReply::Ok {
            pull: pull(1, 10, false, "blocked", 0),
            last_modified: None,
        },
    );
    // No commit state scripted: the lookup fails

    let summary = poller.poll_once().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(store.get(1).unwrap().unwrap().status, PrStatus::Unknown);
}

#[tokio::test]
async fn test_failing_record_does_not_block_others() {
    let (source, store, poller) = setup();
    store.upsert(tracked(1, 10, 5, PrStatus::Pending, 0)).unwrap();
    store.upsert(tracked(2, 20, 6, PrStatus::Pending, 0)).unwrap();
    store.upsert(tracked(3, 30, 7, PrStatus::Pending, 0)).unwrap();

    source.set_pull("o/r", 10, PullReply::Fail);
    source.set_pull(
        "o/r",
        20,
        PullReply::Ok {
            pull: pull(2, 20, true, "unknown", 0),
            last_modified: None,
        },
    );
    source.set_pull(
        "o/r",
        30,
        PullReply::Ok {
            pull: pull(3, 30, false, "clean", 0),
            last_modified: None,
        },
    );

    let summary = poller.poll_once().await.unwrap();
    assert_eq!(
        summary,
        PollSummary {
            checked: 3,
            updated: 2,
            not_modified: 0,
            vanished: 0,
            failed: 1,
        }
    );

    assert_eq!(store.get(1).unwrap().unwrap().status, PrStatus::Pending);
    assert_eq!(store.get(2).unwrap().unwrap().status, PrStatus::Merged);
    assert_eq!(store.get(3).unwrap().unwrap().status, PrStatus::OkToMerge);
}

#[tokio::test]
async fn test_not_modified_sends_validator_and_keeps_record() {
    let (source, store, poller) = setup();
    let mut record = tracked(1, 10, 5, PrStatus::Pending, 1);
    record.last_modified = Some(LM_OLD.to_string());
    store.upsert(record.clone()).unwrap();

    source.set_pull(
        "o/r",
        10,
        PullReply::NotModified {
            last_modified: Some(LM_OLD.to_string()),
        },
    );
    let mut changes = store.subscribe();

    let summary = poller.poll_once().await.unwrap();
    assert_eq!(summary.not_modified, 1);
    assert_eq!(
        source.pull_calls(),
        vec![("o/r".to_string(), 10, Some(LM_OLD.to_string()))]
    );

    // Same validator: no write at all
    assert!(changes.try_recv().is_err());
    assert_eq!(store.get(1).unwrap().unwrap(), record);
}

#[tokio::test]
async fn test_not_modified_refreshes_validator_silently() {
    let (source, store, poller) = setup();
    let mut record = tracked(1, 10, 5, PrStatus::Pending, 1);
    record.last_modified = Some(LM_OLD.to_string());
    store.upsert(record).unwrap();

    source.set_pull(
        "o/r",
        10,
        PullReply::NotModified {
            last_modified: Some(LM_NEW.to_string()),
        },
    );
    let mut changes = store.subscribe();

    poller.poll_once().await.unwrap();

    let stored = store.get(1).unwrap().unwrap();
    assert_eq!(stored.last_modified.as_deref(), Some(LM_NEW));
    assert_eq!(stored.status, PrStatus::Pending);
    assert!(drain(&mut changes).is_empty());
}

#[tokio::test]
async fn test_fresh_response_without_validator_keeps_stored_one() {
    let (source, store, poller) = setup();
    let mut record = tracked(1, 10, 5, PrStatus::Pending, 1);
    record.last_modified = Some(LM_OLD.to_string());
    store.upsert(record).unwrap();

    source.set_pull(
        "o/r",
        10,
        PullReply::Ok {
            pull: pull(1, 10, false, "clean", 1),
            last_modified: None,
        },
    );

    poller.poll_once().await.unwrap();

    let stored = store.get(1).unwrap().unwrap();
    assert_eq!(stored.status, PrStatus::OkToMerge);
    assert_eq!(stored.last_modified.as_deref(), Some(LM_OLD));
}

#[tokio::test]
async fn test_repeated_poll_is_idempotent() {
    let (source, store, poller) = setup();
    store.upsert(tracked(1, 10, 5, PrStatus::Pending, 0)).unwrap();
    source.set_pull(
        "o/r",
        10,
        PullReply::Ok {
            pull: pull(1, 10, false, "clean", 4),
            last_modified: Some(LM_NEW.to_string()),
        },
    );
    let mut changes = store.subscribe();

    poller.poll_once().await.unwrap();
    let first: Vec<String> = drain(&mut changes).into_iter().map(|n| n.message).collect();
    assert_eq!(first, vec!["OK to Merge".to_string(), "New comment".to_string()]);
    let after_first = store.get_all().unwrap();

    poller.poll_once().await.unwrap();
    assert!(drain(&mut changes).is_empty());
    assert_eq!(store.get_all().unwrap(), after_first);
}

#[tokio::test]
async fn test_record_deleted_mid_fetch_is_not_recreated() {
    let (source, store, poller) = setup();
    store.upsert(tracked(1, 10, 5, PrStatus::Pending, 0)).unwrap();
    source.set_pull(
        "o/r",
        10,
        PullReply::Ok {
            pull: pull(1, 10, false, "clean", 0),
            last_modified: None,
        },
    );
    source.delete_during_fetch(store.clone(), 1);
    let mut changes = store.subscribe();

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let summary = {
        let _guard = tracing::subscriber::set_default(subscriber);
        poller.poll_once().await.unwrap()
    };

    assert_eq!(summary.vanished, 1);
    assert_eq!(store.get(1).unwrap(), None);
    assert!(drain(&mut changes).is_empty());

    // The pass summary reports the dropped record
    let text = logs.text();
    assert!(text.contains("poll pass finished"), "{text}");
    assert!(text.contains("vanished=1"), "{text}");
}

#[tokio::test]
async fn test_poll_keeps_tab_binding() {
    let (source, store, poller) = setup();
    store.upsert(tracked(1, 10, 9, PrStatus::Pending, 0)).unwrap();
    source.set_pull(
        "o/r",
        10,
        PullReply::Ok {
            pull: pull(1, 10, false, "clean", 0),
            last_modified: None,
        },
    );

    poller.poll_once().await.unwrap();
    assert_eq!(store.get(1).unwrap().unwrap().tab_id, 9);
}

#[tokio::test]
async fn test_empty_store_polls_nothing() {
    let (source, _store, poller) = setup();
    let summary = poller.poll_once().await.unwrap();
    assert_eq!(summary, PollSummary::default());
    assert!(source.pull_calls().is_empty());
}

#[tokio::test]
async fn test_large_pass_delivers_every_notification() {
    const TRACKED: u64 = 300;

    let (source, store, poller) = setup();
    for n in 1..=TRACKED {
        store.upsert(tracked(n, n, n as i64, PrStatus::Pending, 0)).unwrap();
        source.set_pull(
            "o/r",
            n,
            PullReply::Ok {
                pull: pull(n, n, false, "clean", 0),
                last_modified: None,
            },
        );
    }

    let sink = Arc::new(MemorySink::default());
    let notifier = Notifier::new(sink.clone()).spawn(store.subscribe());

    let summary = poller.with_max_concurrent(16).poll_once().await.unwrap();
    notifier.shutdown().await.unwrap();

    assert_eq!(summary.updated, TRACKED as usize);
    let notes = sink.notifications();
    assert_eq!(notes.len(), TRACKED as usize);
    assert!(notes.iter().all(|n| n.message == "OK to Merge"));
}
