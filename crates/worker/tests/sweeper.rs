//! Retention sweep tests.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use wardrobe_worker::sweeper::RetentionSweeper;

use common::{trigger_at, MemoryStore};

fn sweeper(store: &Arc<MemoryStore>) -> RetentionSweeper {
    RetentionSweeper::new(
        store.clone(),
        chrono::Duration::days(7),
        500,
        Duration::from_secs(86_400),
    )
}

#[tokio::test]
async fn deletes_at_most_one_batch_oldest_first() {
    let store = MemoryStore::new();
    let now = Utc::now();
    for id in 1..=520 {
        let created_at = now - chrono::Duration::days(30) + chrono::Duration::minutes(id);
        let mut t = trigger_at(id, "bob", "dm_message", created_at);
        t.sent = id % 2 == 0;
        store.insert_trigger(t);
    }
    store.insert_trigger(trigger_at(1000, "bob", "dm_message", now - chrono::Duration::days(1)));

    let deleted = sweeper(&store).sweep_once(now).await;

    assert_eq!(deleted, 500);
    let remaining: Vec<i64> = store.triggers.lock().unwrap().keys().copied().collect();
    let mut expected: Vec<i64> = (501..=520).collect();
    expected.push(1000);
    assert_eq!(remaining, expected);
}

#[tokio::test]
async fn nothing_to_delete_is_a_noop() {
    let store = MemoryStore::new();
    let now = Utc::now();
    store.insert_trigger(trigger_at(1, "bob", "dm_message", now - chrono::Duration::days(6)));

    assert_eq!(sweeper(&store).sweep_once(now).await, 0);
    assert!(store.trigger(1).is_some());
}

#[tokio::test]
async fn store_errors_are_swallowed() {
    let store = MemoryStore::new();
    store.fail_triggers.store(true, Ordering::SeqCst);

    assert_eq!(sweeper(&store).sweep_once(Utc::now()).await, 0);
}

#[tokio::test]
async fn run_sweeps_at_startup_and_stops_on_cancel() {
    let store = MemoryStore::new();
    let now = Utc::now();
    store.insert_trigger(trigger_at(1, "bob", "dm_message", now - chrono::Duration::days(10)));

    let sweeper = Arc::new(sweeper(&store));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let sweeper = Arc::clone(&sweeper);
        let cancel = cancel.clone();
        async move { sweeper.run(cancel).await }
    });

    for _ in 0..100 {
        if store.trigger(1).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();
    handle.await.unwrap();

    assert!(store.trigger(1).is_none());
}
