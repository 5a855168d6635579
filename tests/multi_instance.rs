mod common;

use common::{FakeRemote, engine_at, temp_database};
use offline_sync::domain::entities::offline::OfflineFileDraft;
use offline_sync::domain::value_objects::ProjectId;
use offline_sync::{
    ConnectionPool, CrossTabLock, DrainOutcome, EnqueueOutcome, SqliteLeaseLock,
};
use std::time::Duration;

fn draft() -> OfflineFileDraft {
    OfflineFileDraft::new(
        ProjectId::new("P1".to_string()).expect("project id"),
        "invoice.pdf",
        "application/pdf",
        vec![1u8; 2048],
    )
}

#[tokio::test]
async fn instances_share_duplicate_detection() {
    let (_dir, url) = temp_database();
    let a = engine_at(&url, FakeRemote::new()).await;
    let b = engine_at(&url, FakeRemote::new()).await;

    let first = a.queues.files.enqueue(draft()).await.expect("enqueue a");
    let second = b.queues.files.enqueue(draft()).await.expect("enqueue b");

    let EnqueueOutcome::Queued(id) = first else {
        panic!("first enqueue should queue");
    };
    assert_eq!(second, EnqueueOutcome::Duplicate(id));
    assert_eq!(b.queues.files.all().await.expect("all").len(), 1);

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn lease_held_by_another_instance_skips_the_drain() {
    let (_dir, url) = temp_database();
    let remote = FakeRemote::new();
    let engine = engine_at(&url, remote.clone()).await;
    engine.queues.files.enqueue(draft()).await.expect("enqueue");

    let other_pool = ConnectionPool::new(&url, 1).await.expect("other pool");
    let other = SqliteLeaseLock::new(other_pool.clone(), Duration::from_secs(60));
    let lease = other
        .try_acquire(&engine.config.sync.lock_name)
        .await
        .expect("acquire")
        .expect("lease granted");

    assert_eq!(engine.sync_now().await, DrainOutcome::LockHeldElsewhere);
    assert!(remote.calls().is_empty());

    other.release(lease).await.expect("release");
    let outcome = engine.sync_now().await;
    assert_eq!(outcome.report().expect("completed").synced_count(), 1);

    other_pool.close().await;
    engine.shutdown().await;
}
