mod common;
use anyhow::Result;
use common::*;
use rowsync::accessors;

#[tokio::test]
async fn test_filter_reevaluation() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(5, 500, "active"));
    remote.insert("tasks", task(6, 600, "closed"));

    let active = client(&remote).subscribe_filtered("tasks", Predicate::new(|row| row.get("status").and_then(|s| s.as_str()) == Some("active")));
    active.wait_loaded().await;
    assert_eq!(ids(&active.value()), vec![RowId::from(5)]);

    let watcher = TestWatcher::changeset();
    let _guard = active.subscribe(&watcher);

    remote.update("tasks", task(5, 500, "closed"));
    assert_eq!(watcher.take_one().await?, vec![(RowId::from(5), ChangeKind::Remove)]);
    assert!(active.value().is_empty());

    remote.update("tasks", task(5, 500, "active"));
    assert_eq!(watcher.take_one().await?, vec![(RowId::from(5), ChangeKind::Add)]);
    assert_eq!(ids(&active.value()), vec![RowId::from(5)]);

    // non-matching rows never show up
    remote.insert("tasks", task(7, 700, "closed"));
    assert_eq!(watcher.quiesce().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_field_eq_narrows_snapshot_and_channel() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    remote.insert("tasks", task(2, 200, "closed"));
    remote.insert("tasks", task(3, 300, "active"));

    let active = accessors::rows_with_status(&client(&remote), "tasks", "active");
    active.wait_loaded().await;
    assert_eq!(ids(&active.value()), vec![RowId::from(3), RowId::from(1)]);

    // an event that slips past the channel filter is still checked locally
    remote.publish_raw("tasks", WireEvent::insert(task(4, 400, "closed").to_value()));
    remote.insert("tasks", task(8, 800, "active"));
    assert!(wait_until(&active, |rows: &Vec<Row>| rows.len() == 3).await);
    assert_eq!(ids(&active.value()), vec![RowId::from(8), RowId::from(3), RowId::from(1)]);
    Ok(())
}

#[tokio::test]
async fn test_owned_rows() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("notes", Row::new(serde_json::json!({"id": 1, "user_id": "u1"}))?);
    remote.insert("notes", Row::new(serde_json::json!({"id": 2, "user_id": "u2"}))?);

    let mine = accessors::owned_rows(&client(&remote), "notes", "u1");
    mine.wait_loaded().await;
    assert_eq!(ids(&mine.value()), vec![RowId::from(1)]);
    Ok(())
}

#[tokio::test]
async fn test_same_predicate_identity_is_noop() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    let predicate = Predicate::field_eq("status", "active");
    let active = client(&remote).subscribe_filtered("tasks", predicate.clone());
    active.wait_loaded().await;
    let subscription = active.id();

    active.set_predicate(predicate.clone());
    assert_eq!(active.id(), subscription);
    assert!(active.is_loaded());
    assert_eq!(remote.open_channels(), 1);
    Ok(())
}

#[tokio::test]
async fn test_new_predicate_rebuilds_subscription() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    remote.insert("tasks", task(2, 200, "closed"));

    let cache = client(&remote).subscribe_filtered("tasks", Predicate::field_eq("status", "active"));
    cache.wait_loaded().await;
    let first = cache.id();

    let watcher = TestWatcher::changeset();
    let _guard = cache.subscribe(&watcher);

    // same behavior, new identity: still rebuilt
    cache.set_predicate(Predicate::field_eq("status", "closed"));
    assert_ne!(cache.id(), first);
    assert_eq!(remote.open_channels(), 1);
    cache.wait_loaded().await;
    assert_eq!(ids(&cache.value()), vec![RowId::from(2)]);

    // rows of the old predicate are removed alongside the new initial rows
    let changes = watcher.take_one().await?;
    assert_eq!(changes, vec![(RowId::from(1), ChangeKind::Remove), (RowId::from(2), ChangeKind::Initial)]);

    // the old predicate no longer applies
    remote.update("tasks", task(1, 100, "active"));
    assert_eq!(watcher.quiesce().await, 0);
    assert_eq!(ids(&cache.value()), vec![RowId::from(2)]);
    Ok(())
}

#[tokio::test]
async fn test_removals_survive_back_to_back_predicate_changes() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    remote.insert("tasks", task(2, 200, "closed"));

    let cache = client(&remote).subscribe_filtered("tasks", Predicate::field_eq("status", "active"));
    let watcher = TestWatcher::changeset();
    let _guard = cache.subscribe(&watcher);
    cache.wait_loaded().await;

    // the middle predicate is replaced before its snapshot settles
    let gate = remote.hold_reads();
    cache.set_predicate(Predicate::field_eq("status", "closed"));
    assert!(eventually(|| remote.held_reads() == 1).await);
    cache.set_predicate(Predicate::field_eq("status", "closed"));
    gate.release();
    cache.wait_loaded().await;
    watcher.quiesce().await;

    // folding every change set must give back what the cache holds
    let mut mirror: Vec<RowId> = Vec::new();
    for changes in watcher.drain() {
        for (id, kind) in changes {
            mirror.retain(|held| *held != id);
            if kind != ChangeKind::Remove {
                mirror.push(id);
            }
        }
    }
    assert_eq!(mirror, ids(&cache.value()));
    assert_eq!(mirror, vec![RowId::from(2)]);
    Ok(())
}
