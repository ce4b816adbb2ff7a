mod common;
use anyhow::Result;
use common::*;
use rowsync::{ClientConfig, Diagnostic, TransportError};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

#[tokio::test]
async fn test_disposal_inertness() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    let tasks = client(&remote).subscribe_table("tasks");
    tasks.wait_loaded().await;

    let watcher = TestWatcher::changeset();
    let _guard = tasks.subscribe(&watcher);

    tasks.dispose();
    tasks.dispose();
    assert!(tasks.is_disposed());
    assert_eq!(remote.open_channels(), 0);
    let before = tasks.value();

    remote.insert("tasks", task(2, 200, "active"));
    remote.publish_raw("tasks", WireEvent::update(task(1, 100, "closed").to_value()));
    remote.delete("tasks", 1);

    assert_eq!(watcher.quiesce().await, 0);
    assert_eq!(tasks.value(), before);
    Ok(())
}

#[tokio::test]
async fn test_dispose_before_snapshot() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    let gate = remote.hold_reads();

    let tasks = client(&remote).subscribe_table("tasks");
    let watcher = TestWatcher::changeset();
    let _guard = tasks.subscribe(&watcher);
    assert!(eventually(|| remote.held_reads() == 1).await);

    tasks.dispose();
    // waiting on a disposed cache does not hang
    tasks.wait_loaded().await;
    gate.release();

    assert_eq!(watcher.quiesce().await, 0);
    assert!(tasks.value().is_empty());
    assert!(!tasks.loading());
    Ok(())
}

#[tokio::test]
async fn test_drop_closes_channel() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.create_collection("tasks");
    {
        let tasks = client(&remote).subscribe_table("tasks");
        let handle = tasks.clone();
        tasks.wait_loaded().await;
        drop(tasks);
        assert_eq!(remote.open_channels(), 1);
        drop(handle);
    }
    assert_eq!(remote.open_channels(), 0);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_failure_clears_loading() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    remote.fail_reads(1);

    let tasks = client(&remote).subscribe_table("tasks");
    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let _diag = tasks.diagnostics({
        let diagnostics = diagnostics.clone();
        move |d: Diagnostic| diagnostics.lock().unwrap().push(d)
    });

    tasks.wait_loaded().await;
    assert!(!tasks.loading());
    assert!(tasks.value().is_empty());
    assert!(matches!(tasks.last_error(), Some(TransportError::Unavailable(_))));
    assert!(eventually(|| diagnostics.lock().unwrap().iter().any(|d| matches!(d, Diagnostic::SnapshotFailed(_)))).await);

    // live updates still flow after a failed snapshot
    remote.insert("tasks", task(2, 200, "active"));
    assert!(wait_until(&tasks, |rows: &Vec<Row>| ids(rows) == vec![RowId::from(2)]).await);
    Ok(())
}

#[tokio::test]
async fn test_missing_collection() -> Result<()> {
    let remote = MemoryDataSource::new();
    let tasks = client(&remote).subscribe_table("nope");
    tasks.wait_loaded().await;
    assert!(matches!(tasks.last_error(), Some(TransportError::CollectionNotFound(_))));
    assert!(tasks.value().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_snapshot_timeout() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    let _gate = remote.hold_reads();

    let config = ClientConfig::builder().snapshot_timeout(Duration::from_millis(50)).build();
    let client = Client::with_config(Arc::new(remote.clone()), config);
    let tasks = client.subscribe_table("tasks");

    tokio::time::timeout(Duration::from_secs(5), tasks.wait_loaded()).await?;
    assert!(matches!(tasks.last_error(), Some(TransportError::Timeout)));
    assert!(tasks.value().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_refused_channel_still_loads_snapshot() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    remote.refuse_channels(true);
    let gate = remote.hold_reads();

    let tasks = client(&remote).subscribe_table("tasks");
    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let _diag = tasks.diagnostics({
        let diagnostics = diagnostics.clone();
        move |d: Diagnostic| diagnostics.lock().unwrap().push(d)
    });
    gate.release();

    tasks.wait_loaded().await;
    assert_eq!(ids(&tasks.value()), vec![RowId::from(1)]);
    assert_eq!(remote.open_channels(), 0);
    assert!(eventually(|| diagnostics.lock().unwrap().iter().any(|d| matches!(d, Diagnostic::ChannelFailed(_)))).await);
    Ok(())
}

#[tokio::test]
async fn test_remote_channel_close() -> Result<()> {
    let remote = MemoryDataSource::new();
    remote.insert("tasks", task(1, 100, "active"));
    let tasks = client(&remote).subscribe_table("tasks");
    tasks.wait_loaded().await;

    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let _diag = tasks.diagnostics({
        let diagnostics = diagnostics.clone();
        move |d: Diagnostic| diagnostics.lock().unwrap().push(d)
    });

    remote.close_all_channels();
    assert!(eventually(|| diagnostics.lock().unwrap().iter().any(|d| matches!(d, Diagnostic::ChannelClosed))).await);

    // nothing reconnects; the last value stays
    remote.insert("tasks", task(2, 200, "active"));
    settle().await;
    assert_eq!(ids(&tasks.value()), vec![RowId::from(1)]);
    Ok(())
}
