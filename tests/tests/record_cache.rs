mod common;
use anyhow::Result;
use common::*;
use rowsync::{accessors, RecordState};
use serde_json::json;

fn leases() -> MemoryDataSource {
    let remote = MemoryDataSource::new();
    remote.insert("leases", lease("L1", "alice"));
    remote.insert("leases", lease("L2", "bob"));
    remote
}

#[tokio::test]
async fn test_record_identity_switch() -> Result<()> {
    let remote = leases();
    let record = accessors::record(&client(&remote), "leases", "L1");
    assert_eq!(record.state(), RecordState::Loading(RowId::from("L1")));
    record.wait_loaded().await;
    assert_eq!(record.state(), RecordState::Bound(RowId::from("L1")));
    assert_eq!(record.value(), Some(lease("L1", "alice")));
    assert_eq!(remote.open_channels(), 1);

    let gate = remote.hold_reads();
    record.set_id(Some(RowId::from("L2")));
    assert_eq!(remote.open_channels(), 1);
    assert_eq!(record.state(), RecordState::Loading(RowId::from("L2")));

    // stale deliveries for L1 after the switch
    remote.update("leases", lease("L1", "carol"));
    remote.publish_raw("leases", WireEvent::update(lease("L1", "dave").to_value()));
    settle().await;

    gate.release();
    record.wait_loaded().await;
    assert_eq!(remote.open_channels(), 1);
    assert_eq!(record.state(), RecordState::Bound(RowId::from("L2")));
    assert!(wait_until(&record, |row: &Option<Row>| *row == Some(lease("L2", "bob"))).await);

    remote.update("leases", lease("L2", "erin"));
    assert!(wait_until(&record, |row: &Option<Row>| *row == Some(lease("L2", "erin"))).await);
    Ok(())
}

#[tokio::test]
async fn test_same_id_is_noop() -> Result<()> {
    let remote = leases();
    let record = client(&remote).subscribe_record("leases", Some(RowId::from("L1")));
    record.wait_loaded().await;
    let subscription = record.id();

    record.set_id(Some(RowId::from("L1")));
    assert_eq!(record.id(), subscription);
    assert_eq!(record.state(), RecordState::Bound(RowId::from("L1")));
    Ok(())
}

#[tokio::test]
async fn test_unbound_record() -> Result<()> {
    let remote = leases();
    let record = client(&remote).subscribe_record("leases", None);
    assert_eq!(record.state(), RecordState::Unbound);
    assert!(!record.loading());
    record.wait_loaded().await;
    assert_eq!(record.value(), None);
    assert_eq!(remote.open_channels(), 0);

    record.set_id(Some(RowId::from("L2")));
    record.wait_loaded().await;
    assert_eq!(record.value(), Some(lease("L2", "bob")));

    let watcher = TestWatcher::changeset();
    let _guard = record.subscribe(&watcher);
    record.set_id(None);
    assert_eq!(record.state(), RecordState::Unbound);
    assert_eq!(remote.open_channels(), 0);
    assert_eq!(record.value(), None);
    assert_eq!(watcher.take_one().await?, vec![(RowId::from("L2"), ChangeKind::Remove)]);
    Ok(())
}

#[tokio::test]
async fn test_missing_record_and_later_create() -> Result<()> {
    let remote = leases();
    let record = accessors::record(&client(&remote), "leases", "L9");
    record.wait_loaded().await;
    assert_eq!(record.state(), RecordState::Bound(RowId::from("L9")));
    assert_eq!(record.value(), None);

    remote.insert("leases", lease("L9", "frank"));
    assert!(wait_until(&record, |row: &Option<Row>| row.as_ref().and_then(|r| r.get("holder")) == Some(&json!("frank"))).await);

    remote.delete("leases", "L9");
    assert!(wait_until(&record, |row: &Option<Row>| row.is_none()).await);
    Ok(())
}

#[tokio::test]
async fn test_cleared_id_removes_row_of_pending_switch() -> Result<()> {
    let remote = leases();
    let record = accessors::record(&client(&remote), "leases", "L1");
    record.wait_loaded().await;
    let watcher = TestWatcher::changeset();
    let _guard = record.subscribe(&watcher);

    // L2 never settles before the id is cleared
    let gate = remote.hold_reads();
    record.set_id(Some(RowId::from("L2")));
    assert!(eventually(|| remote.held_reads() == 1).await);
    record.set_id(None);
    gate.release();

    assert_eq!(watcher.take_one().await?, vec![(RowId::from("L1"), ChangeKind::Remove)]);
    assert_eq!(watcher.quiesce().await, 0);
    assert_eq!(record.state(), RecordState::Unbound);
    assert_eq!(record.value(), None);
    Ok(())
}

#[tokio::test]
async fn test_dispose_while_loading_is_never_bound() -> Result<()> {
    let remote = leases();
    let gate = remote.hold_reads();
    let record = accessors::record(&client(&remote), "leases", "L1");
    assert!(eventually(|| remote.held_reads() == 1).await);

    record.dispose();
    gate.release();
    settle().await;
    assert!(!record.loading());
    assert_eq!(record.state(), RecordState::Loading(RowId::from("L1")));
    assert_eq!(record.value(), None);
    Ok(())
}
