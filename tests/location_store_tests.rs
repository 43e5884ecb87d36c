use std::time::Duration;

use geofence::services::validate;
use geofence::{ChangeKind, StoreError, ValidatedLocation};
use pretty_assertions::assert_eq;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_create_hq_then_list() {
    let ctx = common::TestContext::new();

    let input = validate(&common::hq_draft()).unwrap();
    let created = ctx.store.create(input).await.unwrap();
    assert_eq!(created.created_at, created.updated_at);

    let locations = ctx.store.list_all().await.unwrap();
    let hq = locations.iter().find(|l| l.name == "HQ").unwrap();
    assert!((hq.latitude - -6.2).abs() < 1e-9);
    assert!((hq.longitude - 106.816666).abs() < 1e-9);
    assert_eq!(hq.radius, 100);
    assert_eq!(hq.description, None);
}

#[tokio::test]
async fn test_create_uses_backend_assigned_id() {
    let ctx = common::TestContext::new();

    let first = ctx.store.create(common::random_location()).await.unwrap();
    let second = ctx.store.create(common::random_location()).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(ctx.store.find_by_id(first.id).await, Ok(Some(first.clone())));
    assert_eq!(ctx.store.find_by_id(second.id).await, Ok(Some(second)));
}

#[tokio::test]
async fn test_list_all_sorted_by_name() {
    let ctx = common::TestContext::new();
    for name in ["Warehouse", "Annex", "Main Office"] {
        ctx.seed(name).await;
    }

    let names: Vec<String> = ctx
        .store
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.name)
        .collect();

    assert_eq!(names, vec!["Annex", "Main Office", "Warehouse"]);
}

#[tokio::test]
async fn test_list_all_unavailable() {
    let ctx = common::TestContext::new();
    ctx.backend().set_unavailable(true);

    assert!(matches!(
        ctx.store.list_all().await,
        Err(StoreError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_update_refreshes_updated_at_only() {
    let ctx = common::TestContext::new();
    let original = ctx.seed("Depot").await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let input = ValidatedLocation {
        name: "Depot North".to_string(),
        latitude: 1.5,
        longitude: 2.5,
        radius: 250,
        description: Some("Loading bay".to_string()),
    };
    let updated = ctx.store.update(original.id, input.clone()).await.unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(ValidatedLocation::from(&updated), input);
    assert_eq!(updated.created_at, original.created_at);
    assert!(updated.updated_at > original.updated_at);
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let ctx = common::TestContext::new();

    let result = ctx
        .store
        .update(Uuid::new_v4(), common::random_location())
        .await;

    assert_eq!(result, Err(StoreError::NotFound));
}

#[tokio::test]
async fn test_write_rejected_carries_backend_message() {
    let ctx = common::TestContext::new();
    ctx.backend().reject_writes(Some("permission denied for table geofence_locations"));

    let result = ctx.store.create(common::random_location()).await;

    assert_eq!(
        result,
        Err(StoreError::WriteRejected(
            "permission denied for table geofence_locations".to_string()
        ))
    );
}

#[tokio::test]
async fn test_delete_blocked_while_assigned() {
    let ctx = common::TestContext::new();
    let location = ctx.seed("Site A").await;
    for _ in 0..3 {
        ctx.backend().assign_employee(location.id);
    }

    assert_eq!(ctx.store.count_assignments_for(location.id).await, Ok(3));
    assert_eq!(ctx.store.delete(location.id).await, Err(StoreError::InUse(3)));

    let locations = ctx.store.list_all().await.unwrap();
    assert!(locations.iter().any(|l| l.id == location.id));
}

#[tokio::test]
async fn test_delete_after_assignments_cleared() {
    let ctx = common::TestContext::new();
    let location = ctx.seed("Site B").await;
    ctx.backend().assign_employee(location.id);
    ctx.backend().clear_assignments(location.id);

    ctx.store.delete(location.id).await.unwrap();

    assert_eq!(ctx.store.find_by_id(location.id).await, Ok(None));
    assert_eq!(ctx.store.delete(location.id).await, Err(StoreError::NotFound));
}

#[tokio::test]
async fn test_subscription_sees_own_writes() {
    let ctx = common::TestContext::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscription = ctx.store.subscribe_to_changes(move |event| {
        let _ = tx.send(event);
    });

    let location = ctx.seed("Gate").await;
    ctx.store
        .update(location.id, common::random_location())
        .await
        .unwrap();
    ctx.store.delete(location.id).await.unwrap();

    let mut kinds = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.location_id, Some(location.id));
        kinds.push(event.kind);
    }
    assert_eq!(
        kinds,
        vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
    );

    subscription.unsubscribe();
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let ctx = common::TestContext::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscription = ctx.store.subscribe_to_changes(move |event| {
        let _ = tx.send(event);
    });
    assert!(subscription.is_active());

    subscription.unsubscribe();
    ctx.seed("Late").await;

    assert_eq!(rx.recv().await, None);
}
