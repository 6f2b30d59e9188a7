mod common;

use assert_matches::assert_matches;
use stockroom::ServiceError;
use uuid::Uuid;

#[tokio::test]
async fn create_and_fetch_warehouse() {
    let engine = common::setup().await;

    let created = engine
        .warehouses
        .create_warehouse(engine.tenant_id, "Main DC", None)
        .await
        .unwrap();
    assert!(created.is_active);

    let fetched = engine
        .warehouses
        .get_warehouse(engine.tenant_id, created.id)
        .await
        .unwrap();
    assert_eq!(fetched.name, "Main DC");
}

#[tokio::test]
async fn empty_name_is_rejected() {
    let engine = common::setup().await;

    let err = engine
        .warehouses
        .create_warehouse(engine.tenant_id, "   ", None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn warehouses_are_tenant_scoped() {
    let engine = common::setup().await;

    let created = engine
        .warehouses
        .create_warehouse(engine.tenant_id, "Main DC", None)
        .await
        .unwrap();

    let err = engine
        .warehouses
        .get_warehouse(Uuid::new_v4(), created.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn listing_hides_deactivated_warehouses_by_default() {
    let engine = common::setup().await;

    let keep = engine
        .warehouses
        .create_warehouse(engine.tenant_id, "Keep", None)
        .await
        .unwrap();
    let retire = engine
        .warehouses
        .create_warehouse(engine.tenant_id, "Retire", None)
        .await
        .unwrap();

    engine
        .warehouses
        .deactivate_warehouse(engine.tenant_id, retire.id)
        .await
        .unwrap();

    let active = engine
        .warehouses
        .list_warehouses(engine.tenant_id, false)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, keep.id);

    let all = engine
        .warehouses
        .list_warehouses(engine.tenant_id, true)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}
