mod common;

use assert_matches::assert_matches;
use stockroom::commands::inventory::TransferStockCommand;
use stockroom::ServiceError;
use uuid::Uuid;

fn transfer_command(
    engine: &common::TestEngine,
    variant_id: Uuid,
    source: Uuid,
    destination: Uuid,
    qty: i32,
) -> TransferStockCommand {
    TransferStockCommand {
        tenant_id: engine.tenant_id,
        variant_id,
        source_warehouse_id: source,
        destination_warehouse_id: destination,
        qty,
        note: None,
    }
}

#[tokio::test]
async fn transfer_moves_on_hand_between_warehouses() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    let wh_b = common::create_warehouse(&engine, "B").await;
    common::seed_stock(&engine, wh_a, variant_id, 10, 0).await;
    common::seed_stock(&engine, wh_b, variant_id, 2, 0).await;

    let result = engine
        .stock
        .transfer(transfer_command(&engine, variant_id, wh_a, wh_b, 4))
        .await
        .expect("transfer should succeed");

    assert_eq!(result.source_on_hand, 6);
    assert_eq!(result.destination_on_hand, 6);
    assert_eq!(common::get_stock(&engine, wh_a, variant_id).await.qty_on_hand, 6);
    assert_eq!(common::get_stock(&engine, wh_b, variant_id).await.qty_on_hand, 6);

    // Conservation: the transfer's net effect across both warehouses is zero.
    assert_eq!(engine.stock.available(engine.tenant_id, variant_id).await.unwrap(), 12);

    let rows = common::ledger_rows(&engine, variant_id).await;
    assert_eq!(rows.len(), 2);
    let out = rows.iter().find(|r| r.reason == "transfer_out").unwrap();
    let inn = rows.iter().find(|r| r.reason == "transfer_in").unwrap();
    assert_eq!(out.qty_delta, -4);
    assert_eq!(out.warehouse_id, Some(wh_a));
    assert_eq!(inn.qty_delta, 4);
    assert_eq!(inn.warehouse_id, Some(wh_b));
    // Both rows trace back to the same transfer command.
    assert_eq!(out.transfer_id, Some(result.transfer_id));
    assert_eq!(inn.transfer_id, Some(result.transfer_id));
}

#[tokio::test]
async fn transfer_counts_reserved_stock_as_unavailable() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    let wh_b = common::create_warehouse(&engine, "B").await;
    common::seed_stock(&engine, wh_a, variant_id, 10, 8).await;

    let err = engine
        .stock
        .transfer(transfer_command(&engine, variant_id, wh_a, wh_b, 4))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let item = common::get_stock(&engine, wh_a, variant_id).await;
    assert_eq!(item.qty_on_hand, 10);
    assert!(common::ledger_rows(&engine, variant_id).await.is_empty());
}

#[tokio::test]
async fn transfer_into_untouched_destination_creates_its_row() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    let wh_b = common::create_warehouse(&engine, "B").await;
    common::seed_stock(&engine, wh_a, variant_id, 7, 0).await;

    engine
        .stock
        .transfer(transfer_command(&engine, variant_id, wh_a, wh_b, 7))
        .await
        .unwrap();

    let destination = common::get_stock(&engine, wh_b, variant_id).await;
    assert_eq!(destination.qty_on_hand, 7);
    assert_eq!(destination.qty_reserved, 0);
}

#[tokio::test]
async fn transfer_never_moves_reserved_quantity() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    let wh_b = common::create_warehouse(&engine, "B").await;
    common::seed_stock(&engine, wh_a, variant_id, 10, 3).await;

    engine
        .stock
        .transfer(transfer_command(&engine, variant_id, wh_a, wh_b, 5))
        .await
        .unwrap();

    let source = common::get_stock(&engine, wh_a, variant_id).await;
    let destination = common::get_stock(&engine, wh_b, variant_id).await;
    assert_eq!(source.qty_reserved, 3);
    assert_eq!(destination.qty_reserved, 0);
}

#[tokio::test]
async fn transfer_to_same_warehouse_is_rejected() {
    let engine = common::setup().await;
    let wh_a = common::create_warehouse(&engine, "A").await;

    let err = engine
        .stock
        .transfer(transfer_command(&engine, Uuid::new_v4(), wh_a, wh_a, 4))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn non_positive_transfer_quantity_is_rejected() {
    let engine = common::setup().await;
    let wh_a = common::create_warehouse(&engine, "A").await;
    let wh_b = common::create_warehouse(&engine, "B").await;

    let err = engine
        .stock
        .transfer(transfer_command(&engine, Uuid::new_v4(), wh_a, wh_b, 0))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidQuantity(_));
}

#[tokio::test]
async fn transfer_requires_known_warehouses() {
    let engine = common::setup().await;
    let wh_a = common::create_warehouse(&engine, "A").await;

    let err = engine
        .stock
        .transfer(transfer_command(&engine, Uuid::new_v4(), wh_a, Uuid::new_v4(), 4))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
