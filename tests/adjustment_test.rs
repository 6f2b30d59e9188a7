mod common;

use assert_matches::assert_matches;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use stockroom::commands::inventory::AdjustStockCommand;
use stockroom::entities::stock_adjustment::{self, AdjustmentKind, Entity as StockAdjustment};
use stockroom::ServiceError;
use uuid::Uuid;

fn adjust_command(
    engine: &common::TestEngine,
    warehouse_id: Uuid,
    variant_id: Uuid,
    qty_delta: i32,
) -> AdjustStockCommand {
    AdjustStockCommand {
        tenant_id: engine.tenant_id,
        warehouse_id,
        variant_id,
        qty_delta,
        kind: AdjustmentKind::CycleCount,
        reason: "cycle count".to_string(),
    }
}

async fn audit_rows(engine: &common::TestEngine, variant_id: Uuid) -> u64 {
    StockAdjustment::find()
        .filter(stock_adjustment::Column::TenantId.eq(engine.tenant_id))
        .filter(stock_adjustment::Column::VariantId.eq(variant_id))
        .count(engine.db.as_ref())
        .await
        .expect("Failed to count adjustments")
}

#[tokio::test]
async fn positive_adjustment_creates_item_lazily() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;

    let result = engine
        .stock
        .adjust(adjust_command(&engine, wh_a, variant_id, 25))
        .await
        .expect("adjust should succeed");

    assert_eq!(result.applied_delta, 25);
    assert_eq!(result.new_on_hand, 25);
    assert_eq!(result.new_available, 25);

    let item = common::get_stock(&engine, wh_a, variant_id).await;
    assert_eq!(item.qty_on_hand, 25);
    assert_eq!(item.qty_reserved, 0);

    let rows = common::ledger_rows(&engine, variant_id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reason, "adjustment");
    assert_eq!(rows[0].qty_delta, 25);
    assert_eq!(rows[0].snapshot_available, 25);
    assert_eq!(audit_rows(&engine, variant_id).await, 1);
}

#[tokio::test]
async fn negative_adjustment_clamps_on_hand_at_zero() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    common::seed_stock(&engine, wh_a, variant_id, 5, 0).await;

    let result = engine
        .stock
        .adjust(adjust_command(&engine, wh_a, variant_id, -8))
        .await
        .expect("clamped adjust should succeed");

    // Only the applied part of the requested delta reaches the ledger.
    assert_eq!(result.applied_delta, -5);
    assert_eq!(result.new_on_hand, 0);

    let rows = common::ledger_rows(&engine, variant_id).await;
    assert_eq!(rows[0].qty_delta, -5);
}

#[tokio::test]
async fn negative_adjustment_breaking_reservations_is_rejected() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    common::seed_stock(&engine, wh_a, variant_id, 10, 6).await;

    let err = engine
        .stock
        .adjust(adjust_command(&engine, wh_a, variant_id, -7))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvariantViolation(_));

    // The whole transaction rolled back, audit row included.
    let item = common::get_stock(&engine, wh_a, variant_id).await;
    assert_eq!(item.qty_on_hand, 10);
    assert_eq!(item.qty_reserved, 6);
    assert!(common::ledger_rows(&engine, variant_id).await.is_empty());
    assert_eq!(audit_rows(&engine, variant_id).await, 0);
}

#[tokio::test]
async fn positive_adjustment_narrows_backorder_deficit() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    common::seed_stock(&engine, wh_a, variant_id, 3, 8).await;

    let result = engine
        .stock
        .adjust(adjust_command(&engine, wh_a, variant_id, 2))
        .await
        .expect("receiving against a backorder must pass");

    assert_eq!(result.new_on_hand, 5);
    assert_eq!(result.new_available, -3);
}

#[tokio::test]
async fn zero_delta_is_rejected() {
    let engine = common::setup().await;
    let wh_a = common::create_warehouse(&engine, "A").await;

    let err = engine
        .stock
        .adjust(adjust_command(&engine, wh_a, Uuid::new_v4(), 0))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidQuantity(_));
}

#[tokio::test]
async fn unknown_warehouse_is_rejected() {
    let engine = common::setup().await;

    let err = engine
        .stock
        .adjust(adjust_command(&engine, Uuid::new_v4(), Uuid::new_v4(), 5))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn receipt_kind_writes_receive_ledger_row() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;

    let mut command = adjust_command(&engine, wh_a, variant_id, 40);
    command.kind = AdjustmentKind::Receipt;
    command.reason = "PO-1042 receipt".to_string();
    engine.stock.adjust(command).await.unwrap();

    let rows = common::ledger_rows(&engine, variant_id).await;
    assert_eq!(rows[0].reason, "receive");
    assert_eq!(rows[0].note.as_deref(), Some("PO-1042 receipt"));
}

#[tokio::test]
async fn negative_receipt_is_rejected() {
    let engine = common::setup().await;
    let wh_a = common::create_warehouse(&engine, "A").await;

    let mut command = adjust_command(&engine, wh_a, Uuid::new_v4(), -4);
    command.kind = AdjustmentKind::Receipt;

    let err = engine.stock.adjust(command).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidQuantity(_));
}
