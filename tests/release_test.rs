mod common;

use stockroom::commands::inventory::{ReleaseStockCommand, ReserveStockCommand};
use stockroom::entities::stock_reservation::ReservationStatus;
use uuid::Uuid;

async fn reserve(
    engine: &common::TestEngine,
    variant_id: Uuid,
    quantity: i32,
) -> Uuid {
    let order_line_id = Uuid::new_v4();
    engine
        .stock
        .reserve(ReserveStockCommand {
            tenant_id: engine.tenant_id,
            order_line_id,
            variant_id,
            quantity,
            preferred_warehouse_id: None,
            allow_backorder: false,
        })
        .await
        .expect("reserve should succeed");
    order_line_id
}

#[tokio::test]
async fn release_returns_reserved_stock() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    common::seed_stock(&engine, wh_a, variant_id, 10, 0).await;

    let order_line_id = reserve(&engine, variant_id, 4).await;
    assert_eq!(common::get_stock(&engine, wh_a, variant_id).await.qty_reserved, 4);

    let result = engine
        .stock
        .release(ReleaseStockCommand {
            tenant_id: engine.tenant_id,
            order_line_id,
        })
        .await
        .expect("release should succeed");

    assert_eq!(result.released_count, 1);
    assert_eq!(result.released_quantity, 4);

    let item = common::get_stock(&engine, wh_a, variant_id).await;
    assert_eq!(item.qty_reserved, 0);
    // Releases never move physical stock.
    assert_eq!(item.qty_on_hand, 10);

    let reservations = engine
        .stock
        .reservations_for_order_line(engine.tenant_id, order_line_id)
        .await
        .unwrap();
    assert_eq!(
        ReservationStatus::from_str(&reservations[0].status),
        Some(ReservationStatus::Released)
    );

    let rows = common::ledger_rows(&engine, variant_id).await;
    let release_rows: Vec<_> = rows.iter().filter(|r| r.reason == "release").collect();
    assert_eq!(release_rows.len(), 1);
    assert_eq!(release_rows[0].qty_delta, 0);
    assert_eq!(release_rows[0].order_line_id, Some(order_line_id));
}

#[tokio::test]
async fn release_is_idempotent() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    common::seed_stock(&engine, wh_a, variant_id, 10, 0).await;

    let order_line_id = reserve(&engine, variant_id, 4).await;

    let command = ReleaseStockCommand {
        tenant_id: engine.tenant_id,
        order_line_id,
    };
    let first = engine.stock.release(command.clone()).await.unwrap();
    assert_eq!(first.released_quantity, 4);

    let second = engine.stock.release(command).await.unwrap();
    assert_eq!(second.released_count, 0);
    assert_eq!(second.released_quantity, 0);

    let item = common::get_stock(&engine, wh_a, variant_id).await;
    assert_eq!(item.qty_reserved, 0);
    assert_eq!(item.qty_on_hand, 10);

    // Exactly one release row despite the second call.
    let rows = common::ledger_rows(&engine, variant_id).await;
    assert_eq!(rows.iter().filter(|r| r.reason == "release").count(), 1);
}

#[tokio::test]
async fn release_of_unknown_order_line_is_a_noop() {
    let engine = common::setup().await;

    let result = engine
        .stock
        .release(ReleaseStockCommand {
            tenant_id: engine.tenant_id,
            order_line_id: Uuid::new_v4(),
        })
        .await
        .expect("releasing an unknown line must not error");

    assert_eq!(result.released_count, 0);
}

#[tokio::test]
async fn release_covers_every_warehouse_of_a_split_line() {
    let engine = common::setup().await;
    let variant_id = Uuid::new_v4();
    let wh_a = common::create_warehouse(&engine, "A").await;
    let wh_b = common::create_warehouse(&engine, "B").await;
    common::seed_stock(&engine, wh_a, variant_id, 10, 0).await;
    common::seed_stock(&engine, wh_b, variant_id, 5, 0).await;

    let order_line_id = reserve(&engine, variant_id, 12).await;

    let result = engine
        .stock
        .release(ReleaseStockCommand {
            tenant_id: engine.tenant_id,
            order_line_id,
        })
        .await
        .unwrap();

    assert_eq!(result.released_count, 2);
    assert_eq!(result.released_quantity, 12);
    assert_eq!(common::get_stock(&engine, wh_a, variant_id).await.qty_reserved, 0);
    assert_eq!(common::get_stock(&engine, wh_b, variant_id).await.qty_reserved, 0);
}
