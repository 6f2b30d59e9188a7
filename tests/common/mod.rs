#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use stockroom::{
    db::{self, DbConfig},
    entities::{
        stock_item::{self, Entity as StockItem},
        stock_ledger::{self, Entity as StockLedger},
    },
    events,
    services::{ledger::LedgerQueryService, stock::StockService, warehouses::WarehouseService},
};
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database with migrations
/// applied and a drained event channel.
pub struct TestEngine {
    pub db: Arc<db::DbPool>,
    pub stock: StockService,
    pub ledger: LedgerQueryService,
    pub warehouses: WarehouseService,
    pub tenant_id: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

pub async fn setup() -> TestEngine {
    // A single pooled connection keeps the private in-memory database alive
    // for the whole test.
    let db_cfg = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };

    let pool = db::establish_connection_with_config(&db_cfg)
        .await
        .expect("Failed to create DB pool");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let db = Arc::new(pool);
    let (sender, rx) = events::event_channel(100);
    let event_task = tokio::spawn(events::process_events(rx));
    let sender = Arc::new(sender);

    TestEngine {
        stock: StockService::new(db.clone(), sender.clone()),
        ledger: LedgerQueryService::new(db.clone()),
        warehouses: WarehouseService::new(db.clone(), sender),
        db,
        tenant_id: Uuid::new_v4(),
        _event_task: event_task,
    }
}

pub async fn create_warehouse(engine: &TestEngine, name: &str) -> Uuid {
    engine
        .warehouses
        .create_warehouse(engine.tenant_id, name, None)
        .await
        .expect("Failed to create warehouse")
        .id
}

/// Inserts a stock item row directly, bypassing the engines, to set up exact
/// starting quantities for a scenario.
pub async fn seed_stock(
    engine: &TestEngine,
    warehouse_id: Uuid,
    variant_id: Uuid,
    on_hand: i32,
    reserved: i32,
) {
    let item = stock_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(engine.tenant_id),
        warehouse_id: Set(warehouse_id),
        variant_id: Set(variant_id),
        qty_on_hand: Set(on_hand),
        qty_reserved: Set(reserved),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    };
    item.insert(engine.db.as_ref())
        .await
        .expect("Failed to seed stock item");
}

pub async fn get_stock(
    engine: &TestEngine,
    warehouse_id: Uuid,
    variant_id: Uuid,
) -> stock_item::Model {
    StockItem::find()
        .filter(stock_item::Column::TenantId.eq(engine.tenant_id))
        .filter(stock_item::Column::WarehouseId.eq(warehouse_id))
        .filter(stock_item::Column::VariantId.eq(variant_id))
        .one(engine.db.as_ref())
        .await
        .expect("Failed to query stock item")
        .expect("Stock item missing")
}

pub async fn ledger_rows(engine: &TestEngine, variant_id: Uuid) -> Vec<stock_ledger::Model> {
    StockLedger::find()
        .filter(stock_ledger::Column::TenantId.eq(engine.tenant_id))
        .filter(stock_ledger::Column::VariantId.eq(variant_id))
        .order_by_asc(stock_ledger::Column::CreatedAt)
        .all(engine.db.as_ref())
        .await
        .expect("Failed to query ledger")
}
