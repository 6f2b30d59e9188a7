//! Transaction-scoped helpers shared by the stock commands.
//!
//! Stock rows are only ever read for mutation through these functions, which
//! apply `FOR UPDATE` locking (where the backend supports it) and implement
//! the lazy get-or-create rule: upsert with on-conflict-do-nothing, then
//! re-select under lock.

use crate::db::with_row_lock;
use crate::entities::{
    stock_item::{self, Entity as StockItem},
    stock_ledger::{self, LedgerReason},
    warehouse::{self, Entity as Warehouse},
};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Loads every stock item for (tenant, variant) under a row lock, in
/// ascending warehouse-id order. Locking in a stable order prevents
/// lock-ordering deadlocks between concurrent operations that touch
/// overlapping warehouse sets.
pub(crate) async fn load_stock_items_for_update<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    variant_id: Uuid,
) -> Result<Vec<stock_item::Model>, ServiceError> {
    let query = StockItem::find()
        .filter(stock_item::Column::TenantId.eq(tenant_id))
        .filter(stock_item::Column::VariantId.eq(variant_id))
        .order_by_asc(stock_item::Column::WarehouseId);

    with_row_lock(query, conn.get_database_backend())
        .all(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}

/// Loads one stock item under a row lock, creating it with zero quantities if
/// the (tenant, warehouse, variant) triple has never been touched.
pub(crate) async fn lock_or_create_stock_item<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Uuid,
) -> Result<stock_item::Model, ServiceError> {
    let fresh = stock_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        warehouse_id: Set(warehouse_id),
        variant_id: Set(variant_id),
        qty_on_hand: Set(0),
        qty_reserved: Set(0),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    };

    // Races with a concurrent creator resolve on the unique
    // (tenant, warehouse, variant) index; the loser's insert is a no-op.
    StockItem::insert(fresh)
        .on_conflict(
            OnConflict::columns([
                stock_item::Column::TenantId,
                stock_item::Column::WarehouseId,
                stock_item::Column::VariantId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    let query = StockItem::find()
        .filter(stock_item::Column::TenantId.eq(tenant_id))
        .filter(stock_item::Column::WarehouseId.eq(warehouse_id))
        .filter(stock_item::Column::VariantId.eq(variant_id));

    with_row_lock(query, conn.get_database_backend())
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)?
        .ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Stock item for warehouse {} vanished after upsert",
                warehouse_id
            ))
        })
}

/// Loads one existing stock item under a row lock.
pub(crate) async fn find_locked_stock_item<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Uuid,
) -> Result<Option<stock_item::Model>, ServiceError> {
    let query = StockItem::find()
        .filter(stock_item::Column::TenantId.eq(tenant_id))
        .filter(stock_item::Column::WarehouseId.eq(warehouse_id))
        .filter(stock_item::Column::VariantId.eq(variant_id));

    with_row_lock(query, conn.get_database_backend())
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}

/// Whether a warehouse exists for the tenant.
pub(crate) async fn warehouse_exists<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    warehouse_id: Uuid,
) -> Result<bool, ServiceError> {
    let found = Warehouse::find_by_id(warehouse_id)
        .filter(warehouse::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;
    Ok(found.is_some())
}

/// Verifies a warehouse exists for the tenant.
pub(crate) async fn require_warehouse<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    warehouse_id: Uuid,
) -> Result<warehouse::Model, ServiceError> {
    Warehouse::find_by_id(warehouse_id)
        .filter(warehouse::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)?
        .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id)))
}

/// One pending ledger entry. Exactly one is appended for every stock item
/// mutation, inside the mutating transaction.
pub(crate) struct LedgerWrite {
    pub tenant_id: Uuid,
    pub variant_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub qty_delta: i32,
    pub reason: LedgerReason,
    pub order_line_id: Option<Uuid>,
    pub transfer_id: Option<Uuid>,
    pub note: Option<String>,
    pub snapshot_available: i32,
}

pub(crate) async fn append_ledger<C: ConnectionTrait>(
    conn: &C,
    entry: LedgerWrite,
) -> Result<(), ServiceError> {
    let row = stock_ledger::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(entry.tenant_id),
        variant_id: Set(entry.variant_id),
        warehouse_id: Set(entry.warehouse_id),
        qty_delta: Set(entry.qty_delta),
        reason: Set(entry.reason.as_str().to_string()),
        order_line_id: Set(entry.order_line_id),
        transfer_id: Set(entry.transfer_id),
        note: Set(entry.note),
        snapshot_available: Set(entry.snapshot_available),
        created_at: Set(Utc::now()),
    };

    row.insert(conn).await.map_err(ServiceError::DatabaseError)?;
    Ok(())
}
