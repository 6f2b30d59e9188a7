//! Stock engine facade.
//!
//! `StockService` is the single entry point callers use: the Order subsystem
//! feeds it order-line events, operator tooling submits adjustments and
//! transfers, and storefronts read availability through it. Each mutating
//! method delegates to its command, which owns validation, locking, and
//! ledger writes.

use crate::commands::inventory::{
    adjust_stock_command::AdjustStockResult,
    consume_stock_command::ConsumeStockResult,
    release_stock_command::ReleaseStockResult,
    reserve_stock_command::ReserveStockResult,
    transfer_stock_command::TransferStockResult,
    AdjustStockCommand, ConsumeStockCommand, ReleaseStockCommand, ReserveStockCommand,
    TransferStockCommand,
};
use crate::commands::Command;
use crate::db::DbPool;
use crate::entities::{
    stock_item::{self, Entity as StockItem},
    stock_reservation::{self, Entity as StockReservation},
};
use crate::errors::ServiceError;
use crate::events::{EventSender, OrderLineCreated, OrderLineRemoved};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Per-warehouse availability breakdown for operator tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseAvailabilityRow {
    pub warehouse_id: Uuid,
    pub qty_on_hand: i32,
    pub qty_reserved: i32,
    pub available: i32,
}

/// Service for reserving, releasing, and rebalancing stock.
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl StockService {
    /// Creates a new stock service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Reserves stock for an order line across warehouses.
    #[instrument(skip(self, command))]
    pub async fn reserve(
        &self,
        command: ReserveStockCommand,
    ) -> Result<ReserveStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Returns an order line's reservations to stock.
    #[instrument(skip(self, command))]
    pub async fn release(
        &self,
        command: ReleaseStockCommand,
    ) -> Result<ReleaseStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Draws down an order line's reservations at fulfillment time.
    #[instrument(skip(self, command))]
    pub async fn consume(
        &self,
        command: ConsumeStockCommand,
    ) -> Result<ConsumeStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Applies a manual on-hand adjustment.
    #[instrument(skip(self, command))]
    pub async fn adjust(
        &self,
        command: AdjustStockCommand,
    ) -> Result<AdjustStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Moves stock between warehouses.
    #[instrument(skip(self, command))]
    pub async fn transfer(
        &self,
        command: TransferStockCommand,
    ) -> Result<TransferStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Handles an order line creation delivered by the Order subsystem.
    ///
    /// Explicit call site, no save-hook magic: the order code calls this right
    /// where the line is created. Safe under at-least-once delivery.
    pub async fn on_order_line_created(
        &self,
        event: OrderLineCreated,
    ) -> Result<ReserveStockResult, ServiceError> {
        self.reserve(ReserveStockCommand {
            tenant_id: event.tenant_id,
            order_line_id: event.order_line_id,
            variant_id: event.variant_id,
            quantity: event.quantity,
            preferred_warehouse_id: event.preferred_warehouse_id,
            allow_backorder: event.allow_backorder,
        })
        .await
    }

    /// Handles an order line removal delivered by the Order subsystem.
    pub async fn on_order_line_removed(
        &self,
        event: OrderLineRemoved,
    ) -> Result<ReleaseStockResult, ServiceError> {
        self.release(ReleaseStockCommand {
            tenant_id: event.tenant_id,
            order_line_id: event.order_line_id,
        })
        .await
    }

    /// Total on-hand quantity for a variant across all warehouses.
    ///
    /// Lock-free read; may trail in-flight reservations by a transaction.
    #[instrument(skip(self))]
    pub async fn available(&self, tenant_id: Uuid, variant_id: Uuid) -> Result<i64, ServiceError> {
        let items = self.stock_items(tenant_id, variant_id).await?;
        Ok(items.iter().map(|i| i64::from(i.qty_on_hand)).sum())
    }

    /// Total on-hand minus reserved for a variant across all warehouses.
    ///
    /// Negative while backorders are outstanding. Allocation planning uses
    /// this stricter figure.
    #[instrument(skip(self))]
    pub async fn available_net(
        &self,
        tenant_id: Uuid,
        variant_id: Uuid,
    ) -> Result<i64, ServiceError> {
        let items = self.stock_items(tenant_id, variant_id).await?;
        Ok(items.iter().map(|i| i64::from(i.available())).sum())
    }

    /// Per-warehouse availability for a variant, ordered by warehouse id.
    #[instrument(skip(self))]
    pub async fn availability_by_warehouse(
        &self,
        tenant_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Vec<WarehouseAvailabilityRow>, ServiceError> {
        let items = self.stock_items(tenant_id, variant_id).await?;
        Ok(items
            .into_iter()
            .map(|i| WarehouseAvailabilityRow {
                warehouse_id: i.warehouse_id,
                qty_on_hand: i.qty_on_hand,
                qty_reserved: i.qty_reserved,
                available: i.available(),
            })
            .collect())
    }

    /// Lists every reservation held by an order line, newest first.
    #[instrument(skip(self))]
    pub async fn reservations_for_order_line(
        &self,
        tenant_id: Uuid,
        order_line_id: Uuid,
    ) -> Result<Vec<stock_reservation::Model>, ServiceError> {
        StockReservation::find()
            .filter(stock_reservation::Column::TenantId.eq(tenant_id))
            .filter(stock_reservation::Column::OrderLineId.eq(order_line_id))
            .order_by_desc(stock_reservation::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn stock_items(
        &self,
        tenant_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Vec<stock_item::Model>, ServiceError> {
        StockItem::find()
            .filter(stock_item::Column::TenantId.eq(tenant_id))
            .filter(stock_item::Column::VariantId.eq(variant_id))
            .order_by_asc(stock_item::Column::WarehouseId)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
