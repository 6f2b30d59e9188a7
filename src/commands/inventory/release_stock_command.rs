use crate::commands::inventory::stock_txn::{self, LedgerWrite};
use crate::commands::Command;
use crate::{
    db::DbPool,
    entities::{
        stock_item,
        stock_ledger::LedgerReason,
        stock_reservation::{self, Entity as StockReservation, ReservationStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

lazy_static! {
    static ref STOCK_RELEASES: IntCounter = IntCounter::new(
        "stock_releases_total",
        "Total number of order lines released"
    )
    .expect("metric can be created");
    static ref STOCK_RELEASED_QUANTITY: IntCounter = IntCounter::new(
        "stock_released_quantity_total",
        "Total quantity of stock returned by releases"
    )
    .expect("metric can be created");
}

/// Returns every active reservation held by an order line to its stock items.
///
/// Idempotent: a line with no active reservations releases nothing and
/// succeeds, so redelivered removal events are harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseStockCommand {
    pub tenant_id: Uuid,
    pub order_line_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseStockResult {
    pub order_line_id: Uuid,
    pub released_count: usize,
    pub released_quantity: i32,
}

#[async_trait]
impl Command for ReleaseStockCommand {
    type Result = ReleaseStockResult;

    #[instrument(skip(self, db_pool, event_sender), fields(tenant_id = %self.tenant_id, order_line_id = %self.order_line_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let cmd = self.clone();

        let result = db
            .transaction::<_, ReleaseStockResult, ServiceError>(move |txn| {
                Box::pin(async move { cmd.release_in_txn(txn).await })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        if result.released_count == 0 {
            info!("No active reservations for order line; release is a no-op");
            return Ok(result);
        }

        STOCK_RELEASES.inc();
        STOCK_RELEASED_QUANTITY.inc_by(result.released_quantity as u64);

        event_sender
            .send(Event::StockReleased {
                tenant_id: self.tenant_id,
                order_line_id: self.order_line_id,
                quantity: result.released_quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            released_count = result.released_count,
            released_quantity = result.released_quantity,
            "Stock released"
        );

        Ok(result)
    }
}

impl ReleaseStockCommand {
    async fn release_in_txn(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<ReleaseStockResult, ServiceError> {
        // Warehouse-id order keeps the item locks in the same stable order the
        // allocation path uses.
        let reservations = StockReservation::find()
            .filter(stock_reservation::Column::TenantId.eq(self.tenant_id))
            .filter(stock_reservation::Column::OrderLineId.eq(self.order_line_id))
            .filter(stock_reservation::Column::Status.eq(ReservationStatus::Reserved.as_str()))
            .order_by_asc(stock_reservation::Column::WarehouseId)
            .all(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut released_quantity = 0;
        let released_count = reservations.len();

        for reservation in reservations {
            let item = stock_txn::find_locked_stock_item(
                txn,
                self.tenant_id,
                reservation.warehouse_id,
                reservation.variant_id,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Stock item for reservation {} not found",
                    reservation.id
                ))
            })?;

            // Floor at zero: the invariants make underflow impossible, but a
            // corrupt row must not push reserved quantity negative.
            let new_reserved = (item.qty_reserved - reservation.qty).max(0);

            let mut active_item: stock_item::ActiveModel = item.clone().into();
            active_item.qty_reserved = Set(new_reserved);
            active_item.updated_at = Set(Some(Utc::now()));
            active_item
                .update(txn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            let mut active_reservation: stock_reservation::ActiveModel = reservation.clone().into();
            active_reservation.status = Set(ReservationStatus::Released.as_str().to_string());
            active_reservation
                .update(txn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            stock_txn::append_ledger(
                txn,
                LedgerWrite {
                    tenant_id: self.tenant_id,
                    variant_id: reservation.variant_id,
                    warehouse_id: Some(reservation.warehouse_id),
                    qty_delta: 0,
                    reason: LedgerReason::Release,
                    order_line_id: Some(self.order_line_id),
                    transfer_id: None,
                    note: None,
                    snapshot_available: item.qty_on_hand - new_reserved,
                },
            )
            .await?;

            released_quantity += reservation.qty;
        }

        Ok(ReleaseStockResult {
            order_line_id: self.order_line_id,
            released_count,
            released_quantity,
        })
    }
}
