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
    static ref STOCK_CONSUMPTIONS: IntCounter = IntCounter::new(
        "stock_consumptions_total",
        "Total number of order lines consumed"
    )
    .expect("metric can be created");
}

/// Draws down an order line's reservations when fulfillment ships the goods.
///
/// Each active reservation is drawn against its stock item: on-hand and
/// reserved both drop by the reserved quantity and the reservation reaches
/// its terminal `consumed` state. Idempotent by the active-status filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeStockCommand {
    pub tenant_id: Uuid,
    pub order_line_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeStockResult {
    pub order_line_id: Uuid,
    pub consumed_count: usize,
    pub consumed_quantity: i32,
}

#[async_trait]
impl Command for ConsumeStockCommand {
    type Result = ConsumeStockResult;

    #[instrument(skip(self, db_pool, event_sender), fields(tenant_id = %self.tenant_id, order_line_id = %self.order_line_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let cmd = self.clone();

        let result = db
            .transaction::<_, ConsumeStockResult, ServiceError>(move |txn| {
                Box::pin(async move { cmd.consume_in_txn(txn).await })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        if result.consumed_count == 0 {
            info!("No active reservations for order line; consume is a no-op");
            return Ok(result);
        }

        STOCK_CONSUMPTIONS.inc();

        event_sender
            .send(Event::StockConsumed {
                tenant_id: self.tenant_id,
                order_line_id: self.order_line_id,
                quantity: result.consumed_quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            consumed_count = result.consumed_count,
            consumed_quantity = result.consumed_quantity,
            "Stock consumed"
        );

        Ok(result)
    }
}

impl ConsumeStockCommand {
    async fn consume_in_txn(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<ConsumeStockResult, ServiceError> {
        let reservations = StockReservation::find()
            .filter(stock_reservation::Column::TenantId.eq(self.tenant_id))
            .filter(stock_reservation::Column::OrderLineId.eq(self.order_line_id))
            .filter(stock_reservation::Column::Status.eq(ReservationStatus::Reserved.as_str()))
            .order_by_asc(stock_reservation::Column::WarehouseId)
            .all(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut consumed_quantity = 0;
        let consumed_count = reservations.len();

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

            // A backordered reservation may exceed what is physically on hand;
            // the shipped quantity can never exceed it.
            let draw = reservation.qty.min(item.qty_on_hand);
            let new_on_hand = item.qty_on_hand - draw;
            let new_reserved = (item.qty_reserved - reservation.qty).max(0);

            let mut active_item: stock_item::ActiveModel = item.clone().into();
            active_item.qty_on_hand = Set(new_on_hand);
            active_item.qty_reserved = Set(new_reserved);
            active_item.updated_at = Set(Some(Utc::now()));
            active_item
                .update(txn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            let mut active_reservation: stock_reservation::ActiveModel = reservation.clone().into();
            active_reservation.status = Set(ReservationStatus::Consumed.as_str().to_string());
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
                    qty_delta: -draw,
                    reason: LedgerReason::Consume,
                    order_line_id: Some(self.order_line_id),
                    transfer_id: None,
                    note: None,
                    snapshot_available: new_on_hand - new_reserved,
                },
            )
            .await?;

            consumed_quantity += draw;
        }

        Ok(ConsumeStockResult {
            order_line_id: self.order_line_id,
            consumed_count,
            consumed_quantity,
        })
    }
}
