use crate::commands::inventory::stock_txn::{self, LedgerWrite};
use crate::commands::Command;
use crate::{
    db::DbPool,
    entities::{
        stock_item,
        stock_ledger::LedgerReason,
        stock_transfer::{self, TransferStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set, TransactionError, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref STOCK_TRANSFERS: IntCounter = IntCounter::new(
        "stock_transfers_total",
        "Total number of completed stock transfers"
    )
    .expect("metric can be created");
    static ref STOCK_TRANSFER_FAILURES: IntCounter = IntCounter::new(
        "stock_transfer_failures_total",
        "Total number of failed stock transfers"
    )
    .expect("metric can be created");
}

/// Moves on-hand quantity of a variant between two warehouses.
///
/// Expressed as a linked debit/credit: one transfer_out and one transfer_in
/// ledger row, both carrying the transfer's id. Reserved quantity never
/// moves; reservations stay bound to the warehouse they were planned against.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferStockCommand {
    pub tenant_id: Uuid,
    pub variant_id: Uuid,
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    pub qty: i32,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStockResult {
    pub transfer_id: Uuid,
    pub source_on_hand: i32,
    pub destination_on_hand: i32,
}

#[async_trait]
impl Command for TransferStockCommand {
    type Result = TransferStockResult;

    #[instrument(skip(self, db_pool, event_sender), fields(tenant_id = %self.tenant_id, variant_id = %self.variant_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            STOCK_TRANSFER_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        if self.qty < 1 {
            STOCK_TRANSFER_FAILURES.inc();
            return Err(ServiceError::InvalidQuantity(format!(
                "Transfer quantity must be positive, got {}",
                self.qty
            )));
        }

        if self.source_warehouse_id == self.destination_warehouse_id {
            STOCK_TRANSFER_FAILURES.inc();
            return Err(ServiceError::ValidationError(
                "Cannot transfer stock to the same warehouse".to_string(),
            ));
        }

        let db = db_pool.as_ref();
        let cmd = self.clone();

        let result = db
            .transaction::<_, TransferStockResult, ServiceError>(move |txn| {
                Box::pin(async move { cmd.transfer_in_txn(txn).await })
            })
            .await
            .map_err(|e| {
                STOCK_TRANSFER_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        STOCK_TRANSFERS.inc();

        event_sender
            .send(Event::StockTransferred {
                tenant_id: self.tenant_id,
                transfer_id: result.transfer_id,
                variant_id: self.variant_id,
                source_warehouse_id: self.source_warehouse_id,
                destination_warehouse_id: self.destination_warehouse_id,
                quantity: self.qty,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            source = %self.source_warehouse_id,
            destination = %self.destination_warehouse_id,
            qty = self.qty,
            "Stock transferred"
        );

        Ok(result)
    }
}

impl TransferStockCommand {
    async fn transfer_in_txn(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<TransferStockResult, ServiceError> {
        stock_txn::require_warehouse(txn, self.tenant_id, self.source_warehouse_id).await?;
        stock_txn::require_warehouse(txn, self.tenant_id, self.destination_warehouse_id).await?;

        let transfer = stock_transfer::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(self.tenant_id),
            variant_id: Set(self.variant_id),
            source_warehouse_id: Set(self.source_warehouse_id),
            destination_warehouse_id: Set(self.destination_warehouse_id),
            qty: Set(self.qty),
            status: Set(TransferStatus::Completed.as_str().to_string()),
            note: Set(self.note.clone()),
            created_at: Set(Utc::now()),
        };
        let transfer = transfer
            .insert(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        // Both rows lock in ascending warehouse-id order, the same stable
        // order every other multi-row operation uses.
        let (source, destination) =
            if self.source_warehouse_id < self.destination_warehouse_id {
                let source = stock_txn::lock_or_create_stock_item(
                    txn,
                    self.tenant_id,
                    self.source_warehouse_id,
                    self.variant_id,
                )
                .await?;
                let destination = stock_txn::lock_or_create_stock_item(
                    txn,
                    self.tenant_id,
                    self.destination_warehouse_id,
                    self.variant_id,
                )
                .await?;
                (source, destination)
            } else {
                let destination = stock_txn::lock_or_create_stock_item(
                    txn,
                    self.tenant_id,
                    self.destination_warehouse_id,
                    self.variant_id,
                )
                .await?;
                let source = stock_txn::lock_or_create_stock_item(
                    txn,
                    self.tenant_id,
                    self.source_warehouse_id,
                    self.variant_id,
                )
                .await?;
                (source, destination)
            };

        if source.available() < self.qty {
            STOCK_TRANSFER_FAILURES.inc();
            return Err(ServiceError::InsufficientStock(format!(
                "Transfer of {} exceeds available {} at warehouse {}",
                self.qty,
                source.available(),
                self.source_warehouse_id
            )));
        }

        let source_on_hand = source.qty_on_hand - self.qty;
        let destination_on_hand = destination.qty_on_hand + self.qty;

        let mut active_source: stock_item::ActiveModel = source.clone().into();
        active_source.qty_on_hand = Set(source_on_hand);
        active_source.updated_at = Set(Some(Utc::now()));
        active_source
            .update(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        stock_txn::append_ledger(
            txn,
            LedgerWrite {
                tenant_id: self.tenant_id,
                variant_id: self.variant_id,
                warehouse_id: Some(self.source_warehouse_id),
                qty_delta: -self.qty,
                reason: LedgerReason::TransferOut,
                order_line_id: None,
                transfer_id: Some(transfer.id),
                note: self.note.clone(),
                snapshot_available: source_on_hand - source.qty_reserved,
            },
        )
        .await?;

        let mut active_destination: stock_item::ActiveModel = destination.clone().into();
        active_destination.qty_on_hand = Set(destination_on_hand);
        active_destination.updated_at = Set(Some(Utc::now()));
        active_destination
            .update(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        stock_txn::append_ledger(
            txn,
            LedgerWrite {
                tenant_id: self.tenant_id,
                variant_id: self.variant_id,
                warehouse_id: Some(self.destination_warehouse_id),
                qty_delta: self.qty,
                reason: LedgerReason::TransferIn,
                order_line_id: None,
                transfer_id: Some(transfer.id),
                note: self.note.clone(),
                snapshot_available: destination_on_hand - destination.qty_reserved,
            },
        )
        .await?;

        Ok(TransferStockResult {
            transfer_id: transfer.id,
            source_on_hand,
            destination_on_hand,
        })
    }
}
