use crate::commands::inventory::stock_txn::{self, LedgerWrite};
use crate::commands::Command;
use crate::{
    db::DbPool,
    entities::{
        stock_adjustment::{self, AdjustmentKind},
        stock_item,
        stock_ledger::LedgerReason,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts};
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set, TransactionError, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref STOCK_ADJUSTMENTS: IntCounter = IntCounter::new(
        "stock_adjustments_total",
        "Total number of applied stock adjustments"
    )
    .expect("metric can be created");
    static ref STOCK_ADJUSTMENT_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stock_adjustment_failures_total",
            "Total number of rejected stock adjustments"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
}

/// Applies a manual delta to one warehouse's on-hand quantity.
///
/// Cycle counts are advisory, so a negative delta that would push on-hand
/// below zero is clamped to zero rather than rejected. The clamp is refused
/// outright when it would leave the row with more reserved than on hand.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdjustStockCommand {
    pub tenant_id: Uuid,
    pub warehouse_id: Uuid,
    pub variant_id: Uuid,
    pub qty_delta: i32,
    pub kind: AdjustmentKind,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockResult {
    pub adjustment_id: Uuid,
    pub warehouse_id: Uuid,
    pub variant_id: Uuid,
    /// Delta actually applied after clamping at zero on-hand.
    pub applied_delta: i32,
    pub new_on_hand: i32,
    pub new_available: i32,
}

#[async_trait]
impl Command for AdjustStockCommand {
    type Result = AdjustStockResult;

    #[instrument(skip(self, db_pool, event_sender), fields(tenant_id = %self.tenant_id, warehouse_id = %self.warehouse_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            STOCK_ADJUSTMENT_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        if self.qty_delta == 0 {
            STOCK_ADJUSTMENT_FAILURES
                .with_label_values(&["invalid_quantity"])
                .inc();
            return Err(ServiceError::InvalidQuantity(
                "Adjustment delta must be non-zero".to_string(),
            ));
        }

        if self.kind == AdjustmentKind::Receipt && self.qty_delta < 0 {
            STOCK_ADJUSTMENT_FAILURES
                .with_label_values(&["invalid_quantity"])
                .inc();
            return Err(ServiceError::InvalidQuantity(
                "A receipt must carry a positive delta".to_string(),
            ));
        }

        let db = db_pool.as_ref();
        let cmd = self.clone();

        let result = db
            .transaction::<_, AdjustStockResult, ServiceError>(move |txn| {
                Box::pin(async move { cmd.adjust_in_txn(txn).await })
            })
            .await
            .map_err(|e| {
                STOCK_ADJUSTMENT_FAILURES
                    .with_label_values(&["transaction_error"])
                    .inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        STOCK_ADJUSTMENTS.inc();

        event_sender
            .send(Event::StockAdjusted {
                tenant_id: self.tenant_id,
                warehouse_id: self.warehouse_id,
                variant_id: self.variant_id,
                qty_delta: result.applied_delta,
                new_available: result.new_available,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            variant_id = %self.variant_id,
            requested_delta = self.qty_delta,
            applied_delta = result.applied_delta,
            new_on_hand = result.new_on_hand,
            "Stock adjusted"
        );

        Ok(result)
    }
}

impl AdjustStockCommand {
    fn ledger_reason(&self) -> LedgerReason {
        match self.kind {
            AdjustmentKind::CycleCount => LedgerReason::Adjustment,
            AdjustmentKind::Receipt => LedgerReason::Receive,
            AdjustmentKind::Correction => LedgerReason::Correction,
        }
    }

    async fn adjust_in_txn(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<AdjustStockResult, ServiceError> {
        stock_txn::require_warehouse(txn, self.tenant_id, self.warehouse_id).await?;

        let audit = stock_adjustment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(self.tenant_id),
            warehouse_id: Set(self.warehouse_id),
            variant_id: Set(self.variant_id),
            qty_delta: Set(self.qty_delta),
            kind: Set(self.kind.as_str().to_string()),
            reason: Set(self.reason.clone()),
            created_at: Set(Utc::now()),
        };
        let audit = audit.insert(txn).await.map_err(ServiceError::DatabaseError)?;

        let item = stock_txn::lock_or_create_stock_item(
            txn,
            self.tenant_id,
            self.warehouse_id,
            self.variant_id,
        )
        .await?;

        let new_on_hand = (item.qty_on_hand + self.qty_delta).max(0);

        // A negative delta may not strand reserved quantity above on-hand.
        // Positive deltas only narrow an existing backorder deficit, so they
        // pass even while the row is over-reserved.
        if self.qty_delta < 0 && new_on_hand < item.qty_reserved {
            STOCK_ADJUSTMENT_FAILURES
                .with_label_values(&["invariant_violation"])
                .inc();
            return Err(ServiceError::InvariantViolation(format!(
                "Adjustment would leave on-hand {} below reserved {} for warehouse {}",
                new_on_hand, item.qty_reserved, self.warehouse_id
            )));
        }

        let applied_delta = new_on_hand - item.qty_on_hand;
        let new_available = new_on_hand - item.qty_reserved;

        let mut active: stock_item::ActiveModel = item.into();
        active.qty_on_hand = Set(new_on_hand);
        active.updated_at = Set(Some(Utc::now()));
        active
            .update(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        stock_txn::append_ledger(
            txn,
            LedgerWrite {
                tenant_id: self.tenant_id,
                variant_id: self.variant_id,
                warehouse_id: Some(self.warehouse_id),
                qty_delta: applied_delta,
                reason: self.ledger_reason(),
                order_line_id: None,
                transfer_id: None,
                note: Some(self.reason.clone()),
                snapshot_available: new_available,
            },
        )
        .await?;

        Ok(AdjustStockResult {
            adjustment_id: audit.id,
            warehouse_id: self.warehouse_id,
            variant_id: self.variant_id,
            applied_delta,
            new_on_hand,
            new_available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(qty_delta: i32, kind: AdjustmentKind) -> AdjustStockCommand {
        AdjustStockCommand {
            tenant_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            variant_id: Uuid::new_v4(),
            qty_delta,
            kind,
            reason: "cycle count".to_string(),
        }
    }

    #[test]
    fn ledger_reason_follows_kind() {
        assert_eq!(
            command(1, AdjustmentKind::CycleCount).ledger_reason(),
            LedgerReason::Adjustment
        );
        assert_eq!(
            command(1, AdjustmentKind::Receipt).ledger_reason(),
            LedgerReason::Receive
        );
        assert_eq!(
            command(-1, AdjustmentKind::Correction).ledger_reason(),
            LedgerReason::Correction
        );
    }

    #[test]
    fn empty_reason_fails_validation() {
        let mut cmd = command(5, AdjustmentKind::CycleCount);
        cmd.reason = String::new();
        assert!(cmd.validate().is_err());
    }
}
