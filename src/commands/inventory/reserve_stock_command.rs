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
use prometheus::{IntCounter, IntCounterVec, Opts};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

lazy_static! {
    static ref STOCK_RESERVATIONS: IntCounter = IntCounter::new(
        "stock_reservations_total",
        "Total number of stock reservations"
    )
    .expect("metric can be created");
    static ref STOCK_RESERVATION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stock_reservation_failures_total",
            "Total number of failed stock reservations"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
    static ref STOCK_RESERVED_QUANTITY: IntCounter = IntCounter::new(
        "stock_reserved_quantity_total",
        "Total quantity of stock reserved"
    )
    .expect("metric can be created");
}

/// Reserves stock for one order line across one or more warehouses.
///
/// The allocation is proportional to per-warehouse availability so that no
/// single warehouse is fully drained while others hold stock. With
/// `allow_backorder`, demand exceeding total availability lands on the
/// preferred warehouse (or the first in sort order) as an explicit backorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveStockCommand {
    pub tenant_id: Uuid,
    pub order_line_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    pub preferred_warehouse_id: Option<Uuid>,
    #[serde(default)]
    pub allow_backorder: bool,
}

/// One reservation created (or re-observed on redelivery) for the order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub reservation_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub backordered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveStockResult {
    pub order_line_id: Uuid,
    pub reservations: Vec<ReservationRecord>,
    pub total_reserved: i32,
    pub backordered_quantity: i32,
    /// True when an earlier delivery of the same order line already reserved
    /// it; nothing was mutated and `reservations` echoes the existing claims.
    pub redelivered: bool,
}

/// Availability snapshot for one warehouse, input to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseAvailability {
    pub warehouse_id: Uuid,
    pub available: i32,
}

/// One planned take against a warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTake {
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub backordered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub takes: Vec<PlannedTake>,
    pub backordered_quantity: i32,
}

/// Plans a reservation split without touching storage.
///
/// Ordering: the preferred warehouse first, then descending availability;
/// equal availability keeps ascending warehouse-id order, so the plan is
/// reproducible for a given snapshot. Fails with `InsufficientStock` (and
/// plans nothing) when demand exceeds total availability and backorders are
/// disallowed.
pub fn plan_allocation(
    stocks: &[WarehouseAvailability],
    quantity: i32,
    preferred_warehouse: Option<Uuid>,
    allow_backorder: bool,
) -> Result<AllocationPlan, ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::InvalidQuantity(format!(
            "Reservation quantity must be positive, got {}",
            quantity
        )));
    }

    let mut ordered: Vec<WarehouseAvailability> = stocks.to_vec();
    ordered.sort_by(|a, b| {
        let a_preferred = preferred_warehouse == Some(a.warehouse_id);
        let b_preferred = preferred_warehouse == Some(b.warehouse_id);
        b_preferred
            .cmp(&a_preferred)
            .then_with(|| b.available.max(0).cmp(&a.available.max(0)))
            .then_with(|| a.warehouse_id.cmp(&b.warehouse_id))
    });

    let total_available: i64 = ordered.iter().map(|s| i64::from(s.available.max(0))).sum();

    if !allow_backorder && total_available < i64::from(quantity) {
        return Err(ServiceError::InsufficientStock(format!(
            "Requested {} but only {} available across {} warehouse(s)",
            quantity,
            total_available,
            ordered.len()
        )));
    }

    let mut takes = vec![0i32; ordered.len()];
    let mut remaining = quantity;

    if total_available > 0 {
        // Proportional floor split, capped at availability and remaining demand.
        for (i, stock) in ordered.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let available = stock.available.max(0);
            if available == 0 {
                continue;
            }
            let share =
                ((i64::from(available) * i64::from(quantity)) / total_available) as i32;
            let take = share.min(available).min(remaining);
            takes[i] = take;
            remaining -= take;
        }

        // Integer rounding leaves a remainder; hand it out in sort order up to
        // each warehouse's leftover availability.
        for (i, stock) in ordered.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let headroom = (stock.available.max(0) - takes[i]).max(0);
            let extra = headroom.min(remaining);
            takes[i] += extra;
            remaining -= extra;
        }
    }

    let mut backordered = vec![false; ordered.len()];
    let mut backordered_quantity = 0;

    if remaining > 0 {
        if !allow_backorder {
            // Unreachable: the total check above already failed this case.
            return Err(ServiceError::InsufficientStock(format!(
                "Requested {} but only {} available",
                quantity, total_available
            )));
        }
        if ordered.is_empty() {
            return Err(ServiceError::InsufficientStock(
                "No stock rows exist for this variant and no preferred warehouse to backorder against"
                    .to_string(),
            ));
        }
        let target = preferred_warehouse
            .and_then(|preferred| ordered.iter().position(|s| s.warehouse_id == preferred))
            .unwrap_or(0);
        takes[target] += remaining;
        backordered[target] = true;
        backordered_quantity = remaining;
    }

    let takes = ordered
        .iter()
        .zip(takes.iter().zip(backordered.iter()))
        .filter(|(_, (take, _))| **take > 0)
        .map(|(stock, (take, backordered))| PlannedTake {
            warehouse_id: stock.warehouse_id,
            quantity: *take,
            backordered: *backordered,
        })
        .collect();

    Ok(AllocationPlan {
        takes,
        backordered_quantity,
    })
}

#[async_trait]
impl Command for ReserveStockCommand {
    type Result = ReserveStockResult;

    #[instrument(skip(self, db_pool, event_sender), fields(tenant_id = %self.tenant_id, order_line_id = %self.order_line_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if self.quantity < 1 {
            STOCK_RESERVATION_FAILURES
                .with_label_values(&["invalid_quantity"])
                .inc();
            return Err(ServiceError::InvalidQuantity(format!(
                "Reservation quantity must be positive, got {}",
                self.quantity
            )));
        }

        let db = db_pool.as_ref();
        let cmd = self.clone();

        let result = db
            .transaction::<_, ReserveStockResult, ServiceError>(move |txn| {
                Box::pin(async move { cmd.reserve_in_txn(txn).await })
            })
            .await
            .map_err(|e| {
                STOCK_RESERVATION_FAILURES
                    .with_label_values(&["transaction_error"])
                    .inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        if result.redelivered {
            warn!(
                order_line_id = %self.order_line_id,
                "Order line already reserved; treating redelivery as a no-op"
            );
            return Ok(result);
        }

        STOCK_RESERVATIONS.inc();
        STOCK_RESERVED_QUANTITY.inc_by(result.total_reserved as u64);

        event_sender
            .send(Event::StockReserved {
                tenant_id: self.tenant_id,
                order_line_id: self.order_line_id,
                variant_id: self.variant_id,
                quantity: result.total_reserved,
                backordered: result.backordered_quantity > 0,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            variant_id = %self.variant_id,
            quantity = self.quantity,
            warehouses = result.reservations.len(),
            backordered = result.backordered_quantity,
            "Stock reserved"
        );

        Ok(result)
    }
}

impl ReserveStockCommand {
    async fn reserve_in_txn(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<ReserveStockResult, ServiceError> {
        // At-least-once delivery: a line that already holds active
        // reservations was reserved by an earlier delivery.
        let existing = StockReservation::find()
            .filter(stock_reservation::Column::TenantId.eq(self.tenant_id))
            .filter(stock_reservation::Column::OrderLineId.eq(self.order_line_id))
            .filter(stock_reservation::Column::Status.eq(ReservationStatus::Reserved.as_str()))
            .all(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if !existing.is_empty() {
            let total = existing.iter().map(|r| r.qty).sum();
            return Ok(ReserveStockResult {
                order_line_id: self.order_line_id,
                reservations: existing
                    .into_iter()
                    .map(|r| ReservationRecord {
                        reservation_id: r.id,
                        warehouse_id: r.warehouse_id,
                        quantity: r.qty,
                        backordered: false,
                    })
                    .collect(),
                total_reserved: total,
                backordered_quantity: 0,
                redelivered: true,
            });
        }

        // A preference for a warehouse the tenant does not have degrades to
        // no preference instead of failing the whole reservation.
        let mut preferred = self.preferred_warehouse_id;
        if let Some(warehouse_id) = preferred {
            if !stock_txn::warehouse_exists(txn, self.tenant_id, warehouse_id).await? {
                warn!(
                    warehouse_id = %warehouse_id,
                    "Preferred warehouse unknown; ignoring preference"
                );
                preferred = None;
            }
        }

        // A backorder needs a row to land on even where none exists yet.
        if self.allow_backorder {
            if let Some(preferred) = preferred {
                stock_txn::lock_or_create_stock_item(
                    txn,
                    self.tenant_id,
                    preferred,
                    self.variant_id,
                )
                .await?;
            }
        }

        let items =
            stock_txn::load_stock_items_for_update(txn, self.tenant_id, self.variant_id).await?;

        let snapshot: Vec<WarehouseAvailability> = items
            .iter()
            .map(|item| WarehouseAvailability {
                warehouse_id: item.warehouse_id,
                available: item.available(),
            })
            .collect();

        let plan = plan_allocation(&snapshot, self.quantity, preferred, self.allow_backorder)?;

        let mut reservations = Vec::with_capacity(plan.takes.len());
        let mut total_reserved = 0;

        for take in &plan.takes {
            let item = items
                .iter()
                .find(|i| i.warehouse_id == take.warehouse_id)
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "Planned warehouse {} missing from locked snapshot",
                        take.warehouse_id
                    ))
                })?;

            let new_reserved = item.qty_reserved + take.quantity;

            let reservation = stock_reservation::ActiveModel {
                tenant_id: Set(self.tenant_id),
                order_line_id: Set(self.order_line_id),
                variant_id: Set(self.variant_id),
                warehouse_id: Set(take.warehouse_id),
                qty: Set(take.quantity),
                status: Set(ReservationStatus::Reserved.as_str().to_string()),
                ..Default::default()
            };
            let reservation = reservation
                .insert(txn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            let mut active: stock_item::ActiveModel = item.clone().into();
            active.qty_reserved = Set(new_reserved);
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
                    warehouse_id: Some(take.warehouse_id),
                    qty_delta: 0,
                    reason: LedgerReason::Reserve,
                    order_line_id: Some(self.order_line_id),
                    transfer_id: None,
                    note: None,
                    snapshot_available: item.qty_on_hand - new_reserved,
                },
            )
            .await?;

            total_reserved += take.quantity;
            reservations.push(ReservationRecord {
                reservation_id: reservation.id,
                warehouse_id: take.warehouse_id,
                quantity: take.quantity,
                backordered: take.backordered,
            });
        }

        Ok(ReserveStockResult {
            order_line_id: self.order_line_id,
            reservations,
            total_reserved,
            backordered_quantity: plan.backordered_quantity,
            redelivered: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wh(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn snapshot(entries: &[(u128, i32)]) -> Vec<WarehouseAvailability> {
        entries
            .iter()
            .map(|(id, available)| WarehouseAvailability {
                warehouse_id: wh(*id),
                available: *available,
            })
            .collect()
    }

    fn take_for(plan: &AllocationPlan, id: u128) -> i32 {
        plan.takes
            .iter()
            .find(|t| t.warehouse_id == wh(id))
            .map(|t| t.quantity)
            .unwrap_or(0)
    }

    #[test]
    fn proportional_split_two_warehouses() {
        let plan = plan_allocation(&snapshot(&[(1, 10), (2, 5)]), 12, None, false).unwrap();
        assert_eq!(take_for(&plan, 1), 8);
        assert_eq!(take_for(&plan, 2), 4);
        assert_eq!(plan.backordered_quantity, 0);
    }

    #[test]
    fn insufficient_stock_plans_nothing() {
        let err = plan_allocation(&snapshot(&[(1, 3)]), 5, None, false).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock(_)));
    }

    #[test]
    fn backorder_lands_on_preferred_warehouse() {
        let plan = plan_allocation(&snapshot(&[(1, 0)]), 5, Some(wh(1)), true).unwrap();
        assert_eq!(plan.takes.len(), 1);
        assert_eq!(take_for(&plan, 1), 5);
        assert!(plan.takes[0].backordered);
        assert_eq!(plan.backordered_quantity, 5);
    }

    #[test]
    fn backorder_overflow_tops_up_first_in_sort_order() {
        // 7 available in total, demand 10: the 3 overflow goes to the most
        // available warehouse since none is preferred.
        let plan = plan_allocation(&snapshot(&[(1, 5), (2, 2)]), 10, None, true).unwrap();
        assert_eq!(take_for(&plan, 1), 8);
        assert_eq!(take_for(&plan, 2), 2);
        assert_eq!(plan.backordered_quantity, 3);
    }

    #[test]
    fn preferred_warehouse_absorbs_remainder_first() {
        let plan = plan_allocation(&snapshot(&[(1, 10), (2, 4)]), 3, Some(wh(2)), false).unwrap();
        // Proportional floors: preferred gets floor(4/14*3) = 0, the other
        // floor(10/14*3) = 2. The remainder walk starts at the preferred
        // warehouse, which absorbs the leftover unit.
        assert_eq!(take_for(&plan, 2), 1);
        assert_eq!(take_for(&plan, 1), 2);
    }

    #[test]
    fn equal_availability_ties_break_by_warehouse_id() {
        let plan = plan_allocation(&snapshot(&[(2, 5), (1, 5)]), 1, None, false).unwrap();
        assert_eq!(plan.takes.len(), 1);
        assert_eq!(plan.takes[0].warehouse_id, wh(1));
    }

    #[test]
    fn plan_is_deterministic() {
        let stocks = snapshot(&[(1, 7), (2, 7), (3, 11), (4, 0)]);
        let first = plan_allocation(&stocks, 20, None, false).unwrap();
        for _ in 0..16 {
            assert_eq!(plan_allocation(&stocks, 20, None, false).unwrap(), first);
        }
    }

    #[test]
    fn exact_fit_drains_every_warehouse() {
        let plan = plan_allocation(&snapshot(&[(1, 4), (2, 6)]), 10, None, false).unwrap();
        assert_eq!(take_for(&plan, 1), 4);
        assert_eq!(take_for(&plan, 2), 6);
    }

    #[test]
    fn negative_availability_counts_as_zero() {
        // A backordered row (reserved > on hand) must not absorb new demand.
        let plan = plan_allocation(&snapshot(&[(1, -5), (2, 6)]), 4, None, false).unwrap();
        assert_eq!(take_for(&plan, 1), 0);
        assert_eq!(take_for(&plan, 2), 4);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = plan_allocation(&snapshot(&[(1, 10)]), 0, None, false).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity(_)));
    }
}
