use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason codes for ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerReason {
    Adjustment,
    TransferOut,
    TransferIn,
    Reserve,
    Consume,
    Release,
    Receive,
    Correction,
}

impl LedgerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerReason::Adjustment => "adjustment",
            LedgerReason::TransferOut => "transfer_out",
            LedgerReason::TransferIn => "transfer_in",
            LedgerReason::Reserve => "reserve",
            LedgerReason::Consume => "consume",
            LedgerReason::Release => "release",
            LedgerReason::Receive => "receive",
            LedgerReason::Correction => "correction",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "adjustment" => Some(LedgerReason::Adjustment),
            "transfer_out" => Some(LedgerReason::TransferOut),
            "transfer_in" => Some(LedgerReason::TransferIn),
            "reserve" => Some(LedgerReason::Reserve),
            "consume" => Some(LedgerReason::Consume),
            "release" => Some(LedgerReason::Release),
            "receive" => Some(LedgerReason::Receive),
            "correction" => Some(LedgerReason::Correction),
            _ => None,
        }
    }
}

/// One immutable, append-only record of a quantity change.
///
/// `qty_delta` is 0 for pure reservation and release events that do not move
/// on-hand stock. `snapshot_available` captures `qty_on_hand - qty_reserved`
/// for the touched row at write time. Rows are never updated or deleted; this
/// table is the canonical audit trail.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub variant_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub qty_delta: i32,
    pub reason: String,
    pub order_line_id: Option<Uuid>,
    pub transfer_id: Option<Uuid>,
    pub note: Option<String>,
    pub snapshot_available: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_round_trips() {
        for reason in [
            LedgerReason::Adjustment,
            LedgerReason::TransferOut,
            LedgerReason::TransferIn,
            LedgerReason::Reserve,
            LedgerReason::Consume,
            LedgerReason::Release,
            LedgerReason::Receive,
            LedgerReason::Correction,
        ] {
            assert_eq!(LedgerReason::from_str(reason.as_str()), Some(reason));
        }
        assert_eq!(LedgerReason::from_str("order_alloc"), None);
    }
}
