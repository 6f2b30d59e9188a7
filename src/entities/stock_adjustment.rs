use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of adjustment a command represents. The kind selects the ledger
/// reason code the applied adjustment is recorded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentKind {
    CycleCount,
    Receipt,
    Correction,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::CycleCount => "cycle_count",
            AdjustmentKind::Receipt => "receipt",
            AdjustmentKind::Correction => "correction",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cycle_count" => Some(AdjustmentKind::CycleCount),
            "receipt" => Some(AdjustmentKind::Receipt),
            "correction" => Some(AdjustmentKind::Correction),
            _ => None,
        }
    }
}

/// Audit record of one manual on-hand adjustment.
///
/// Applying an adjustment always produces exactly one ledger row and one
/// stock item update, inside the same transaction that inserts this record.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_adjustments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub warehouse_id: Uuid,
    pub variant_id: Uuid,
    pub qty_delta: i32,
    pub kind: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
