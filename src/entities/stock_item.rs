use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current quantity state for one (tenant, warehouse, variant) triple.
///
/// Created lazily the first time any engine touches the triple, via an
/// insert-on-conflict-do-nothing upsert followed by a locked re-select.
/// `qty_reserved` may exceed `qty_on_hand` only on a row carrying an explicit
/// backorder; everywhere else `0 <= qty_reserved <= qty_on_hand` holds.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub warehouse_id: Uuid,
    pub variant_id: Uuid,
    pub qty_on_hand: i32,
    pub qty_reserved: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// On-hand minus reserved. Negative while a backorder is outstanding.
    pub fn available(&self) -> i32 {
        self.qty_on_hand - self.qty_reserved
    }

    /// Quantity the allocation planner may still claim from this row.
    pub fn allocatable(&self) -> i32 {
        self.available().max(0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(on_hand: i32, reserved: i32) -> Model {
        Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            variant_id: Uuid::new_v4(),
            qty_on_hand: on_hand,
            qty_reserved: reserved,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn allocatable_floors_at_zero() {
        assert_eq!(item(10, 4).allocatable(), 6);
        assert_eq!(item(3, 8).allocatable(), 0);
        assert_eq!(item(3, 8).available(), -5);
    }
}
