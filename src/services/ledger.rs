//! Ledger query service.
//!
//! Read-only pagination over the append-only ledger; the write path lives
//! inside the mutating commands.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::stock_ledger::{self, Entity as StockLedger, LedgerReason};
use crate::errors::ServiceError;

/// Optional filters for ledger listings. All present filters are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerFilter {
    pub variant_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub reason: Option<LedgerReason>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Ledger entry shaped for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntrySummary {
    pub id: Uuid,
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

impl From<stock_ledger::Model> for LedgerEntrySummary {
    fn from(model: stock_ledger::Model) -> Self {
        Self {
            id: model.id,
            variant_id: model.variant_id,
            warehouse_id: model.warehouse_id,
            qty_delta: model.qty_delta,
            reason: model.reason,
            order_line_id: model.order_line_id,
            transfer_id: model.transfer_id,
            note: model.note,
            snapshot_available: model.snapshot_available,
            created_at: model.created_at,
        }
    }
}

/// Service for reading the stock ledger.
#[derive(Clone)]
pub struct LedgerQueryService {
    db_pool: Arc<DbPool>,
}

impl LedgerQueryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists ledger entries newest first, with pagination and optional filters.
    #[instrument(skip(self, filter))]
    pub async fn list_ledger(
        &self,
        tenant_id: Uuid,
        filter: LedgerFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<LedgerEntrySummary>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();

        let mut query =
            StockLedger::find().filter(stock_ledger::Column::TenantId.eq(tenant_id));

        if let Some(variant_id) = filter.variant_id {
            query = query.filter(stock_ledger::Column::VariantId.eq(variant_id));
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(stock_ledger::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(reason) = filter.reason {
            query = query.filter(stock_ledger::Column::Reason.eq(reason.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(stock_ledger::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(stock_ledger::Column::CreatedAt.lte(to));
        }

        query = query.order_by_desc(stock_ledger::Column::CreatedAt);

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            ServiceError::InternalError(format!("Failed to count ledger entries: {}", e))
        })?;

        let models = paginator.fetch_page(page - 1).await.map_err(|e| {
            ServiceError::InternalError(format!("Failed to fetch ledger page: {}", e))
        })?;

        let summaries = models.into_iter().map(LedgerEntrySummary::from).collect();

        Ok((summaries, total))
    }

    /// Lists all ledger entries for one order line, oldest first, for tracing
    /// a line's reserve/release/consume history.
    #[instrument(skip(self))]
    pub async fn history_for_order_line(
        &self,
        tenant_id: Uuid,
        order_line_id: Uuid,
    ) -> Result<Vec<LedgerEntrySummary>, ServiceError> {
        let entries = StockLedger::find()
            .filter(stock_ledger::Column::TenantId.eq(tenant_id))
            .filter(stock_ledger::Column::OrderLineId.eq(order_line_id))
            .order_by_asc(stock_ledger::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(entries.into_iter().map(LedgerEntrySummary::from).collect())
    }
}
