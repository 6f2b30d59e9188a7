//! Warehouse registry.
//!
//! Warehouses are operator-managed and rarely change. They are never deleted
//! while referenced stock exists; decommissioning is a soft deactivation.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::warehouse::{self, Entity as Warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Service for managing warehouses.
#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a warehouse for a tenant, optionally linked to a store.
    #[instrument(skip(self))]
    pub async fn create_warehouse(
        &self,
        tenant_id: Uuid,
        name: &str,
        store_id: Option<Uuid>,
    ) -> Result<warehouse::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Warehouse name cannot be empty".to_string(),
            ));
        }

        let model = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(name.trim().to_string()),
            store_id: Set(store_id),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model
            .insert(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send(Event::WarehouseCreated {
                tenant_id,
                warehouse_id: created.id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(warehouse_id = %created.id, name = %created.name, "Warehouse created");

        Ok(created)
    }

    /// Fetches one warehouse scoped to its tenant.
    #[instrument(skip(self))]
    pub async fn get_warehouse(
        &self,
        tenant_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<warehouse::Model, ServiceError> {
        Warehouse::find_by_id(warehouse_id)
            .filter(warehouse::Column::TenantId.eq(tenant_id))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id)))
    }

    /// Lists a tenant's warehouses by name.
    #[instrument(skip(self))]
    pub async fn list_warehouses(
        &self,
        tenant_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<warehouse::Model>, ServiceError> {
        let mut query = Warehouse::find().filter(warehouse::Column::TenantId.eq(tenant_id));

        if !include_inactive {
            query = query.filter(warehouse::Column::IsActive.eq(true));
        }

        query
            .order_by_asc(warehouse::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Soft-deactivates a warehouse so allocation planning stops proposing it.
    /// Existing stock and reservations remain untouched and auditable.
    #[instrument(skip(self))]
    pub async fn deactivate_warehouse(
        &self,
        tenant_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<warehouse::Model, ServiceError> {
        let existing = self.get_warehouse(tenant_id, warehouse_id).await?;

        let mut active: warehouse::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(warehouse_id = %warehouse_id, "Warehouse deactivated");

        Ok(updated)
    }
}
