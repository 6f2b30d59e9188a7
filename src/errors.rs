use sea_orm::error::DbErr;
use serde::Serialize;

/// Error taxonomy for the stock engine.
///
/// Mutating operations are all-or-nothing: when any variant below is returned,
/// no stock row, reservation, or ledger entry has been left partially applied.
/// Callers own user-facing messaging; these are structured kinds, not prose.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Whether the caller may safely retry the whole operation.
    ///
    /// Lock-wait timeouts and dropped connections surface through the driver
    /// as `DatabaseError`; every mutating operation is atomic, so replaying it
    /// cannot double-apply.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::DatabaseError(DbErr::ConnectionAcquire(_))
                | ServiceError::DatabaseError(DbErr::Conn(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_error_normalizes_strings() {
        let err = ServiceError::db_error("lock wait timeout");
        assert!(matches!(err, ServiceError::DatabaseError(DbErr::Custom(_))));
    }

    #[test]
    fn validation_errors_convert() {
        let errors = validator::ValidationErrors::new();
        let err: ServiceError = errors.into();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
