//! # Application Error Type
//!
//! Unified error type returned by every context operation.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockroom                              │
//! │                                                                         │
//! │  InventoryContext::record_sale                                         │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Validation Error? ── CoreError::Validation ─────────┐                  │
//! │         │                                            │                  │
//! │  Stock rule?  ─────── DbError::Domain(CoreError) ────┤                  │
//! │         │                                            ▼                  │
//! │  SQLite failure? ──── DbError::QueryFailed ──────► AppError { code,    │
//! │         │                                             message }        │
//! │  Success ─────────────────────────────────────────────────────────►    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Infrastructure failures are logged here with their detail and surfaced
//! with a generic message.

use serde::Serialize;
use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;

use crate::config::ConfigError;

/// Error returned to the presentation layer.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for KAOS-M: available 2, requested 3"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, variant, SKU, sale or receipt does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// SKU or AWB already taken
    Duplicate,

    /// Sale larger than stock on hand
    InsufficientStock,

    /// Stock rule or state transition rejected (negative stock,
    /// double cancellation, receipt already reconciled)
    BusinessLogic,

    /// Database operation failed
    DatabaseError,

    /// Configuration could not be loaded
    ConfigError,

    /// Internal error
    Internal,
}

impl AppError {
    /// Creates a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors.
impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => AppError::from(core),
            DbError::NotFound { entity, id } => AppError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => AppError::new(
                ErrorCode::Duplicate,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                AppError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored value could not be decoded: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Stored data is unreadable")
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => AppError::not_found("Product", &id),
            CoreError::VariantNotFound(id) => AppError::not_found("Variant", &id),
            CoreError::SkuNotFound(sku) => AppError::not_found("SKU", &sku),
            CoreError::SaleNotFound(id) => AppError::not_found("Sale", &id),
            CoreError::ReceiptNotFound(id) => AppError::not_found("Receipt", &id),
            CoreError::Validation(e) => AppError::from(e),
            err @ CoreError::InsufficientStock { .. } => {
                AppError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            err @ (CoreError::NegativeStock { .. }
            | CoreError::StockOnVariants(_)
            | CoreError::SaleAlreadyCancelled(_)
            | CoreError::ReceiptAlreadyReconciled(_)) => {
                AppError::new(ErrorCode::BusinessLogic, err.to_string())
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Duplicate { .. } => {
                AppError::new(ErrorCode::Duplicate, err.to_string())
            }
            other => AppError::validation(other.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// Result type for context operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_code() {
        let err: AppError = DbError::Domain(CoreError::InsufficientStock {
            sku: "KAOS-M".to_string(),
            available: 2,
            requested: 3,
        })
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err: AppError = DbError::Domain(CoreError::SaleAlreadyCancelled("s1".into())).into();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let err: AppError = CoreError::SkuNotFound("X".into()).into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "SKU not found: X");
    }

    #[test]
    fn test_duplicates_map_to_duplicate() {
        let err: AppError = DbError::duplicate("awb", "JP1").into();
        assert_eq!(err.code, ErrorCode::Duplicate);
        assert_eq!(err.message, "awb 'JP1' already exists");
    }

    #[test]
    fn test_infrastructure_detail_is_not_leaked() {
        let err: AppError = DbError::QueryFailed("no such table: sales".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_serializes_code_and_message() {
        let json = serde_json::to_value(AppError::validation("name is required")).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "name is required");
    }
}
