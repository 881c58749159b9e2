//! # stockroom-app: Application Layer for Stockroom
//!
//! Wires configuration, logging and the database into the state objects a
//! presentation layer (desktop shell, web view, CLI) works against.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stockroom Startup                                    │
//! │                                                                         │
//! │  1. AppConfig::load ───────► stockroom.toml + STOCKROOM_* overrides    │
//! │                                                                         │
//! │  2. init_tracing ──────────► EnvFilter (RUST_LOG or config filter)     │
//! │                                                                         │
//! │  3. AppState::open                                                     │
//! │     • create data directory                                            │
//! │     • Database::new (WAL, foreign keys, migrations)                    │
//! │     • InventoryContext (store offset, low-stock threshold)             │
//! │     • ReceiptSettingsContext                                           │
//! │     • first fetch_items()                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod context;
pub mod error;

pub use config::{AppConfig, ConfigError, DEFAULT_LOG_FILTER};
pub use context::{InventoryContext, InventorySnapshot, ReceiptSettingsContext};
pub use error::{AppError, AppResult, ErrorCode};

use stockroom_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockroom_db=trace` - Trace the database layer only
/// - Otherwise `default_filter` (see [`DEFAULT_LOG_FILTER`])
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Everything a running store needs, opened from one [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub inventory: InventoryContext,
    pub receipt_settings: ReceiptSettingsContext,
}

impl AppState {
    /// Opens the database named by `config` and loads the inventory.
    ///
    /// A failed first load is not fatal; it shows up in the snapshot's
    /// `last_error`.
    pub async fn open(config: AppConfig) -> AppResult<Self> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::internal(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
        info!(?db_path, "Database path determined");

        let db = Database::new(
            DbConfig::new(&db_path).max_connections(config.database.max_connections),
        )
        .await?;
        info!("Database connected and migrations applied");

        let inventory = InventoryContext::new(db.clone())
            .with_utc_offset(config.store.utc_offset()?)
            .with_low_stock_threshold(config.store.low_stock_threshold);
        let receipt_settings = ReceiptSettingsContext::new(db.clone());

        // Failure is recorded in the snapshot.
        let _ = inventory.fetch_items().await;

        Ok(AppState {
            config,
            db,
            inventory,
            receipt_settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_database_in_nested_directory() {
        let dir = std::env::temp_dir().join(format!("stockroom-{}", uuid::Uuid::new_v4()));
        let mut config = AppConfig::default();
        config.database.path = Some(dir.join("data").join("stockroom.db"));

        let state = AppState::open(config).await.unwrap();
        assert!(state.db.health_check().await);

        let snapshot = state.inventory.snapshot().await;
        assert!(snapshot.items.is_empty());
        assert!(snapshot.last_error.is_none());
        assert_eq!(state.receipt_settings.get().await.unwrap().shop_name, "Toko Saya");

        state.db.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
