//! # Receipt Settings Context
//!
//! Caches the receipt header/layout settings. The first read loads them from
//! the `settings` table (defaults when absent); saves write through.

use std::sync::Arc;

use stockroom_core::validation::validate_name;
use stockroom_core::{ReceiptSettings, RECEIPT_SETTINGS_KEY};
use stockroom_db::Database;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct ReceiptSettingsContext {
    db: Database,
    cache: Arc<RwLock<Option<ReceiptSettings>>>,
}

impl ReceiptSettingsContext {
    pub fn new(db: Database) -> Self {
        ReceiptSettingsContext {
            db,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the cached settings, loading them on first use.
    pub async fn get(&self) -> AppResult<ReceiptSettings> {
        if let Some(settings) = self.cache.read().await.as_ref() {
            return Ok(settings.clone());
        }
        self.reload().await
    }

    /// Reads the settings from the database, replacing the cache.
    pub async fn reload(&self) -> AppResult<ReceiptSettings> {
        let stored: Option<ReceiptSettings> =
            self.db.settings().get_setting(RECEIPT_SETTINGS_KEY).await?;
        if stored.is_none() {
            debug!("No receipt settings stored, using defaults");
        }
        let settings = stored.unwrap_or_default();

        *self.cache.write().await = Some(settings.clone());
        Ok(settings)
    }

    /// Persists `settings` and updates the cache.
    pub async fn save(&self, settings: ReceiptSettings) -> AppResult<()> {
        validate_name("shop name", &settings.shop_name)?;

        self.db
            .settings()
            .save_setting(RECEIPT_SETTINGS_KEY, &settings)
            .await?;
        info!(shop_name = %settings.shop_name, "Receipt settings saved");

        *self.cache.write().await = Some(settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use stockroom_core::PaperSize;
    use stockroom_db::DbConfig;

    async fn context() -> ReceiptSettingsContext {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        ReceiptSettingsContext::new(db)
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_stored() {
        let ctx = context().await;
        assert_eq!(ctx.get().await.unwrap(), ReceiptSettings::default());
    }

    #[tokio::test]
    async fn test_save_writes_through() {
        let ctx = context().await;
        let settings = ReceiptSettings {
            shop_name: "Toko Maju".to_string(),
            paper_size: PaperSize::Mm58,
            ..ReceiptSettings::default()
        };
        ctx.save(settings.clone()).await.unwrap();
        assert_eq!(ctx.get().await.unwrap(), settings);

        // A fresh context sees what was persisted.
        let other = ReceiptSettingsContext::new(ctx.db.clone());
        assert_eq!(other.get().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_blank_shop_name_is_rejected() {
        let ctx = context().await;
        let settings = ReceiptSettings {
            shop_name: "  ".to_string(),
            ..ReceiptSettings::default()
        };
        let err = ctx.save(settings).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(ctx.get().await.unwrap(), ReceiptSettings::default());
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_writes() {
        let ctx = context().await;
        assert_eq!(ctx.get().await.unwrap().shop_name, "Toko Saya");

        let mut changed = ReceiptSettings::default();
        changed.cashier_name = "Dewi".to_string();
        ctx.db
            .settings()
            .save_setting(RECEIPT_SETTINGS_KEY, &changed)
            .await
            .unwrap();

        assert_eq!(ctx.get().await.unwrap().cashier_name, "Kasir");
        assert_eq!(ctx.reload().await.unwrap().cashier_name, "Dewi");
    }
}
