//! # Settings Repository
//!
//! Key-value store for small JSON documents (receipt settings and the like).

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for JSON settings keyed by name.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads and decodes the value stored under `key`. `None` if absent.
    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub async fn save_setting<T: Serialize + Sync>(&self, key: &str, value: &T) -> DbResult<()> {
        let json = serde_json::to_string(value)?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(key = %key, "Setting saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::{PaperSize, ReceiptSettings, RECEIPT_SETTINGS_KEY};

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let value: Option<ReceiptSettings> =
            db.settings().get_setting(RECEIPT_SETTINGS_KEY).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        let mut settings = ReceiptSettings::default();
        repo.save_setting(RECEIPT_SETTINGS_KEY, &settings).await.unwrap();

        settings.shop_name = "Toko Maju".to_string();
        settings.paper_size = PaperSize::Mm58;
        repo.save_setting(RECEIPT_SETTINGS_KEY, &settings).await.unwrap();

        let loaded: ReceiptSettings = repo
            .get_setting(RECEIPT_SETTINGS_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, settings);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_serialization_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();
        repo.save_setting("counter", &42).await.unwrap();

        let err = repo.get_setting::<ReceiptSettings>("counter").await.unwrap_err();
        assert!(matches!(err, DbError::Serialization(_)));
    }
}
