//! # Reseller Repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use stockroom_core::validation::validate_name;
use stockroom_core::{NewReseller, Reseller};
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;

#[derive(sqlx::FromRow)]
struct ResellerRow {
    id: String,
    name: String,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ResellerRow> for Reseller {
    fn from(row: ResellerRow) -> Self {
        Reseller {
            id: row.id,
            name: row.name,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

/// Blank optional fields are stored as NULL.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Repository for resellers.
#[derive(Debug, Clone)]
pub struct ResellerRepository {
    pool: SqlitePool,
}

impl ResellerRepository {
    /// Creates a new ResellerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ResellerRepository { pool }
    }

    /// Adds a reseller. Only the name is required.
    pub async fn create(&self, reseller: &NewReseller) -> DbResult<Reseller> {
        validate_name("name", &reseller.name)?;

        let created = Reseller {
            id: Uuid::new_v4().to_string(),
            name: reseller.name.trim().to_string(),
            phone: non_blank(reseller.phone.as_deref()).map(str::to_string),
            address: non_blank(reseller.address.as_deref()).map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO resellers (id, name, phone, address, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&created.id)
        .bind(&created.name)
        .bind(created.phone.as_deref())
        .bind(created.address.as_deref())
        .bind(created.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %created.id, name = %created.name, "Reseller created");
        Ok(created)
    }

    /// Lists resellers by name.
    pub async fn list(&self) -> DbResult<Vec<Reseller>> {
        let rows: Vec<ResellerRow> = sqlx::query_as(
            "SELECT id, name, phone, address, created_at FROM resellers ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Reseller::from).collect())
    }

    /// Gets a reseller by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reseller>> {
        let row: Option<ResellerRow> = sqlx::query_as(
            "SELECT id, name, phone, address, created_at FROM resellers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Reseller::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::CoreError;

    #[tokio::test]
    async fn test_create_list_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.resellers();

        let sari = repo
            .create(&NewReseller {
                name: "  Sari ".to_string(),
                phone: Some("0812".to_string()),
                address: Some("   ".to_string()),
            })
            .await
            .unwrap();
        repo.create(&NewReseller {
            name: "andi".to_string(),
            phone: None,
            address: None,
        })
        .await
        .unwrap();

        assert_eq!(sari.name, "Sari");
        assert_eq!(sari.address, None);

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["andi".to_string(), "Sari".to_string()]);

        assert_eq!(repo.get_by_id(&sari.id).await.unwrap(), Some(sari));
    }

    #[tokio::test]
    async fn test_name_required() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .resellers()
            .create(&NewReseller {
                name: " ".to_string(),
                phone: None,
                address: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
