//! # Shipping Receipt Repository
//!
//! Scanned AWB labels and the return reconciliation that closes them.
//!
//! ## Status Flow
//! ```text
//! create() ──► "Perlu Diproses" ──► reconcile_return() ──► "reconciled"
//!                                    (stock credits + flip, one transaction)
//!
//! Any other status string is stored and returned verbatim.
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::returns::ReturnList;
use stockroom_core::stock::{plan_adjustment, return_reason};
use stockroom_core::validation::{validate_awb, validate_name, validate_reason};
use stockroom_core::{
    CoreError, NewShippingReceipt, ReceiptStatus, SaleChannel, ShippingReceipt, ValidationError,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger;

#[derive(sqlx::FromRow)]
struct ReceiptRow {
    id: String,
    awb: String,
    channel: String,
    date: NaiveDate,
    status: String,
    receipt_number: String,
    created_at: DateTime<Utc>,
}

impl ReceiptRow {
    fn into_receipt(self) -> DbResult<ShippingReceipt> {
        let channel: SaleChannel = self
            .channel
            .parse()
            .map_err(|_| DbError::Internal(format!("receipt {} has unknown channel", self.id)))?;

        Ok(ShippingReceipt {
            id: self.id,
            awb: self.awb,
            channel,
            date: self.date,
            status: ReceiptStatus::from(self.status),
            receipt_number: self.receipt_number,
            created_at: self.created_at,
        })
    }
}

const RECEIPT_COLUMNS: &str = "id, awb, channel, date, status, receipt_number, created_at";

async fn fetch_receipt(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<ShippingReceipt>> {
    let row: Option<ReceiptRow> = sqlx::query_as(&format!(
        "SELECT {} FROM shipping_receipts WHERE id = ?1",
        RECEIPT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(ReceiptRow::into_receipt).transpose()
}

/// Repository for shipping receipts.
#[derive(Debug, Clone)]
pub struct ShippingReceiptRepository {
    pool: SqlitePool,
}

impl ShippingReceiptRepository {
    /// Creates a new ShippingReceiptRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShippingReceiptRepository { pool }
    }

    /// Records a scanned receipt with status "Perlu Diproses".
    ///
    /// A second receipt with the same AWB fails with a uniqueness violation
    /// and writes nothing.
    pub async fn create(&self, receipt: &NewShippingReceipt) -> DbResult<ShippingReceipt> {
        let awb = receipt.awb.trim();
        validate_awb(awb)?;
        validate_name("receipt number", &receipt.receipt_number)?;

        let created = ShippingReceipt {
            id: Uuid::new_v4().to_string(),
            awb: awb.to_string(),
            channel: receipt.channel,
            date: receipt.date,
            status: ReceiptStatus::NeedsProcessing,
            receipt_number: receipt.receipt_number.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(awb = %awb, channel = %created.channel, "Creating shipping receipt");

        sqlx::query(
            r#"
            INSERT INTO shipping_receipts (id, awb, channel, date, status, receipt_number, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&created.id)
        .bind(&created.awb)
        .bind(created.channel.as_str())
        .bind(created.date)
        .bind(created.status.as_str())
        .bind(&created.receipt_number)
        .bind(created.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = DbError::from(e).with_duplicate_value("awb", awb);
            if err.is_unique_violation() {
                warn!(awb = %awb, "Duplicate AWB rejected");
            }
            err
        })?;

        info!(id = %created.id, awb = %awb, "Shipping receipt created");
        Ok(created)
    }

    /// Gets a receipt by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ShippingReceipt>> {
        let mut conn = self.pool.acquire().await?;
        fetch_receipt(&mut *conn, id).await
    }

    /// Gets a receipt by AWB.
    pub async fn get_by_awb(&self, awb: &str) -> DbResult<Option<ShippingReceipt>> {
        let row: Option<ReceiptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM shipping_receipts WHERE awb = ?1",
            RECEIPT_COLUMNS
        ))
        .bind(awb.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReceiptRow::into_receipt).transpose()
    }

    /// Lists receipts for one shipping date, in scan order.
    pub async fn list_by_date(&self, date: NaiveDate) -> DbResult<Vec<ShippingReceipt>> {
        let rows: Vec<ReceiptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM shipping_receipts WHERE date = ?1 ORDER BY created_at, id",
            RECEIPT_COLUMNS
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReceiptRow::into_receipt).collect()
    }

    /// Overwrites the status string. Stock is not touched.
    pub async fn set_status(&self, id: &str, status: &ReceiptStatus) -> DbResult<ShippingReceipt> {
        if status.as_str().trim().is_empty() {
            return Err(ValidationError::required("status").into());
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE shipping_receipts SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ReceiptNotFound(id.to_string()).into());
        }

        let receipt = fetch_receipt(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::ReceiptNotFound(id.to_string()))?;

        tx.commit().await?;

        info!(id = %id, status = %status, "Receipt status updated");
        Ok(receipt)
    }

    /// Credits every line of `returns` back to stock and marks the receipt
    /// reconciled, in one transaction.
    ///
    /// `reason` defaults to a message naming the AWB. A receipt that is
    /// already reconciled is rejected before any stock moves.
    pub async fn reconcile_return(
        &self,
        receipt_id: &str,
        returns: &ReturnList,
        reason: Option<&str>,
    ) -> DbResult<ShippingReceipt> {
        if returns.is_empty() {
            return Err(ValidationError::required("return items").into());
        }
        if let Some(reason) = reason {
            validate_reason(reason)?;
        }

        debug!(
            receipt_id = %receipt_id,
            lines = returns.lines().len(),
            units = returns.total_units(),
            "Reconciling return"
        );

        let mut tx = self.pool.begin().await?;

        let receipt = fetch_receipt(&mut *tx, receipt_id)
            .await?
            .ok_or_else(|| CoreError::ReceiptNotFound(receipt_id.to_string()))?;

        if receipt.status == ReceiptStatus::Reconciled {
            warn!(receipt_id = %receipt_id, awb = %receipt.awb, "Receipt already reconciled");
            return Err(CoreError::ReceiptAlreadyReconciled(receipt.awb).into());
        }

        let reason = reason
            .map(str::to_string)
            .unwrap_or_else(|| return_reason(&receipt.awb));
        let now = Utc::now();

        for line in returns.lines() {
            let found = ledger::resolve_sku(&mut *tx, &line.sku).await?;
            let plan = plan_adjustment(found.stock, line.quantity)?;
            ledger::apply_plan(&mut *tx, &found.target, &plan, &reason, now).await?;
        }

        sqlx::query("UPDATE shipping_receipts SET status = ?1 WHERE id = ?2")
            .bind(ReceiptStatus::Reconciled.as_str())
            .bind(receipt_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            receipt_id = %receipt_id,
            awb = %receipt.awb,
            units = returns.total_units(),
            "Return reconciled"
        );

        Ok(ShippingReceipt {
            status: ReceiptStatus::Reconciled,
            ..receipt
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::{Money, NewProduct, NewStockLayout};

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (name, sku, stock) in [("Topi", "TOPI", 3), ("Tas", "TAS", 0)] {
            db.inventory()
                .add_product(&NewProduct {
                    name: name.to_string(),
                    category: "Aksesoris".to_string(),
                    sku: Some(sku.to_string()),
                    image_url: None,
                    size: None,
                    layout: NewStockLayout::Simple {
                        stock,
                        price: Money::from_minor(40_000),
                    },
                })
                .await
                .unwrap();
        }
        db
    }

    fn new_receipt(awb: &str) -> NewShippingReceipt {
        NewShippingReceipt {
            awb: awb.to_string(),
            channel: SaleChannel::Shopee,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            receipt_number: "INV-001".to_string(),
        }
    }

    async fn stock_of(db: &Database, sku: &str) -> i64 {
        db.inventory()
            .find_product_by_sku(sku)
            .await
            .unwrap()
            .unwrap()
            .total_stock()
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = test_db().await;
        let receipts = db.receipts();

        let created = receipts.create(&new_receipt("JP123")).await.unwrap();
        assert_eq!(created.status, ReceiptStatus::NeedsProcessing);

        let by_awb = receipts.get_by_awb("JP123").await.unwrap().unwrap();
        assert_eq!(by_awb, created);
        assert_eq!(receipts.get_by_id(&created.id).await.unwrap(), Some(created));

        let listed = receipts
            .list_by_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_awb_creates_no_row() {
        let db = test_db().await;
        let receipts = db.receipts();
        receipts.create(&new_receipt("JP123")).await.unwrap();

        let err = receipts.create(&new_receipt("JP123")).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(err.to_string(), "Duplicate awb: 'JP123' already exists");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shipping_receipts")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_unknown_status_passes_through() {
        let db = test_db().await;
        let receipts = db.receipts();
        let created = receipts.create(&new_receipt("JP9")).await.unwrap();

        let status = ReceiptStatus::from("Dikirim".to_string());
        let updated = receipts.set_status(&created.id, &status).await.unwrap();
        assert_eq!(updated.status.as_str(), "Dikirim");

        let err = receipts.set_status("missing", &status).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ReceiptNotFound(_))));
    }

    #[tokio::test]
    async fn test_reconcile_credits_stock_and_flips_status() {
        let db = test_db().await;
        let receipts = db.receipts();
        let receipt = receipts.create(&new_receipt("JP1")).await.unwrap();

        let mut returns = ReturnList::new();
        returns.scan("TOPI").unwrap();
        returns.scan("TOPI").unwrap();
        returns.scan("TAS").unwrap();

        let reconciled = receipts
            .reconcile_return(&receipt.id, &returns, None)
            .await
            .unwrap();
        assert_eq!(reconciled.status, ReceiptStatus::Reconciled);
        assert_eq!(stock_of(&db, "TOPI").await, 5);
        assert_eq!(stock_of(&db, "TAS").await, 1);

        let err = receipts
            .reconcile_return(&receipt.id, &returns, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ReceiptAlreadyReconciled(_))
        ));
        assert_eq!(stock_of(&db, "TOPI").await, 5);
    }

    #[tokio::test]
    async fn test_failed_reconcile_moves_no_stock() {
        let db = test_db().await;
        let receipts = db.receipts();
        let receipt = receipts.create(&new_receipt("JP2")).await.unwrap();

        let mut returns = ReturnList::new();
        returns.add("TOPI", 2).unwrap();
        returns.add("GHOST", 1).unwrap();

        let err = receipts
            .reconcile_return(&receipt.id, &returns, Some("retur pembeli"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SkuNotFound(_))));

        assert_eq!(stock_of(&db, "TOPI").await, 3);
        let receipt = receipts.get_by_id(&receipt.id).await.unwrap().unwrap();
        assert_eq!(receipt.status, ReceiptStatus::NeedsProcessing);
    }

    #[tokio::test]
    async fn test_empty_return_rejected() {
        let db = test_db().await;
        let receipt = db.receipts().create(&new_receipt("JP3")).await.unwrap();
        let err = db
            .receipts()
            .reconcile_return(&receipt.id, &ReturnList::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
