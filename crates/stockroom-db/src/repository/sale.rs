//! # Sale Repository
//!
//! Database operations for sales and cancellations.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. PERFORM                                                            │
//! │     └── perform_sale() → Sale { status: Completed }                    │
//! │         one transaction: resolve SKU, stock -= qty, history row,       │
//! │         sale row with price/name snapshot                              │
//! │                                                                         │
//! │  2. (OPTIONAL) REVERT                                                  │
//! │     └── revert_sale() → Sale { status: Cancelled }                     │
//! │         one transaction: flag guarded by status = 'completed',         │
//! │         stock += qty, history row                                      │
//! │         a second revert fails with SaleAlreadyCancelled                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::stock::{cancellation_reason, plan_adjustment, plan_sale, sale_reason};
use stockroom_core::validation::{validate_quantity, validate_sku};
use stockroom_core::{CoreError, Money, Sale, SaleChannel, SaleStatus};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger;

#[derive(sqlx::FromRow)]
struct SaleRow {
    id: String,
    product_id: String,
    variant_id: Option<String>,
    channel: String,
    quantity: i64,
    price_at_sale: i64,
    sale_date: DateTime<Utc>,
    product_name: String,
    variant_name: Option<String>,
    sku: String,
    status: String,
    reseller_id: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl SaleRow {
    fn into_sale(self) -> DbResult<Sale> {
        let channel: SaleChannel = self
            .channel
            .parse()
            .map_err(|_| DbError::Internal(format!("sale {} has unknown channel", self.id)))?;
        let status: SaleStatus = self
            .status
            .parse()
            .map_err(|_| DbError::Internal(format!("sale {} has unknown status", self.id)))?;

        Ok(Sale {
            id: self.id,
            product_id: self.product_id,
            variant_id: self.variant_id,
            channel,
            quantity: self.quantity,
            price_at_sale: Money::from_minor(self.price_at_sale),
            sale_date: self.sale_date,
            product_name: self.product_name,
            variant_name: self.variant_name,
            sku: self.sku,
            status,
            reseller_id: self.reseller_id,
            cancelled_at: self.cancelled_at,
        })
    }
}

const SALE_COLUMNS: &str = "id, product_id, variant_id, channel, quantity, price_at_sale, \
     sale_date, product_name, variant_name, sku, status, reseller_id, cancelled_at";

async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let row: Option<SaleRow> =
        sqlx::query_as(&format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(SaleRow::into_sale).transpose()
}

/// UTC bounds `[start, end)` of the local calendar day `date` at `offset`.
fn day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let start = Utc.from_utc_datetime(&local_midnight)
        - Duration::seconds(i64::from(offset.local_minus_utc()));
    (start, start + Duration::days(1))
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut *conn, id).await
    }

    /// Sells `quantity` units of `sku`.
    ///
    /// Fails with `InsufficientStock` rather than clamping; on any failure no
    /// stock moves and no sale is recorded.
    pub async fn perform_sale(
        &self,
        sku: &str,
        channel: SaleChannel,
        quantity: i64,
        reseller_id: Option<&str>,
    ) -> DbResult<Sale> {
        let sku = sku.trim();
        validate_sku(sku)?;
        validate_quantity(quantity)?;

        debug!(sku = %sku, channel = %channel, quantity, "Performing sale");

        let mut tx = self.pool.begin().await?;

        if let Some(reseller_id) = reseller_id {
            let known: Option<String> = sqlx::query_scalar("SELECT id FROM resellers WHERE id = ?1")
                .bind(reseller_id)
                .fetch_optional(&mut *tx)
                .await?;
            if known.is_none() {
                return Err(DbError::not_found("Reseller", reseller_id));
            }
        }

        let found = ledger::resolve_sku(&mut *tx, sku).await?;
        let plan = plan_sale(sku, found.stock, quantity)?;

        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            product_id: found.target.product_id().to_string(),
            variant_id: found.target.variant_id().map(str::to_string),
            channel,
            quantity,
            price_at_sale: found.price,
            sale_date: now,
            product_name: found.product_name,
            variant_name: found.variant_name,
            sku: sku.to_string(),
            status: SaleStatus::Completed,
            reseller_id: reseller_id.map(str::to_string),
            cancelled_at: None,
        };

        ledger::apply_plan(
            &mut *tx,
            &found.target,
            &plan,
            &sale_reason(channel, &sale.id),
            now,
        )
        .await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, product_id, variant_id, channel, quantity, price_at_sale,
                sale_date, product_name, variant_name, sku, status, reseller_id, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, NULL)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.product_id)
        .bind(sale.variant_id.as_deref())
        .bind(sale.channel.as_str())
        .bind(sale.quantity)
        .bind(sale.price_at_sale.minor())
        .bind(sale.sale_date)
        .bind(&sale.product_name)
        .bind(sale.variant_name.as_deref())
        .bind(&sale.sku)
        .bind(sale.status.as_str())
        .bind(sale.reseller_id.as_deref())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %sale.id,
            sku = %sale.sku,
            channel = %channel,
            quantity,
            new_stock_level = plan.new_stock_level,
            "Sale recorded"
        );

        Ok(sale)
    }

    /// Cancels a completed sale and credits its quantity back.
    ///
    /// The status flip is conditional on the row still being `completed`, so
    /// two concurrent reverts credit stock at most once.
    pub async fn revert_sale(&self, id: &str) -> DbResult<Sale> {
        debug!(id = %id, "Reverting sale");

        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        if sale.is_cancelled() {
            warn!(id = %id, "Sale already cancelled");
            return Err(CoreError::SaleAlreadyCancelled(id.to_string()).into());
        }

        let now = Utc::now();
        let flipped = sqlx::query(
            "UPDATE sales SET status = ?1, cancelled_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(SaleStatus::Cancelled.as_str())
        .bind(now)
        .bind(id)
        .bind(SaleStatus::Completed.as_str())
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() != 1 {
            return Err(CoreError::SaleAlreadyCancelled(id.to_string()).into());
        }

        let target = sale.stock_target();
        let current = ledger::current_stock(&mut *tx, &target).await?;
        let plan = plan_adjustment(current, sale.quantity)?;
        ledger::apply_plan(&mut *tx, &target, &plan, &cancellation_reason(id), now).await?;

        tx.commit().await?;

        info!(
            id = %id,
            quantity = sale.quantity,
            new_stock_level = plan.new_stock_level,
            "Sale cancelled"
        );

        Ok(Sale {
            status: SaleStatus::Cancelled,
            cancelled_at: Some(now),
            ..sale
        })
    }

    /// Completed sales made on the local calendar day `date`, optionally
    /// restricted to one channel, oldest first.
    pub async fn get_sales_by_date(
        &self,
        channel: Option<SaleChannel>,
        date: NaiveDate,
        utc_offset: FixedOffset,
    ) -> DbResult<Vec<Sale>> {
        let (start, end) = day_bounds(date, utc_offset);

        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM sales
            WHERE status = ?1
              AND (?2 IS NULL OR channel = ?2)
              AND sale_date >= ?3 AND sale_date < ?4
            ORDER BY sale_date, id
            "#,
            SALE_COLUMNS
        ))
        .bind(SaleStatus::Completed.as_str())
        .bind(channel.map(|c| c.as_str()))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(date = %date, channel = ?channel, count = rows.len(), "Sales by date");

        rows.into_iter().map(SaleRow::into_sale).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
