//! Stock reads and writes shared by every repository that moves stock.
//!
//! All functions take a `&mut SqliteConnection` so callers can run them on
//! an open transaction (`&mut *tx`). A stock column is never written without
//! the matching `stock_history` row in the same call.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use stockroom_core::stock::AdjustmentPlan;
use stockroom_core::{AdjustmentHistory, CoreError, Money, StockTarget};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// A stock-bearing entity found by SKU, with the fields a sale snapshots.
#[derive(Debug, Clone)]
pub(crate) struct SkuMatch {
    pub target: StockTarget,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub price: Money,
    pub stock: i64,
}

#[derive(sqlx::FromRow)]
struct VariantSkuRow {
    id: String,
    product_id: String,
    name: String,
    price: i64,
    stock: i64,
    product_name: String,
}

#[derive(sqlx::FromRow)]
struct ProductSkuRow {
    id: String,
    name: String,
    has_variants: bool,
    stock: Option<i64>,
    price: Option<i64>,
}

/// Resolves `sku` to the entity that carries it.
///
/// A parent SKU of an item with variants is found but cannot hold stock, so
/// it yields [`CoreError::StockOnVariants`].
pub(crate) async fn resolve_sku(conn: &mut SqliteConnection, sku: &str) -> DbResult<SkuMatch> {
    let sku = sku.trim();
    let variant: Option<VariantSkuRow> = sqlx::query_as(
        r#"
        SELECT v.id, v.product_id, v.name, v.price, v.stock, p.name AS product_name
        FROM product_variants v
        JOIN products p ON p.id = v.product_id
        WHERE v.sku = ?1
        "#,
    )
    .bind(sku)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = variant {
        return Ok(SkuMatch {
            target: StockTarget::Variant {
                product_id: row.product_id,
                variant_id: row.id,
            },
            product_name: row.product_name,
            variant_name: Some(row.name),
            price: Money::from_minor(row.price),
            stock: row.stock,
        });
    }

    let product: Option<ProductSkuRow> = sqlx::query_as(
        "SELECT id, name, has_variants, stock, price FROM products WHERE sku = ?1",
    )
    .bind(sku)
    .fetch_optional(&mut *conn)
    .await?;

    match product {
        None => Err(CoreError::SkuNotFound(sku.to_string()).into()),
        Some(row) if row.has_variants => Err(CoreError::StockOnVariants(row.id).into()),
        Some(row) => Ok(SkuMatch {
            target: StockTarget::Product(row.id),
            product_name: row.name,
            variant_name: None,
            price: Money::from_minor(row.price.unwrap_or_default()),
            stock: row.stock.unwrap_or_default(),
        }),
    }
}

/// Resolves an id that may name either a variant or a simple product.
pub(crate) async fn resolve_id(conn: &mut SqliteConnection, id: &str) -> DbResult<StockTarget> {
    let owner: Option<String> =
        sqlx::query_scalar("SELECT product_id FROM product_variants WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(match owner {
        Some(product_id) => StockTarget::Variant {
            product_id,
            variant_id: id.to_string(),
        },
        None => StockTarget::Product(id.to_string()),
    })
}

/// Reads the current stock of `target`.
pub(crate) async fn current_stock(
    conn: &mut SqliteConnection,
    target: &StockTarget,
) -> DbResult<i64> {
    match target {
        StockTarget::Product(id) => {
            let row: Option<(bool, Option<i64>)> =
                sqlx::query_as("SELECT has_variants, stock FROM products WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?;

            match row {
                None => Err(CoreError::ProductNotFound(id.clone()).into()),
                Some((true, _)) => Err(CoreError::StockOnVariants(id.clone()).into()),
                Some((false, stock)) => Ok(stock.unwrap_or_default()),
            }
        }
        StockTarget::Variant {
            product_id,
            variant_id,
        } => {
            let stock: Option<i64> = sqlx::query_scalar(
                "SELECT stock FROM product_variants WHERE id = ?1 AND product_id = ?2",
            )
            .bind(variant_id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

            stock.ok_or_else(|| CoreError::VariantNotFound(variant_id.clone()).into())
        }
    }
}

/// Writes `plan` to the stock column and appends its history row.
///
/// The update only matches while stock still equals `plan.previous_stock`;
/// a concurrent writer makes it fail instead of silently losing a change.
pub(crate) async fn apply_plan(
    conn: &mut SqliteConnection,
    target: &StockTarget,
    plan: &AdjustmentPlan,
    reason: &str,
    now: DateTime<Utc>,
) -> DbResult<AdjustmentHistory> {
    let updated = match target {
        StockTarget::Product(id) => {
            sqlx::query(
                "UPDATE products SET stock = ?1, updated_at = ?2 WHERE id = ?3 AND stock = ?4",
            )
            .bind(plan.new_stock_level)
            .bind(now)
            .bind(id)
            .bind(plan.previous_stock)
            .execute(&mut *conn)
            .await?
        }
        StockTarget::Variant {
            product_id,
            variant_id,
        } => {
            let result = sqlx::query(
                "UPDATE product_variants SET stock = ?1 WHERE id = ?2 AND product_id = ?3 AND stock = ?4",
            )
            .bind(plan.new_stock_level)
            .bind(variant_id)
            .bind(product_id)
            .bind(plan.previous_stock)
            .execute(&mut *conn)
            .await?;

            sqlx::query("UPDATE products SET updated_at = ?1 WHERE id = ?2")
                .bind(now)
                .bind(product_id)
                .execute(&mut *conn)
                .await?;

            result
        }
    };

    if updated.rows_affected() != 1 {
        return Err(DbError::QueryFailed(format!(
            "stock of {} changed concurrently",
            target.variant_id().unwrap_or(target.product_id())
        )));
    }

    let entry = plan.history_entry(reason, now);

    sqlx::query(
        r#"
        INSERT INTO stock_history (product_id, variant_id, change, reason, new_stock_level, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(target.product_id())
    .bind(target.variant_id())
    .bind(entry.change)
    .bind(&entry.reason)
    .bind(entry.new_stock_level)
    .bind(entry.date)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = %target.product_id(),
        variant_id = ?target.variant_id(),
        change = entry.change,
        new_stock_level = entry.new_stock_level,
        "Stock updated"
    );

    Ok(entry)
}

/// Returns true if `sku` is carried by any product or variant other than
/// `exclude_id`.
pub(crate) async fn sku_in_use(
    conn: &mut SqliteConnection,
    sku: &str,
    exclude_id: Option<&str>,
) -> DbResult<bool> {
    let exclude = exclude_id.unwrap_or("");
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT (SELECT COUNT(*) FROM products WHERE sku = ?1 AND id <> ?2)
             + (SELECT COUNT(*) FROM product_variants WHERE sku = ?1 AND id <> ?2)
        "#,
    )
    .bind(sku)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count > 0)
}

/// Fails with a duplicate error if `sku` is already taken.
pub(crate) async fn ensure_sku_free(
    conn: &mut SqliteConnection,
    sku: Option<&str>,
    exclude_id: Option<&str>,
) -> DbResult<()> {
    let Some(sku) = sku else {
        return Ok(());
    };

    if sku_in_use(conn, sku, exclude_id).await? {
        return Err(DbError::duplicate("sku", sku));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::stock::plan_adjustment;
    use stockroom_core::{NewProduct, NewStockLayout};

    async fn db_with_item(sku: &str, stock: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db
            .inventory()
            .add_product(&NewProduct {
                name: "Topi".to_string(),
                category: "Aksesoris".to_string(),
                sku: Some(sku.to_string()),
                image_url: None,
                size: None,
                layout: NewStockLayout::Simple {
                    stock,
                    price: Money::from_minor(45_000),
                },
            })
            .await
            .unwrap();
        (db, item.id)
    }

    #[tokio::test]
    async fn test_resolve_sku_ignores_surrounding_whitespace() {
        let (db, id) = db_with_item("TOPI", 4).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let found = resolve_sku(&mut *conn, "  TOPI ").await.unwrap();
        assert_eq!(found.target, StockTarget::Product(id));
        assert_eq!(found.stock, 4);
    }

    #[tokio::test]
    async fn test_stale_plan_is_rejected_without_history() {
        let (db, id) = db_with_item("TOPI", 10).await;
        let target = StockTarget::Product(id.clone());

        // Planned against 9, but the row holds 10.
        let stale = plan_adjustment(9, 1).unwrap();
        {
            let mut tx = db.pool().begin().await.unwrap();
            let err = apply_plan(&mut *tx, &target, &stale, "restock", Utc::now())
                .await
                .unwrap_err();
            assert!(matches!(err, DbError::QueryFailed(_)));
            tx.rollback().await.unwrap();
        }

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(current_stock(&mut *conn, &target).await.unwrap(), 10);
        let history: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_history")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(history, 0);
    }
}
