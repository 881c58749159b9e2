//! # Inventory Repository
//!
//! Products, variants, categories and the stock audit trail.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products           has_variants = 0 → stock, price on the row         │
//! │     │               has_variants = 1 → stock, price are NULL           │
//! │     │                                                                   │
//! │     ├── product_variants (ordered by position)                         │
//! │     │                                                                   │
//! │     └── stock_history  (variant_id NULL for simple products)           │
//! │                                                                         │
//! │  load_items() reads the three tables and folds them into               │
//! │  InventoryItem { layout: StockLayout::Simple | StockLayout::Variants } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Editing descriptive fields never touches stock. Stock moves only through
//! [`InventoryRepository::adjust_stock`], [`InventoryRepository::edit_variants_bulk`]
//! and the sale and receipt repositories, all of which go through
//! [`ledger`](super::ledger).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::stock::{plan_adjustment, plan_recount};
use stockroom_core::validation::{
    validate_new_product, validate_product_update, validate_reason, validate_variant_updates,
};
use stockroom_core::{
    AdjustmentHistory, CoreError, InventoryData, InventoryItem, InventoryItemVariant, Money,
    NewProduct, NewStockLayout, ProductUpdate, StockLayout, StockTarget, ValidationError,
    VariantUpdate,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger;

// =============================================================================
// Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: String,
    sku: Option<String>,
    image_url: Option<String>,
    size: Option<String>,
    has_variants: bool,
    stock: Option<i64>,
    price: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: String,
    product_id: String,
    name: String,
    sku: Option<String>,
    stock: i64,
    price: i64,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    product_id: String,
    variant_id: Option<String>,
    change: i64,
    reason: String,
    new_stock_level: i64,
    created_at: DateTime<Utc>,
}

type HistoryKey = (String, Option<String>);

impl ProductRow {
    fn into_item(
        self,
        variants: &mut HashMap<String, Vec<VariantRow>>,
        history: &mut HashMap<HistoryKey, Vec<AdjustmentHistory>>,
    ) -> InventoryItem {
        let layout = if self.has_variants {
            let variants = variants
                .remove(&self.id)
                .unwrap_or_default()
                .into_iter()
                .map(|v| InventoryItemVariant {
                    history: history
                        .remove(&(self.id.clone(), Some(v.id.clone())))
                        .unwrap_or_default(),
                    id: v.id,
                    name: v.name,
                    sku: v.sku,
                    stock: v.stock,
                    price: Money::from_minor(v.price),
                })
                .collect();
            StockLayout::Variants { variants }
        } else {
            StockLayout::Simple {
                stock: self.stock.unwrap_or_default(),
                price: Money::from_minor(self.price.unwrap_or_default()),
                history: history.remove(&(self.id.clone(), None)).unwrap_or_default(),
            }
        };

        InventoryItem {
            id: self.id,
            name: self.name,
            category: self.category,
            sku: self.sku,
            image_url: self.image_url,
            size: self.size,
            layout,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Loads every item, or only `product_id` when given, with variants and
/// history attached.
async fn load_items(
    conn: &mut SqliteConnection,
    product_id: Option<&str>,
) -> DbResult<Vec<InventoryItem>> {
    let products: Vec<ProductRow> = sqlx::query_as(
        r#"
        SELECT id, name, category, sku, image_url, size,
               has_variants, stock, price, created_at, updated_at
        FROM products
        WHERE (?1 IS NULL OR id = ?1)
        ORDER BY name COLLATE NOCASE, id
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    if products.is_empty() {
        return Ok(Vec::new());
    }

    let variant_rows: Vec<VariantRow> = sqlx::query_as(
        r#"
        SELECT id, product_id, name, sku, stock, price
        FROM product_variants
        WHERE (?1 IS NULL OR product_id = ?1)
        ORDER BY product_id, position
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let history_rows: Vec<HistoryRow> = sqlx::query_as(
        r#"
        SELECT product_id, variant_id, change, reason, new_stock_level, created_at
        FROM stock_history
        WHERE (?1 IS NULL OR product_id = ?1)
        ORDER BY id
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut variants: HashMap<String, Vec<VariantRow>> = HashMap::new();
    for row in variant_rows {
        variants.entry(row.product_id.clone()).or_default().push(row);
    }

    let mut history: HashMap<HistoryKey, Vec<AdjustmentHistory>> = HashMap::new();
    for row in history_rows {
        history
            .entry((row.product_id, row.variant_id))
            .or_default()
            .push(AdjustmentHistory {
                date: row.created_at,
                change: row.change,
                reason: row.reason,
                new_stock_level: row.new_stock_level,
            });
    }

    Ok(products
        .into_iter()
        .map(|row| row.into_item(&mut variants, &mut history))
        .collect())
}

async fn upsert_category(conn: &mut SqliteConnection, category: &str) -> DbResult<()> {
    sqlx::query("INSERT INTO categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
        .bind(category)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for products, variants and stock adjustments.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Loads the whole catalog and the category list.
    pub async fn fetch_inventory_data(&self) -> DbResult<InventoryData> {
        let mut conn = self.pool.acquire().await?;

        let items = load_items(&mut *conn, None).await?;
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT name FROM categories ORDER BY name COLLATE NOCASE")
                .fetch_all(&mut *conn)
                .await?;

        debug!(
            items = items.len(),
            categories = categories.len(),
            "Inventory loaded"
        );

        Ok(InventoryData { items, categories })
    }

    /// Gets one item by product id.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        Ok(load_items(&mut *conn, Some(id)).await?.into_iter().next())
    }

    /// Finds the item carrying `sku`, on the product itself or on one of its
    /// variants.
    pub async fn find_product_by_sku(&self, sku: &str) -> DbResult<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;

        let product_id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM products WHERE sku = ?1
            UNION ALL
            SELECT product_id FROM product_variants WHERE sku = ?1
            LIMIT 1
            "#,
        )
        .bind(sku.trim())
        .fetch_optional(&mut *conn)
        .await?;

        match product_id {
            Some(id) => Ok(load_items(&mut *conn, Some(&id)).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    /// Creates a product with its initial stock. No history row is written for
    /// the opening balance.
    pub async fn add_product(&self, product: &NewProduct) -> DbResult<InventoryItem> {
        validate_new_product(product)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let category = product.category.trim();

        debug!(id = %id, name = %product.name, "Adding product");

        let mut tx = self.pool.begin().await?;

        ledger::ensure_sku_free(&mut *tx, product.sku.as_deref(), None).await?;
        if let NewStockLayout::Variants { variants } = &product.layout {
            for variant in variants {
                ledger::ensure_sku_free(&mut *tx, variant.sku.as_deref(), None).await?;
            }
        }

        upsert_category(&mut *tx, category).await?;

        let (has_variants, stock, price) = match &product.layout {
            NewStockLayout::Simple { stock, price } => (false, Some(*stock), Some(price.minor())),
            NewStockLayout::Variants { .. } => (true, None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, sku, image_url, size,
                has_variants, stock, price, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&id)
        .bind(product.name.trim())
        .bind(category)
        .bind(product.sku.as_deref())
        .bind(product.image_url.as_deref())
        .bind(product.size.as_deref())
        .bind(has_variants)
        .bind(stock)
        .bind(price)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DbError::from(e).with_duplicate_value("sku", product.sku.as_deref().unwrap_or_default())
        })?;

        if let NewStockLayout::Variants { variants } = &product.layout {
            for (position, variant) in variants.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO product_variants (id, product_id, position, name, sku, stock, price)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&id)
                .bind(position as i64)
                .bind(variant.name.trim())
                .bind(variant.sku.as_deref())
                .bind(variant.stock)
                .bind(variant.price.minor())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DbError::from(e)
                        .with_duplicate_value("sku", variant.sku.as_deref().unwrap_or_default())
                })?;
            }
        }

        tx.commit().await?;

        info!(id = %id, name = %product.name, has_variants, "Product added");

        self.get_product(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &id))
    }

    /// Edits descriptive fields. Stock is left untouched.
    pub async fn edit_product(&self, id: &str, update: &ProductUpdate) -> DbResult<InventoryItem> {
        validate_product_update(update)?;

        debug!(id = %id, "Editing product");

        let mut tx = self.pool.begin().await?;

        let has_variants: Option<bool> =
            sqlx::query_scalar("SELECT has_variants FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let has_variants =
            has_variants.ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if has_variants && update.price.is_some() {
            return Err(ValidationError::InvalidFormat {
                field: "price".to_string(),
                reason: "price is set per variant".to_string(),
            }
            .into());
        }

        ledger::ensure_sku_free(&mut *tx, update.sku.as_deref(), Some(id)).await?;
        upsert_category(&mut *tx, update.category.trim()).await?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?1, category = ?2, sku = ?3, image_url = ?4, size = ?5,
                price = COALESCE(?6, price), updated_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(update.name.trim())
        .bind(update.category.trim())
        .bind(update.sku.as_deref())
        .bind(update.image_url.as_deref())
        .bind(update.size.as_deref())
        .bind(update.price.map(|p| p.minor()))
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DbError::from(e).with_duplicate_value("sku", update.sku.as_deref().unwrap_or_default())
        })?;

        tx.commit().await?;

        info!(id = %id, "Product edited");

        self.get_product(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product with its variants and history. Sales keep their
    /// snapshot of it.
    pub async fn delete_product(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Applies a signed stock change to a simple product or a variant.
    ///
    /// `id` may be either a product id or a variant id.
    pub async fn adjust_stock(
        &self,
        id: &str,
        change: i64,
        reason: &str,
    ) -> DbResult<AdjustmentHistory> {
        validate_reason(reason)?;

        debug!(id = %id, change, reason = %reason, "Adjusting stock");

        let mut tx = self.pool.begin().await?;

        let target = ledger::resolve_id(&mut *tx, id).await?;
        let current = ledger::current_stock(&mut *tx, &target).await?;
        let plan = plan_adjustment(current, change)?;
        let entry = ledger::apply_plan(&mut *tx, &target, &plan, reason, Utc::now()).await?;

        tx.commit().await?;

        info!(
            id = %id,
            change,
            new_stock_level = entry.new_stock_level,
            "Stock adjusted"
        );

        Ok(entry)
    }

    /// Sets absolute stock (and optionally name, price, SKU) on variants of
    /// one product. One history row per variant whose stock changed, all
    /// carrying `reason`. Nothing is written if any row fails.
    pub async fn edit_variants_bulk(
        &self,
        product_id: &str,
        updates: &[VariantUpdate],
        reason: &str,
    ) -> DbResult<Vec<AdjustmentHistory>> {
        validate_reason(reason)?;
        validate_variant_updates(updates)?;

        debug!(product_id = %product_id, variants = updates.len(), "Editing variants");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let exists: Option<bool> =
            sqlx::query_scalar("SELECT has_variants FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        let mut entries = Vec::new();
        for update in updates {
            let target = StockTarget::Variant {
                product_id: product_id.to_string(),
                variant_id: update.id.clone(),
            };
            let current = ledger::current_stock(&mut *tx, &target).await?;

            ledger::ensure_sku_free(&mut *tx, update.sku.as_deref(), Some(&update.id)).await?;

            sqlx::query(
                r#"
                UPDATE product_variants
                SET name = COALESCE(?1, name),
                    price = COALESCE(?2, price),
                    sku = COALESCE(?3, sku)
                WHERE id = ?4
                "#,
            )
            .bind(update.name.as_deref().map(str::trim))
            .bind(update.price.map(|p| p.minor()))
            .bind(update.sku.as_deref())
            .bind(&update.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DbError::from(e)
                    .with_duplicate_value("sku", update.sku.as_deref().unwrap_or_default())
            })?;

            if let Some(plan) = plan_recount(current, update.stock)? {
                entries.push(ledger::apply_plan(&mut *tx, &target, &plan, reason, now).await?);
            }
        }

        sqlx::query("UPDATE products SET updated_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            stock_changes = entries.len(),
            "Variants updated"
        );

        Ok(entries)
    }

    /// Lists known categories, alphabetically.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories =
            sqlx::query_scalar("SELECT name FROM categories ORDER BY name COLLATE NOCASE")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
