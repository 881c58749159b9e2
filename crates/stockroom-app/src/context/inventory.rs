//! # Inventory Context
//!
//! Owns the in-memory catalog snapshot and routes every inventory, sale and
//! return operation to the database.
//!
//! ## Refetch After Mutation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Mutation Flow                                        │
//! │                                                                         │
//! │  record_sale("KAOS-M", Pos, 2)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleRepository::perform_sale ──► one SQLite transaction               │
//! │       │                           (stock, history row, sale row)       │
//! │       ▼                                                                 │
//! │  fetch_items() ─────────────────► snapshot.items replaced wholesale    │
//! │                                                                         │
//! │  The snapshot is never patched in place; SQLite is the source of truth │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! The snapshot sits behind `Arc<tokio::sync::RwLock<_>>`. No lock is held
//! across a database call, so readers never wait on SQLite.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;
use stockroom_core::insights::{daily_summary, stock_insights, DailySalesSummary, StockInsights};
use stockroom_core::returns::ReturnList;
use stockroom_core::{
    AdjustmentHistory, InventoryItem, NewProduct, NewReseller, ProductUpdate, Reseller, Sale,
    SaleChannel, ShippingReceipt, VariantUpdate, DEFAULT_LOW_STOCK_THRESHOLD,
};
use stockroom_db::Database;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};

/// What the presentation layer renders.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub items: Vec<InventoryItem>,
    pub categories: Vec<String>,
    /// True while a fetch is in flight.
    pub loading: bool,
    /// Message of the last failed fetch; cleared by the next success.
    pub last_error: Option<String>,
}

/// Application-state object for inventory, sales and returns.
///
/// Cheap to clone; clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct InventoryContext {
    db: Database,
    state: Arc<RwLock<InventorySnapshot>>,
    utc_offset: FixedOffset,
    low_stock_threshold: i64,
}

impl InventoryContext {
    /// Creates a context with an empty snapshot, dating sales in UTC.
    /// Call [`fetch_items`] to load.
    ///
    /// [`fetch_items`]: InventoryContext::fetch_items
    pub fn new(db: Database) -> Self {
        InventoryContext {
            db,
            state: Arc::new(RwLock::new(InventorySnapshot::default())),
            utc_offset: Utc.fix(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    /// Sets the store's UTC offset, used to decide a sale's calendar day.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Sets the stock level at or below which an item counts as low.
    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    /// Returns a copy of the current snapshot.
    pub async fn snapshot(&self) -> InventorySnapshot {
        self.state.read().await.clone()
    }

    /// Returns a copy of the cached items.
    pub async fn items(&self) -> Vec<InventoryItem> {
        self.state.read().await.items.clone()
    }

    /// Today's date in the store's timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Reloads items and categories from the database.
    ///
    /// On failure the previous items stay in place and the error message is
    /// recorded in [`InventorySnapshot::last_error`].
    pub async fn fetch_items(&self) -> AppResult<()> {
        self.state.write().await.loading = true;

        let result = self.db.inventory().fetch_inventory_data().await;

        let mut state = self.state.write().await;
        state.loading = false;

        match result {
            Ok(data) => {
                debug!(items = data.items.len(), "Inventory loaded");
                state.items = data.items;
                state.categories = data.categories;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to load inventory");
                let err = AppError::from(e);
                state.last_error = Some(err.message.clone());
                Err(err)
            }
        }
    }

    async fn refetch(&self) {
        // Failure is already logged and recorded in the snapshot.
        let _ = self.fetch_items().await;
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn add_item(&self, data: &NewProduct) -> AppResult<InventoryItem> {
        let item = self.db.inventory().add_product(data).await?;
        info!(id = %item.id, name = %item.name, "Item added");
        self.refetch().await;
        Ok(item)
    }

    /// Edits descriptive fields. Stock is left untouched.
    pub async fn update_item(&self, id: &str, data: &ProductUpdate) -> AppResult<InventoryItem> {
        let item = self.db.inventory().edit_product(id, data).await?;
        info!(id = %id, "Item updated");
        self.refetch().await;
        Ok(item)
    }

    /// Removes a product with its variants and history. Sales keep their
    /// snapshot of the product.
    pub async fn delete_item(&self, id: &str) -> AppResult<()> {
        self.db.inventory().delete_product(id).await?;
        info!(id = %id, "Item deleted");
        self.refetch().await;
        Ok(())
    }

    /// Applies a signed stock change to a simple item or a variant.
    pub async fn update_stock(
        &self,
        item_id: &str,
        change: i64,
        reason: &str,
    ) -> AppResult<AdjustmentHistory> {
        let entry = self.db.inventory().adjust_stock(item_id, change, reason).await?;
        self.refetch().await;
        Ok(entry)
    }

    /// Recounts variants of one item. Returns one history entry per variant
    /// whose stock changed.
    pub async fn bulk_update_variants(
        &self,
        item_id: &str,
        variants: &[VariantUpdate],
        reason: &str,
    ) -> AppResult<Vec<AdjustmentHistory>> {
        let entries = self
            .db
            .inventory()
            .edit_variants_bulk(item_id, variants, reason)
            .await?;
        self.refetch().await;
        Ok(entries)
    }

    /// Finds a cached item by its own id or by one of its variant ids.
    pub async fn get_item(&self, item_id: &str) -> Option<InventoryItem> {
        self.state
            .read()
            .await
            .items
            .iter()
            .find(|item| item.owns_id(item_id))
            .cloned()
    }

    /// Looks up the item carrying `sku` (on itself or on a variant).
    pub async fn get_product_by_sku(&self, sku: &str) -> AppResult<Option<InventoryItem>> {
        Ok(self.db.inventory().find_product_by_sku(sku).await?)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    pub async fn record_sale(
        &self,
        sku: &str,
        channel: SaleChannel,
        quantity: i64,
    ) -> AppResult<Sale> {
        let sale = self
            .db
            .sales()
            .perform_sale(sku, channel, quantity, None)
            .await?;
        self.refetch().await;
        Ok(sale)
    }

    /// Records a sale attributed to a reseller.
    pub async fn record_reseller_sale(
        &self,
        sku: &str,
        quantity: i64,
        reseller_id: &str,
    ) -> AppResult<Sale> {
        let sale = self
            .db
            .sales()
            .perform_sale(sku, SaleChannel::Reseller, quantity, Some(reseller_id))
            .await?;
        self.refetch().await;
        Ok(sale)
    }

    /// Cancels a completed sale and credits its quantity back.
    ///
    /// A second cancellation fails with `BUSINESS_LOGIC` and moves no stock.
    pub async fn cancel_sale(&self, sale_id: &str) -> AppResult<Sale> {
        let sale = self.db.sales().revert_sale(sale_id).await?;
        self.refetch().await;
        Ok(sale)
    }

    /// Completed sales on a local calendar day, optionally for one channel.
    pub async fn sales_by_date(
        &self,
        channel: Option<SaleChannel>,
        date: NaiveDate,
    ) -> AppResult<Vec<Sale>> {
        Ok(self
            .db
            .sales()
            .get_sales_by_date(channel, date, self.utc_offset)
            .await?)
    }

    /// Per-channel totals for a local calendar day.
    pub async fn daily_summary(&self, date: NaiveDate) -> AppResult<DailySalesSummary> {
        let sales = self.sales_by_date(None, date).await?;
        Ok(daily_summary(date, &sales))
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Credits every scanned line back to stock and reconciles the receipt.
    ///
    /// All lines and the status change commit together or not at all.
    pub async fn finalize_return(
        &self,
        receipt_id: &str,
        returns: &ReturnList,
        reason: Option<&str>,
    ) -> AppResult<ShippingReceipt> {
        let receipt = self
            .db
            .receipts()
            .reconcile_return(receipt_id, returns, reason)
            .await?;
        info!(
            awb = %receipt.awb,
            lines = returns.lines().len(),
            units = returns.total_units(),
            "Return finalized"
        );
        self.refetch().await;
        Ok(receipt)
    }

    // =========================================================================
    // Resellers
    // =========================================================================

    pub async fn add_reseller(&self, reseller: &NewReseller) -> AppResult<Reseller> {
        Ok(self.db.resellers().create(reseller).await?)
    }

    pub async fn list_resellers(&self) -> AppResult<Vec<Reseller>> {
        Ok(self.db.resellers().list().await?)
    }

    // =========================================================================
    // Insights
    // =========================================================================

    /// Low and out-of-stock summary of the cached items.
    pub async fn stock_insights(&self) -> StockInsights {
        stock_insights(&self.state.read().await.items, self.low_stock_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use stockroom_core::{
        Money, NewShippingReceipt, NewStockLayout, NewVariant, ReceiptStatus, SaleStatus,
        StockLayout,
    };
    use stockroom_db::DbConfig;

    async fn context() -> InventoryContext {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ctx = InventoryContext::new(db);
        ctx.fetch_items().await.unwrap();
        ctx
    }

    fn simple(name: &str, sku: &str, stock: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: "Aksesoris".to_string(),
            sku: Some(sku.to_string()),
            image_url: None,
            size: None,
            layout: NewStockLayout::Simple {
                stock,
                price: Money::from_minor(45_000),
            },
        }
    }

    fn with_sizes(name: &str, code: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: "Pakaian".to_string(),
            sku: Some(code.to_string()),
            image_url: None,
            size: None,
            layout: NewStockLayout::Variants {
                variants: [("S", 4), ("M", 6)]
                    .into_iter()
                    .map(|(size, stock)| NewVariant {
                        name: size.to_string(),
                        sku: Some(format!("{}-{}", code, size)),
                        stock,
                        price: Money::from_minor(75_000),
                    })
                    .collect(),
            },
        }
    }

    fn flat_stock(item: &InventoryItem) -> (i64, usize) {
        match &item.layout {
            StockLayout::Simple { stock, history, .. } => (*stock, history.len()),
            StockLayout::Variants { .. } => panic!("expected a simple item"),
        }
    }

    #[tokio::test]
    async fn test_sale_cancel_scenario() {
        let ctx = context().await;
        let item = ctx.add_item(&simple("Topi", "X", 20)).await.unwrap();

        let sale = ctx.record_sale("X", SaleChannel::Pos, 3).await.unwrap();
        assert_eq!(flat_stock(&ctx.get_item(&item.id).await.unwrap()).0, 17);

        let cancelled = ctx.cancel_sale(&sale.id).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(flat_stock(&ctx.get_item(&item.id).await.unwrap()).0, 20);

        let err = ctx.cancel_sale(&sale.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let (stock, history) = flat_stock(&ctx.get_item(&item.id).await.unwrap());
        assert_eq!(stock, 20);
        assert_eq!(history, 2);
    }

    #[tokio::test]
    async fn test_oversell_is_rejected() {
        let ctx = context().await;
        ctx.add_item(&simple("Tas", "TAS", 2)).await.unwrap();

        let err = ctx.record_sale("TAS", SaleChannel::Shopee, 3).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[tokio::test]
    async fn test_update_stock_sequence_keeps_running_total() {
        let ctx = context().await;
        let item = ctx.add_item(&simple("Kaus Kaki", "KK", 10)).await.unwrap();

        let mut expected = 10;
        for change in [5, -3, 8, -10] {
            let entry = ctx.update_stock(&item.id, change, "opname").await.unwrap();
            expected += change;
            assert_eq!(entry.new_stock_level, expected);
        }

        let (stock, history) = flat_stock(&ctx.get_item(&item.id).await.unwrap());
        assert_eq!(stock, 10);
        assert_eq!(history, 4);
    }

    #[tokio::test]
    async fn test_negative_result_leaves_item_unchanged() {
        let ctx = context().await;
        let item = ctx.add_item(&simple("Gantungan", "GK", 3)).await.unwrap();

        let err = ctx.update_stock(&item.id, -4, "rusak").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert_eq!(flat_stock(&ctx.get_item(&item.id).await.unwrap()), (3, 0));
    }

    #[tokio::test]
    async fn test_get_item_by_variant_id_returns_parent() {
        let ctx = context().await;
        let item = ctx.add_item(&with_sizes("Kaos", "KAOS")).await.unwrap();
        let variant_id = item.variants()[1].id.clone();

        let found = ctx.get_item(&variant_id).await.unwrap();
        assert_eq!(found.id, item.id);
        assert!(ctx.get_item("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_bulk_recount_writes_one_row_per_changed_variant() {
        let ctx = context().await;
        let item = ctx.add_item(&with_sizes("Kaos", "KAOS")).await.unwrap();
        let ids: Vec<String> = item.variants().iter().map(|v| v.id.clone()).collect();

        let updates = vec![
            VariantUpdate {
                id: ids[0].clone(),
                stock: 5,
                name: None,
                price: None,
                sku: None,
            },
            VariantUpdate {
                id: ids[1].clone(),
                stock: 10,
                name: None,
                price: None,
                sku: None,
            },
        ];
        let entries = ctx
            .bulk_update_variants(&item.id, &updates, "recount")
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        let item = ctx.get_item(&item.id).await.unwrap();
        let variants = item.variants();
        assert_eq!((variants[0].stock, variants[1].stock), (5, 10));
        for variant in variants {
            assert_eq!(variant.history.len(), 1);
            assert_eq!(variant.history[0].reason, "recount");
        }
    }

    #[tokio::test]
    async fn test_update_item_never_touches_stock() {
        let ctx = context().await;
        let item = ctx.add_item(&simple("Topi", "TOPI", 7)).await.unwrap();

        let update = ProductUpdate {
            name: "Topi Baseball".to_string(),
            category: "Aksesoris".to_string(),
            sku: Some("TOPI".to_string()),
            image_url: None,
            size: None,
            price: Some(Money::from_minor(50_000)),
        };
        ctx.update_item(&item.id, &update).await.unwrap();

        let item = ctx.get_item(&item.id).await.unwrap();
        assert_eq!(item.name, "Topi Baseball");
        assert_eq!(flat_stock(&item), (7, 0));
    }

    #[tokio::test]
    async fn test_delete_item_drops_it_from_snapshot() {
        let ctx = context().await;
        let item = ctx.add_item(&simple("Topi", "TOPI", 7)).await.unwrap();

        ctx.delete_item(&item.id).await.unwrap();
        assert!(ctx.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_finalize_return_credits_and_reconciles() {
        let ctx = context().await;
        let item = ctx.add_item(&with_sizes("Kaos", "KAOS")).await.unwrap();
        let receipt = ctx
            .db
            .receipts()
            .create(&NewShippingReceipt {
                awb: "JP123".to_string(),
                channel: SaleChannel::Shopee,
                date: ctx.today(),
                receipt_number: "INV/1".to_string(),
            })
            .await
            .unwrap();

        let mut returns = ReturnList::new();
        returns.scan("KAOS-S").unwrap();
        returns.scan("KAOS-S").unwrap();
        returns.add("KAOS-M", 1).unwrap();

        let reconciled = ctx
            .finalize_return(&receipt.id, &returns, None)
            .await
            .unwrap();
        assert_eq!(reconciled.status, ReceiptStatus::Reconciled);

        let item = ctx.get_item(&item.id).await.unwrap();
        assert_eq!(item.variants()[0].stock, 6);
        assert_eq!(item.variants()[1].stock, 7);

        let err = ctx
            .finalize_return(&receipt.id, &returns, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_daily_summary_excludes_cancelled_sales() {
        let ctx = context().await;
        ctx.add_item(&simple("Topi", "TOPI", 10)).await.unwrap();

        ctx.record_sale("TOPI", SaleChannel::Pos, 2).await.unwrap();
        let cancelled = ctx.record_sale("TOPI", SaleChannel::Pos, 1).await.unwrap();
        ctx.cancel_sale(&cancelled.id).await.unwrap();
        let reseller = ctx
            .add_reseller(&NewReseller {
                name: "Bu Sari".to_string(),
                phone: None,
                address: None,
            })
            .await
            .unwrap();
        ctx.record_reseller_sale("TOPI", 4, &reseller.id).await.unwrap();

        let summary = ctx.daily_summary(ctx.today()).await.unwrap();
        assert_eq!(summary.total_units, 6);
        assert_eq!(summary.channels.len(), 2);
        assert_eq!(ctx.list_resellers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stock_insights_use_threshold() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ctx = InventoryContext::new(db).with_low_stock_threshold(3);
        ctx.add_item(&simple("Topi", "TOPI", 2)).await.unwrap();
        ctx.add_item(&simple("Tas", "TAS", 0)).await.unwrap();
        ctx.add_item(&simple("Kaus Kaki", "KK", 50)).await.unwrap();

        let insights = ctx.stock_insights().await;
        assert_eq!(insights.low_stock.len(), 1);
        assert_eq!(insights.out_of_stock.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_items_and_records_error() {
        let ctx = context().await;
        ctx.add_item(&simple("Topi", "TOPI", 2)).await.unwrap();

        ctx.db.close().await;
        assert!(ctx.fetch_items().await.is_err());

        let snapshot = ctx.snapshot().await;
        assert_eq!(snapshot.items.len(), 1);
        assert!(!snapshot.loading);
        assert!(snapshot.last_error.is_some());
    }
}
