//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │   InventoryItem      │        │        Sale          │              │
//! │  │  ──────────────────  │        │  ──────────────────  │              │
//! │  │  id, name, category  │        │  product/variant id  │              │
//! │  │  layout:             │        │  channel, quantity   │              │
//! │  │   Simple{stock,..}   │        │  price_at_sale       │              │
//! │  │   Variants{[..]}     │        │  status              │              │
//! │  └──────────┬───────────┘        └──────────────────────┘              │
//! │             │                                                           │
//! │             ▼                                                           │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │ InventoryItemVariant │        │  ShippingReceipt     │              │
//! │  │  stock, price,       │        │  awb (unique)        │              │
//! │  │  history[]           │        │  status              │              │
//! │  └──────────────────────┘        └──────────────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Layout
//! An item either tracks one flat stock/price or a list of variants, each with
//! its own stock/price. [`StockLayout`] makes the two shapes exclusive.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Adjustment History
// =============================================================================

/// One row of the append-only stock audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdjustmentHistory {
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    /// Signed delta applied to stock.
    pub change: i64,
    pub reason: String,
    /// Stock level after this change was applied.
    pub new_stock_level: i64,
}

// =============================================================================
// Inventory Items
// =============================================================================

/// A sub-item of a product (size, colour) with its own stock and price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryItemVariant {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i64,
    pub price: Money,
    pub history: Vec<AdjustmentHistory>,
}

/// Where an item's stock and price live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum StockLayout {
    /// Flat stock and price on the item itself.
    Simple {
        stock: i64,
        price: Money,
        history: Vec<AdjustmentHistory>,
    },
    /// Stock and price live on each variant, in display order.
    Variants { variants: Vec<InventoryItemVariant> },
}

/// A catalog entry (product or accessory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub layout: StockLayout,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Returns true if stock is tracked per variant.
    pub fn has_variants(&self) -> bool {
        matches!(self.layout, StockLayout::Variants { .. })
    }

    /// Returns the variants, or an empty slice for simple items.
    pub fn variants(&self) -> &[InventoryItemVariant] {
        match &self.layout {
            StockLayout::Variants { variants } => variants,
            StockLayout::Simple { .. } => &[],
        }
    }

    /// Finds one of this item's variants by id.
    pub fn variant(&self, variant_id: &str) -> Option<&InventoryItemVariant> {
        self.variants().iter().find(|v| v.id == variant_id)
    }

    /// Returns true if `id` is this item's id or one of its variant ids.
    pub fn owns_id(&self, id: &str) -> bool {
        self.id == id || self.variant(id).is_some()
    }

    /// Sum of stock across the item (flat stock or all variants).
    pub fn total_stock(&self) -> i64 {
        match &self.layout {
            StockLayout::Simple { stock, .. } => *stock,
            StockLayout::Variants { variants } => variants.iter().map(|v| v.stock).sum(),
        }
    }

    /// Resolves a SKU carried by this item or one of its variants.
    pub fn resolve_sku(&self, sku: &str) -> Option<StockTarget> {
        if let Some(variant) = self.variants().iter().find(|v| v.sku.as_deref() == Some(sku)) {
            return Some(StockTarget::Variant {
                product_id: self.id.clone(),
                variant_id: variant.id.clone(),
            });
        }

        match (&self.layout, self.sku.as_deref()) {
            (StockLayout::Simple { .. }, Some(own)) if own == sku => {
                Some(StockTarget::Product(self.id.clone()))
            }
            _ => None,
        }
    }
}

/// The stock-bearing entity an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StockTarget {
    /// A simple item; stock lives on the product row.
    Product(String),
    /// One variant of a product.
    Variant {
        product_id: String,
        variant_id: String,
    },
}

impl StockTarget {
    /// The owning product id.
    pub fn product_id(&self) -> &str {
        match self {
            StockTarget::Product(id) => id,
            StockTarget::Variant { product_id, .. } => product_id,
        }
    }

    /// The variant id, if any.
    pub fn variant_id(&self) -> Option<&str> {
        match self {
            StockTarget::Product(_) => None,
            StockTarget::Variant { variant_id, .. } => Some(variant_id),
        }
    }
}

/// Full catalog snapshot returned by one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryData {
    pub items: Vec<InventoryItem>,
    pub categories: Vec<String>,
}

// =============================================================================
// Catalog Inputs
// =============================================================================

/// Data for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub layout: NewStockLayout,
}

/// Initial stock shape of a new product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum NewStockLayout {
    Simple { stock: i64, price: Money },
    Variants { variants: Vec<NewVariant> },
}

/// Initial data of one variant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewVariant {
    pub name: String,
    pub sku: Option<String>,
    pub stock: i64,
    pub price: Money,
}

/// Descriptive fields of a product edit. Stock is not editable here.
///
/// `price` only applies to simple items; `None` leaves it unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUpdate {
    pub name: String,
    pub category: String,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub price: Option<Money>,
}

/// One row of a bulk variant edit. `None` fields stay unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VariantUpdate {
    pub id: String,
    pub stock: i64,
    pub name: Option<String>,
    pub price: Option<Money>,
    pub sku: Option<String>,
}

// =============================================================================
// Sales
// =============================================================================

/// Where a sale happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SaleChannel {
    /// Walk-in counter sale.
    Pos,
    /// Sale to a registered reseller.
    Reseller,
    Shopee,
    Tokopedia,
    TiktokShop,
    Lazada,
}

impl SaleChannel {
    /// All channels, in display order.
    pub const ALL: [SaleChannel; 6] = [
        SaleChannel::Pos,
        SaleChannel::Reseller,
        SaleChannel::Shopee,
        SaleChannel::Tokopedia,
        SaleChannel::TiktokShop,
        SaleChannel::Lazada,
    ];

    /// Storage / wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleChannel::Pos => "pos",
            SaleChannel::Reseller => "reseller",
            SaleChannel::Shopee => "shopee",
            SaleChannel::Tokopedia => "tokopedia",
            SaleChannel::TiktokShop => "tiktok_shop",
            SaleChannel::Lazada => "lazada",
        }
    }

    /// Returns true for marketplace channels.
    pub const fn is_marketplace(&self) -> bool {
        !matches!(self, SaleChannel::Pos | SaleChannel::Reseller)
    }
}

impl fmt::Display for SaleChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleChannel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        SaleChannel::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .or(match normalized.as_str() {
                "tiktok" => Some(SaleChannel::TiktokShop),
                _ => None,
            })
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "channel".to_string(),
                allowed: SaleChannel::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            })
    }
}

/// Lifecycle of a recorded sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SaleStatus {
    /// Stock was taken; counts towards revenue.
    #[default]
    Completed,
    /// Stock was credited back; kept for the audit trail.
    Cancelled,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SaleStatus::Completed),
            "cancelled" => Ok(SaleStatus::Cancelled),
            other => Err(ValidationError::InvalidFormat {
                field: "sale status".to_string(),
                reason: format!("unknown status '{}'", other),
            }),
        }
    }
}

/// A recorded sale.
///
/// Uses the snapshot pattern: price, names and SKU are frozen at sale time so
/// historical revenue is stable against later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub channel: SaleChannel,
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub price_at_sale: Money,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub status: SaleStatus,
    pub reseller_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Unit price × quantity.
    pub fn total(&self) -> Money {
        self.price_at_sale * self.quantity
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }

    /// Where the stock for this sale was taken from.
    pub fn stock_target(&self) -> StockTarget {
        match &self.variant_id {
            Some(variant_id) => StockTarget::Variant {
                product_id: self.product_id.clone(),
                variant_id: variant_id.clone(),
            },
            None => StockTarget::Product(self.product_id.clone()),
        }
    }
}

// =============================================================================
// Resellers
// =============================================================================

/// A reseller buying stock for resale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Reseller {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewReseller {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Shipping Receipts
// =============================================================================

/// Status of a shipping receipt.
///
/// Only two values carry meaning here; anything else read from storage is
/// kept verbatim in [`ReceiptStatus::Other`] and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReceiptStatus {
    /// "Perlu Diproses": waiting to be processed.
    #[default]
    NeedsProcessing,
    /// Return has been processed and stock re-accepted.
    Reconciled,
    Other(String),
}

impl ReceiptStatus {
    pub const NEEDS_PROCESSING: &'static str = "Perlu Diproses";
    pub const RECONCILED: &'static str = "reconciled";

    pub fn as_str(&self) -> &str {
        match self {
            ReceiptStatus::NeedsProcessing => Self::NEEDS_PROCESSING,
            ReceiptStatus::Reconciled => Self::RECONCILED,
            ReceiptStatus::Other(s) => s,
        }
    }
}

impl From<String> for ReceiptStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            Self::NEEDS_PROCESSING => ReceiptStatus::NeedsProcessing,
            Self::RECONCILED => ReceiptStatus::Reconciled,
            _ => ReceiptStatus::Other(s),
        }
    }
}

impl From<ReceiptStatus> for String {
    fn from(status: ReceiptStatus) -> Self {
        match status {
            ReceiptStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scanned shipping label (AWB) for an outgoing marketplace order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShippingReceipt {
    pub id: String,
    /// Airway bill number, unique across all receipts.
    pub awb: String,
    pub channel: SaleChannel,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "String")]
    pub status: ReceiptStatus,
    pub receipt_number: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewShippingReceipt {
    pub awb: String,
    pub channel: SaleChannel,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub receipt_number: String,
}

// =============================================================================
// Receipt Settings
// =============================================================================

/// Printer paper width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaperSize {
    #[serde(rename = "58mm")]
    Mm58,
    #[default]
    #[serde(rename = "80mm")]
    Mm80,
}

impl PaperSize {
    /// Characters per line on a thermal printer.
    pub const fn line_width(&self) -> usize {
        match self {
            PaperSize::Mm58 => 32,
            PaperSize::Mm80 => 48,
        }
    }
}

/// Header and layout printed on POS receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ReceiptSettings {
    pub shop_name: String,
    pub address: String,
    pub phone: String,
    pub cashier_name: String,
    pub paper_size: PaperSize,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        ReceiptSettings {
            shop_name: "Toko Saya".to_string(),
            address: String::new(),
            phone: String::new(),
            cashier_name: "Kasir".to_string(),
            paper_size: PaperSize::default(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, sku: &str, stock: i64) -> InventoryItemVariant {
        InventoryItemVariant {
            id: id.to_string(),
            name: id.to_uppercase(),
            sku: Some(sku.to_string()),
            stock,
            price: Money::from_minor(50_000),
            history: Vec::new(),
        }
    }

    fn item(layout: StockLayout) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: "p-1".to_string(),
            name: "Kaos Polos".to_string(),
            category: "Pakaian".to_string(),
            sku: Some("KAOS".to_string()),
            image_url: None,
            size: None,
            layout,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_variant_lookup_and_totals() {
        let it = item(StockLayout::Variants {
            variants: vec![variant("v-s", "KAOS-S", 4), variant("v-m", "KAOS-M", 6)],
        });

        assert!(it.has_variants());
        assert!(it.owns_id("p-1"));
        assert!(it.owns_id("v-m"));
        assert!(!it.owns_id("v-xl"));
        assert_eq!(it.total_stock(), 10);
        assert_eq!(
            it.resolve_sku("KAOS-M"),
            Some(StockTarget::Variant {
                product_id: "p-1".to_string(),
                variant_id: "v-m".to_string(),
            })
        );
        // The parent SKU does not carry stock when variants exist.
        assert_eq!(it.resolve_sku("KAOS"), None);
    }

    #[test]
    fn test_simple_item_resolves_own_sku() {
        let it = item(StockLayout::Simple {
            stock: 3,
            price: Money::from_minor(10_000),
            history: Vec::new(),
        });
        assert_eq!(it.resolve_sku("KAOS"), Some(StockTarget::Product("p-1".to_string())));
        assert!(it.variants().is_empty());
    }

    #[test]
    fn test_layout_is_tagged() {
        let layout = StockLayout::Simple {
            stock: 1,
            price: Money::from_minor(1),
            history: Vec::new(),
        };
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["kind"], "simple");
    }

    #[test]
    fn test_channel_parsing() {
        assert_eq!("pos".parse::<SaleChannel>().unwrap(), SaleChannel::Pos);
        assert_eq!("TikTok Shop".parse::<SaleChannel>().unwrap(), SaleChannel::TiktokShop);
        assert_eq!("tiktok".parse::<SaleChannel>().unwrap(), SaleChannel::TiktokShop);
        assert!("ebay".parse::<SaleChannel>().is_err());
        assert!(SaleChannel::Shopee.is_marketplace());
        assert!(!SaleChannel::Reseller.is_marketplace());
    }

    #[test]
    fn test_receipt_status_passes_unknown_values_through() {
        assert_eq!(
            ReceiptStatus::from("Perlu Diproses".to_string()),
            ReceiptStatus::NeedsProcessing
        );
        assert_eq!(ReceiptStatus::from("reconciled".to_string()), ReceiptStatus::Reconciled);

        let other = ReceiptStatus::from("Dikirim".to_string());
        assert_eq!(other, ReceiptStatus::Other("Dikirim".to_string()));
        assert_eq!(String::from(other), "Dikirim");

        let json = serde_json::to_string(&ReceiptStatus::NeedsProcessing).unwrap();
        assert_eq!(json, "\"Perlu Diproses\"");
    }

    #[test]
    fn test_receipt_settings_defaults_fill_missing_fields() {
        let settings: ReceiptSettings =
            serde_json::from_str(r#"{"shopName":"Toko Maju","paperSize":"58mm"}"#).unwrap();
        assert_eq!(settings.shop_name, "Toko Maju");
        assert_eq!(settings.paper_size, PaperSize::Mm58);
        assert_eq!(settings.cashier_name, "Kasir");
        assert_eq!(settings.paper_size.line_width(), 32);
    }
}
