//! # Stock Insights
//!
//! Summaries computed from the cached catalog and a day's sales. These feed
//! the dashboard and the prompt handed to the external text generator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{InventoryItem, Sale, SaleChannel, StockLayout};

/// One stock-bearing entity that needs attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockAlert {
    pub item_id: String,
    pub variant_id: Option<String>,
    /// "Item" or "Item / Variant".
    pub label: String,
    pub sku: Option<String>,
    pub stock: i64,
}

/// Catalog-wide stock summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockInsights {
    pub item_count: usize,
    pub total_units: i64,
    /// Retail value of everything on hand.
    pub stock_value: Money,
    pub out_of_stock: Vec<StockAlert>,
    /// Above zero but at or below the threshold.
    pub low_stock: Vec<StockAlert>,
}

/// Builds the stock summary for `items` against `low_stock_threshold`.
pub fn stock_insights(items: &[InventoryItem], low_stock_threshold: i64) -> StockInsights {
    let mut insights = StockInsights {
        item_count: items.len(),
        ..StockInsights::default()
    };

    for item in items {
        match &item.layout {
            StockLayout::Simple { stock, price, .. } => {
                let alert = || StockAlert {
                    item_id: item.id.clone(),
                    variant_id: None,
                    label: item.name.clone(),
                    sku: item.sku.clone(),
                    stock: *stock,
                };
                insights.record(*stock, *price, low_stock_threshold, alert);
            }
            StockLayout::Variants { variants } => {
                for variant in variants {
                    let alert = || StockAlert {
                        item_id: item.id.clone(),
                        variant_id: Some(variant.id.clone()),
                        label: format!("{} / {}", item.name, variant.name),
                        sku: variant.sku.clone(),
                        stock: variant.stock,
                    };
                    insights.record(variant.stock, variant.price, low_stock_threshold, alert);
                }
            }
        }
    }

    insights.low_stock.sort_by_key(|alert| alert.stock);
    insights
}

impl StockInsights {
    fn record(
        &mut self,
        stock: i64,
        price: Money,
        threshold: i64,
        alert: impl FnOnce() -> StockAlert,
    ) {
        self.total_units = self.total_units.saturating_add(stock);
        self.stock_value = self.stock_value.saturating_add(price.saturating_mul(stock));

        if stock == 0 {
            self.out_of_stock.push(alert());
        } else if stock <= threshold {
            self.low_stock.push(alert());
        }
    }
}

// =============================================================================
// Daily Sales Summary
// =============================================================================

/// Totals for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChannelTotals {
    pub channel: SaleChannel,
    pub sale_count: usize,
    pub units: i64,
    pub revenue: Money,
}

/// End-of-day totals, per channel and overall. Cancelled sales are excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailySalesSummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub channels: Vec<ChannelTotals>,
    pub total_units: i64,
    pub total_revenue: Money,
}

/// Summarises `sales` for `date`, channels in [`SaleChannel::ALL`] order.
pub fn daily_summary(date: NaiveDate, sales: &[Sale]) -> DailySalesSummary {
    let channels: Vec<ChannelTotals> = SaleChannel::ALL
        .into_iter()
        .filter_map(|channel| {
            let mut totals = ChannelTotals {
                channel,
                sale_count: 0,
                units: 0,
                revenue: Money::ZERO,
            };
            for sale in sales
                .iter()
                .filter(|s| s.channel == channel && !s.is_cancelled())
            {
                totals.sale_count += 1;
                totals.units += sale.quantity;
                totals.revenue += sale.total();
            }
            (totals.sale_count > 0).then_some(totals)
        })
        .collect();

    DailySalesSummary {
        date,
        total_units: channels.iter().map(|c| c.units).sum(),
        total_revenue: channels.iter().map(|c| c.revenue).sum(),
        channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InventoryItemVariant, SaleStatus};
    use chrono::Utc;

    fn item(id: &str, layout: StockLayout) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: id.to_string(),
            name: id.to_uppercase(),
            category: "Umum".to_string(),
            sku: None,
            image_url: None,
            size: None,
            layout,
            created_at: now,
            updated_at: now,
        }
    }

    fn sale(channel: SaleChannel, quantity: i64, price: i64, status: SaleStatus) -> Sale {
        Sale {
            id: "s".to_string(),
            product_id: "p".to_string(),
            variant_id: None,
            channel,
            quantity,
            price_at_sale: Money::from_minor(price),
            sale_date: Utc::now(),
            product_name: "P".to_string(),
            variant_name: None,
            sku: "P".to_string(),
            status,
            reseller_id: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_stock_insights_flags_low_and_empty() {
        let items = vec![
            item(
                "topi",
                StockLayout::Simple {
                    stock: 0,
                    price: Money::from_minor(20_000),
                    history: vec![],
                },
            ),
            item(
                "kaos",
                StockLayout::Variants {
                    variants: vec![
                        InventoryItemVariant {
                            id: "kaos-s".to_string(),
                            name: "S".to_string(),
                            sku: Some("KAOS-S".to_string()),
                            stock: 2,
                            price: Money::from_minor(50_000),
                            history: vec![],
                        },
                        InventoryItemVariant {
                            id: "kaos-m".to_string(),
                            name: "M".to_string(),
                            sku: Some("KAOS-M".to_string()),
                            stock: 30,
                            price: Money::from_minor(50_000),
                            history: vec![],
                        },
                    ],
                },
            ),
        ];

        let insights = stock_insights(&items, 5);
        assert_eq!(insights.item_count, 2);
        assert_eq!(insights.total_units, 32);
        assert_eq!(insights.stock_value, Money::from_minor(32 * 50_000));
        assert_eq!(insights.out_of_stock.len(), 1);
        assert_eq!(insights.out_of_stock[0].item_id, "topi");
        assert_eq!(insights.low_stock.len(), 1);
        assert_eq!(insights.low_stock[0].label, "KAOS / S");
        assert_eq!(insights.low_stock[0].variant_id.as_deref(), Some("kaos-s"));
    }

    #[test]
    fn test_stock_value_saturates_instead_of_overflowing() {
        let items = vec![item(
            "emas",
            StockLayout::Simple {
                stock: 3,
                price: Money::from_minor(i64::MAX),
                history: vec![],
            },
        )];

        let insights = stock_insights(&items, 5);
        assert_eq!(insights.stock_value, Money::from_minor(i64::MAX));
        assert_eq!(insights.low_stock.len(), 1);
    }

    #[test]
    fn test_daily_summary_skips_cancelled_sales() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let sales = vec![
            sale(SaleChannel::Pos, 2, 10_000, SaleStatus::Completed),
            sale(SaleChannel::Pos, 1, 10_000, SaleStatus::Cancelled),
            sale(SaleChannel::Shopee, 3, 15_000, SaleStatus::Completed),
        ];

        let summary = daily_summary(date, &sales);
        assert_eq!(summary.channels.len(), 2);
        assert_eq!(summary.channels[0].channel, SaleChannel::Pos);
        assert_eq!(summary.channels[0].sale_count, 1);
        assert_eq!(summary.total_units, 5);
        assert_eq!(summary.total_revenue, Money::from_minor(65_000));
    }
}
