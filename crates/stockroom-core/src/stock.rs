//! # Stock Ledger
//!
//! Pure arithmetic behind every stock change.
//!
//! ## The Ledger Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For every stock-bearing entity (simple item or variant):               │
//! │                                                                         │
//! │     initial + Σ history.change == current                               │
//! │     every history.new_stock_level == running total at that row          │
//! │     current >= 0                                                        │
//! │                                                                         │
//! │  Paths that move stock, each writing exactly ONE history row:          │
//! │                                                                         │
//! │   stock-in / adjust ──► plan_adjustment(current, change)               │
//! │   sale              ──► plan_sale(sku, current, qty)                   │
//! │   cancel / return   ──► plan_adjustment(current, +qty)                 │
//! │   bulk recount      ──► plan_recount(current, target) (skip if equal)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database layer calls these inside the same transaction that writes
//! the stock column and the history row.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{AdjustmentHistory, SaleChannel};
use crate::validation::{validate_change, validate_quantity, validate_stock_level};
use crate::MAX_STOCK_LEVEL;

/// A validated stock change, ready to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentPlan {
    pub previous_stock: i64,
    pub change: i64,
    pub new_stock_level: i64,
}

impl AdjustmentPlan {
    /// Builds the history row recording this plan.
    pub fn history_entry(&self, reason: &str, date: DateTime<Utc>) -> AdjustmentHistory {
        AdjustmentHistory {
            date,
            change: self.change,
            reason: reason.trim().to_string(),
            new_stock_level: self.new_stock_level,
        }
    }
}

/// Plans a signed adjustment. Fails on a zero change, a negative result or
/// a result above [`MAX_STOCK_LEVEL`].
pub fn plan_adjustment(current: i64, change: i64) -> CoreResult<AdjustmentPlan> {
    validate_change(change)?;

    let resulting = current
        .checked_add(change)
        .filter(|level| *level <= MAX_STOCK_LEVEL)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        })?;
    if resulting < 0 {
        return Err(CoreError::NegativeStock {
            current,
            change,
            resulting,
        });
    }

    Ok(AdjustmentPlan {
        previous_stock: current,
        change,
        new_stock_level: resulting,
    })
}

/// Plans a sale of `quantity` units. Fails instead of clamping.
pub fn plan_sale(sku: &str, current: i64, quantity: i64) -> CoreResult<AdjustmentPlan> {
    validate_quantity(quantity)?;

    if quantity > current {
        return Err(CoreError::InsufficientStock {
            sku: sku.to_string(),
            available: current,
            requested: quantity,
        });
    }

    plan_adjustment(current, -quantity)
}

/// Plans setting stock to an absolute `target`.
///
/// Returns `None` when the level is unchanged, so no history row is written.
pub fn plan_recount(current: i64, target: i64) -> CoreResult<Option<AdjustmentPlan>> {
    validate_stock_level(target)?;

    if target == current {
        return Ok(None);
    }

    Ok(Some(AdjustmentPlan {
        previous_stock: current,
        change: target - current,
        new_stock_level: target,
    }))
}

/// Checks the ledger invariant for one entity.
pub fn ledger_balances(initial: i64, current: i64, history: &[AdjustmentHistory]) -> bool {
    let mut running = initial;
    for entry in history {
        running = match running.checked_add(entry.change) {
            Some(level) => level,
            None => return false,
        };
        if entry.new_stock_level != running || running < 0 {
            return false;
        }
    }
    running == current && current >= 0
}

// =============================================================================
// Standard Reasons
// =============================================================================

/// History reason for a sale.
pub fn sale_reason(channel: SaleChannel, sale_id: &str) -> String {
    format!("Sale via {} ({})", channel, sale_id)
}

/// History reason for a cancelled sale.
pub fn cancellation_reason(sale_id: &str) -> String {
    format!("Sale cancelled ({})", sale_id)
}

/// History reason for a reconciled return.
pub fn return_reason(awb: &str) -> String {
    format!("Return received (AWB {})", awb)
}

// =============================================================================
// Unit Tests
// =============================================================================
