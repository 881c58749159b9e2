//! # Return List
//!
//! Accumulates scanned SKUs while an operator processes a returned parcel.
//! Nothing is persisted until the list is finalized against a shipping
//! receipt; the database layer then credits each line in one transaction.
//!
//! ```text
//! scan KAOS-M ──► [KAOS-M × 1]
//! scan KAOS-M ──► [KAOS-M × 2]
//! scan TOPI   ──► [KAOS-M × 2, TOPI × 1]
//! finalize    ──► +2 KAOS-M, +1 TOPI, receipt → reconciled
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::{validate_quantity, validate_sku, ValidationResult};

/// Quantity of one SKU being returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnLine {
    pub sku: String,
    pub quantity: i64,
}

/// Ordered, de-duplicated list of return lines (first scan order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnList {
    lines: Vec<ReturnLine>,
}

impl ReturnList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` units of `sku`, merging with an existing line.
    pub fn add(&mut self, sku: &str, quantity: i64) -> ValidationResult<()> {
        let sku = sku.trim();
        validate_sku(sku)?;
        validate_quantity(quantity)?;

        match self.lines.iter_mut().find(|line| line.sku == sku) {
            Some(line) => {
                let merged = line.quantity + quantity;
                validate_quantity(merged)?;
                line.quantity = merged;
            }
            None => self.lines.push(ReturnLine {
                sku: sku.to_string(),
                quantity,
            }),
        }

        Ok(())
    }

    /// Records a single scan (one unit).
    pub fn scan(&mut self, sku: &str) -> ValidationResult<()> {
        self.add(sku, 1)
    }

    /// Sets the quantity of an existing line; zero removes it.
    pub fn set_quantity(&mut self, sku: &str, quantity: i64) -> ValidationResult<()> {
        if quantity == 0 {
            self.remove(sku);
            return Ok(());
        }
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|line| line.sku == sku)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "sku".to_string(),
                reason: format!("'{}' is not in the return list", sku),
            })?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line; returns true if it existed.
    pub fn remove(&mut self, sku: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.sku != sku);
        self.lines.len() != before
    }

    pub fn lines(&self) -> &[ReturnLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    pub fn total_units(&self) -> i64 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scans_merge_per_sku_in_first_scan_order() {
        let mut list = ReturnList::new();
        list.scan("KAOS-M").unwrap();
        list.scan("TOPI").unwrap();
        list.scan("KAOS-M").unwrap();

        assert_eq!(
            list.lines(),
            &[
                ReturnLine {
                    sku: "KAOS-M".to_string(),
                    quantity: 2
                },
                ReturnLine {
                    sku: "TOPI".to_string(),
                    quantity: 1
                },
            ]
        );
        assert_eq!(list.total_units(), 3);
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut list = ReturnList::new();
        list.add("KAOS-M", 2).unwrap();
        list.set_quantity("KAOS-M", 5).unwrap();
        assert_eq!(list.total_units(), 5);

        assert!(list.set_quantity("TOPI", 1).is_err());

        list.set_quantity("KAOS-M", 0).unwrap();
        assert!(list.is_empty());
        assert!(!list.remove("KAOS-M"));
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut list = ReturnList::new();
        assert!(list.add("", 1).is_err());
        assert!(list.add("KAOS-M", 0).is_err());
        assert!(list.is_empty());
    }
}
