//! # Validation Module
//!
//! Input validation for catalog edits, stock adjustments, sales and receipts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend forms (format checks, immediate feedback)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (business rule validation, before any I/O)       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite (NOT NULL, UNIQUE, CHECK (stock >= 0))                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("KAOS-M").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{NewProduct, NewStockLayout, NewVariant, ProductUpdate, VariantUpdate};
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE, MAX_STOCK_LEVEL};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn require(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty, at most 50 characters
/// - Letters, digits, hyphens, underscores and dots only
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_sku;
///
/// assert!(validate_sku("KAOS-M").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    require("sku", sku, 50)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a product or variant name (1–200 characters).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    require(field, name, 200)
}

/// Validates a category name (1–100 characters).
pub fn validate_category(category: &str) -> ValidationResult<()> {
    require("category", category, 100)
}

/// Validates an adjustment reason (1–200 characters).
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    require("reason", reason, 200)
}

/// Validates an airway bill number.
///
/// AWBs are courier-issued; only emptiness, length and whitespace are checked.
pub fn validate_awb(awb: &str) -> ValidationResult<()> {
    require("awb", awb, 64)?;

    if awb.trim().chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "awb".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale or return quantity (1..=MAX_ITEM_QUANTITY).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a signed stock delta: non-zero, magnitude within bounds.
pub fn validate_change(change: i64) -> ValidationResult<()> {
    if change == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "change".to_string(),
        });
    }

    if change.unsigned_abs() > MAX_ITEM_QUANTITY.unsigned_abs() {
        return Err(ValidationError::OutOfRange {
            field: "change".to_string(),
            min: -MAX_ITEM_QUANTITY,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an absolute stock level (0..=MAX_STOCK_LEVEL).
pub fn validate_stock_level(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_LEVEL).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        });
    }

    Ok(())
}

/// Validates a price (0..=MAX_PRICE; zero is allowed for free items).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.minor() > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

fn validate_optional_sku(sku: Option<&str>) -> ValidationResult<()> {
    match sku {
        Some(sku) => validate_sku(sku),
        None => Ok(()),
    }
}

fn validate_new_variant(variant: &NewVariant) -> ValidationResult<()> {
    validate_name("variant name", &variant.name)?;
    validate_optional_sku(variant.sku.as_deref())?;
    validate_stock_level(variant.stock)?;
    validate_price(variant.price)
}

/// Validates a product creation request, including SKU uniqueness inside it.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &product.name)?;
    validate_category(&product.category)?;
    validate_optional_sku(product.sku.as_deref())?;

    match &product.layout {
        NewStockLayout::Simple { stock, price } => {
            validate_stock_level(*stock)?;
            validate_price(*price)?;
        }
        NewStockLayout::Variants { variants } => {
            if variants.is_empty() {
                return Err(ValidationError::required("variants"));
            }
            for variant in variants {
                validate_new_variant(variant)?;
            }
        }
    }

    let mut skus: Vec<&str> = product.sku.iter().map(String::as_str).collect();
    if let NewStockLayout::Variants { variants } = &product.layout {
        skus.extend(variants.iter().filter_map(|v| v.sku.as_deref()));
    }
    ensure_unique_skus(skus)
}

/// Validates a product edit.
pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    validate_name("name", &update.name)?;
    validate_category(&update.category)?;
    validate_optional_sku(update.sku.as_deref())?;
    if let Some(price) = update.price {
        validate_price(price)?;
    }
    Ok(())
}

/// Validates a bulk variant edit: non-empty, no repeated ids or SKUs.
pub fn validate_variant_updates(updates: &[VariantUpdate]) -> ValidationResult<()> {
    if updates.is_empty() {
        return Err(ValidationError::required("variants"));
    }

    let mut seen_ids: Vec<&str> = Vec::with_capacity(updates.len());
    for update in updates {
        if seen_ids.contains(&update.id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "variant id".to_string(),
                value: update.id.clone(),
            });
        }
        seen_ids.push(&update.id);

        validate_stock_level(update.stock)?;
        if let Some(name) = &update.name {
            validate_name("variant name", name)?;
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        validate_optional_sku(update.sku.as_deref())?;
    }

    ensure_unique_skus(updates.iter().filter_map(|u| u.sku.as_deref()).collect())
}

fn ensure_unique_skus(mut skus: Vec<&str>) -> ValidationResult<()> {
    skus.sort_unstable();
    match skus.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(ValidationError::Duplicate {
            field: "sku".to_string(),
            value: pair[0].to_string(),
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn new_variant(name: &str, sku: Option<&str>, stock: i64) -> NewVariant {
        NewVariant {
            name: name.to_string(),
            sku: sku.map(str::to_string),
            stock,
            price: Money::from_minor(25_000),
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("KAOS-M").is_ok());
        assert!(validate_sku("ABC_123.v2").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_quantity_and_change() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-2).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());

        assert!(validate_change(-4).is_ok());
        assert_eq!(
            validate_change(0),
            Err(ValidationError::MustBeNonZero {
                field: "change".to_string()
            })
        );
    }

    #[test]
    fn test_numeric_bounds_reject_extremes() {
        assert!(validate_change(i64::MIN).is_err());
        assert!(validate_change(i64::MAX).is_err());
        assert!(validate_change(-MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_stock_level(MAX_STOCK_LEVEL).is_ok());
        assert!(validate_stock_level(MAX_STOCK_LEVEL + 1).is_err());
        assert!(validate_stock_level(i64::MAX).is_err());

        assert!(validate_price(Money::from_minor(MAX_PRICE)).is_ok());
        assert!(validate_price(Money::from_minor(MAX_PRICE + 1)).is_err());
    }

    #[test]
    fn test_validate_awb() {
        assert!(validate_awb("JP1234567890").is_ok());
        assert!(validate_awb("").is_err());
        assert!(validate_awb("JP 123").is_err());
    }

    #[test]
    fn test_new_product_rejects_duplicate_variant_skus() {
        let product = NewProduct {
            name: "Kaos".to_string(),
            category: "Pakaian".to_string(),
            sku: None,
            image_url: None,
            size: None,
            layout: NewStockLayout::Variants {
                variants: vec![
                    new_variant("S", Some("KAOS-S"), 1),
                    new_variant("M", Some("KAOS-S"), 1),
                ],
            },
        };

        assert_eq!(
            validate_new_product(&product),
            Err(ValidationError::Duplicate {
                field: "sku".to_string(),
                value: "KAOS-S".to_string()
            })
        );
    }

    #[test]
    fn test_new_product_requires_variants_when_variant_layout() {
        let product = NewProduct {
            name: "Kaos".to_string(),
            category: "Pakaian".to_string(),
            sku: None,
            image_url: None,
            size: None,
            layout: NewStockLayout::Variants { variants: vec![] },
        };
        assert!(validate_new_product(&product).is_err());
    }

    #[test]
    fn test_variant_updates_reject_repeated_ids_and_negative_stock() {
        let update = |id: &str, stock: i64| VariantUpdate {
            id: id.to_string(),
            stock,
            name: None,
            price: None,
            sku: None,
        };

        assert!(validate_variant_updates(&[update("a", 5), update("b", 10)]).is_ok());
        assert!(validate_variant_updates(&[update("a", 5), update("a", 6)]).is_err());
        assert!(validate_variant_updates(&[update("a", -1)]).is_err());
        assert!(validate_variant_updates(&[]).is_err());
    }
}
