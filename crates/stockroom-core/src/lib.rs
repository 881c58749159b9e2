//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! This crate holds the domain model and every stock rule as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (forms, scanner)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              stockroom-app (InventoryContext)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockroom-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   stock   │  │  returns  │  │ validation│  │   │
//! │  │   │   Item    │  │  Ledger   │  │ReturnList │  │   rules   │  │   │
//! │  │   │   Sale    │  │  Plan     │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockroom-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InventoryItem, Sale, ShippingReceipt, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`stock`] - Stock ledger arithmetic
//! - [`returns`] - Return list accumulation for receipt reconciliation
//! - [`insights`] - Low-stock summary and daily sales totals
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::stock::plan_adjustment;
//!
//! let plan = plan_adjustment(20, -3).unwrap();
//! assert_eq!(plan.new_stock_level, 17);
//!
//! // Stock never goes below zero
//! assert!(plan_adjustment(2, -3).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod insights;
pub mod money;
pub mod returns;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Settings key under which [`ReceiptSettings`] is stored.
pub const RECEIPT_SETTINGS_KEY: &str = "receipt_settings";

/// Default threshold at or below which an item counts as low on stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Maximum quantity accepted for a single sale or adjustment.
///
/// ## Business Reason
/// Prevents accidental over-entry (typing 10000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest stock level a single item or variant may hold.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000;

/// Largest unit price accepted, in minor units (Rp1.000.000.000.000).
///
/// Keeps `price × stock` and `price × quantity` inside `i64`.
pub const MAX_PRICE: i64 = 1_000_000_000_000;
