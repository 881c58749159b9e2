//! # Repository Module
//!
//! Database repository implementations for Stockroom.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  InventoryContext (stockroom-app)                                      │
//! │       │                                                                 │
//! │       │  db.sales().perform_sale("KAOS-M", SaleChannel::Pos, 3, None)  │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │       │  BEGIN                                                          │
//! │       │  ledger::current_stock → plan_sale → ledger::apply_plan        │
//! │       │  INSERT sale                                                    │
//! │       │  COMMIT (or ROLLBACK on any error)                             │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InventoryRepository`] - Products, variants, stock adjustments
//! - [`SaleRepository`] - Sales and cancellations
//! - [`ShippingReceiptRepository`] - AWB receipts and return reconciliation
//! - [`ResellerRepository`] - Reseller records
//! - [`SettingsRepository`] - JSON key-value settings

pub mod inventory;
pub(crate) mod ledger;
pub mod receipt;
pub mod reseller;
pub mod sale;
pub mod settings;

pub use inventory::InventoryRepository;
pub use receipt::ShippingReceiptRepository;
pub use reseller::ResellerRepository;
pub use sale::SaleRepository;
pub use settings::SettingsRepository;
