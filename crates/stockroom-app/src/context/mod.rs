//! # Application Contexts
//!
//! State objects the presentation layer holds on to. Each one is constructed
//! explicitly with a [`Database`](stockroom_db::Database) handle.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Context Architecture                                 │
//! │                                                                         │
//! │  ┌──────────────────────────┐   ┌──────────────────────────────────┐   │
//! │  │   InventoryContext       │   │   ReceiptSettingsContext         │   │
//! │  │                          │   │                                  │   │
//! │  │  Arc<RwLock<             │   │  Arc<RwLock<                     │   │
//! │  │    InventorySnapshot     │   │    Option<ReceiptSettings>       │   │
//! │  │  >>                      │   │  >>                              │   │
//! │  └────────────┬─────────────┘   └────────────────┬─────────────────┘   │
//! │               └───────────────┬──────────────────┘                     │
//! │                               ▼                                         │
//! │                    Database (shared SqlitePool)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod inventory;
mod settings;

pub use inventory::{InventoryContext, InventorySnapshot};
pub use settings::ReceiptSettingsContext;
