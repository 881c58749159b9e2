//! # Stockroom Entry Point
//!
//! Opens the store and logs a stock summary.
//!
//! ## Usage
//! ```bash
//! # Platform config file (if any) and platform data directory
//! cargo run -p stockroom-app
//!
//! # Explicit config file
//! cargo run -p stockroom-app -- ./stockroom.toml
//!
//! # Override through the environment
//! STOCKROOM_DB_PATH=./stockroom_dev.db RUST_LOG=debug cargo run -p stockroom-app
//! ```

use std::path::PathBuf;

use stockroom_app::{init_tracing, AppConfig, AppState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path)?;

    init_tracing(&config.logging.filter);
    info!("Starting Stockroom");

    let state = AppState::open(config).await?;

    let snapshot = state.inventory.snapshot().await;
    if let Some(error) = &snapshot.last_error {
        warn!(error = %error, "Inventory could not be loaded");
    }

    let insights = state.inventory.stock_insights().await;
    info!(
        items = insights.item_count,
        units = insights.total_units,
        stock_value = %insights.stock_value,
        "Inventory loaded"
    );
    for alert in &insights.out_of_stock {
        warn!(label = %alert.label, sku = ?alert.sku, "Out of stock");
    }
    for alert in &insights.low_stock {
        warn!(label = %alert.label, sku = ?alert.sku, stock = alert.stock, "Low stock");
    }

    let today = state.inventory.today();
    let summary = state.inventory.daily_summary(today).await?;
    info!(
        date = %today,
        units = summary.total_units,
        revenue = %summary.total_revenue,
        "Sales today"
    );

    state.db.close().await;
    Ok(())
}
